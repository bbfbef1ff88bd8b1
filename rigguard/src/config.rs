//! Engine policy.
//!
//! Every tunable the analysis uses lives here and is injected at
//! construction. All sections fall back to their defaults when absent from
//! a JSON document.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::core::RigGuardError;
use crate::model::ComponentType;
use crate::rules::RuleId;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub scoring: ScoringPolicy,
    pub power: PowerPolicy,
    pub heuristics: HeuristicsPolicy,
    /// Rules whose failures are advice rather than incompatibility.
    pub advisory_rules: BTreeSet<RuleId>,
    /// Catalog category slug -> component type.
    pub category_aliases: BTreeMap<String, ComponentType>,
    /// Characters separating list values.
    pub list_delimiters: String,
    pub performance_keys: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let category_aliases = [
            ("processors", ComponentType::Cpu),
            ("video-cards", ComponentType::Gpu),
            ("motherboards", ComponentType::Motherboard),
            ("memory", ComponentType::Ram),
            ("power-supplies", ComponentType::PowerSupply),
            ("cases", ComponentType::Case),
            ("coolers", ComponentType::Cooler),
            ("storage", ComponentType::Storage),
            ("monitors", ComponentType::Monitor),
            ("keyboards", ComponentType::Keyboard),
            ("mice", ComponentType::Mouse),
            ("headphones", ComponentType::Headphones),
            ("headsets", ComponentType::Headphones),
            ("speakers", ComponentType::Speakers),
        ]
        .into_iter()
        .map(|(slug, ty)| (slug.to_string(), ty))
        .collect();

        Self {
            scoring: ScoringPolicy::default(),
            power: PowerPolicy::default(),
            heuristics: HeuristicsPolicy::default(),
            advisory_rules: [RuleId(10)].into_iter().collect(),
            category_aliases,
            list_delimiters: ",;|/".to_string(),
            performance_keys: vec!["performance_score".to_string(), "performance".to_string()],
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn load(path: &Path) -> Result<Self, RigGuardError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&content)?;
        tracing::debug!("Loaded engine config from {}", path.display());
        Ok(config)
    }

    pub fn is_advisory(&self, id: RuleId) -> bool {
        self.advisory_rules.contains(&id)
    }
}

/// Linear penalty model for the compatibility score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScoringPolicy {
    pub warning_penalty: f64,
    pub recommendation_penalty: f64,
    /// Lowest score a build without critical errors can get.
    pub floor: f64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            warning_penalty: 15.0,
            recommendation_penalty: 5.0,
            floor: 10.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PowerPolicy {
    /// Headroom ratio below which the supply is insufficient.
    pub critical_below: f64,
    /// Headroom ratio below which the supply is borderline.
    pub warning_below: f64,
    /// Draw keys, first present wins.
    pub consumption_keys: Vec<String>,
    /// Supply rating keys, first present wins.
    pub capacity_keys: Vec<String>,
}

impl Default for PowerPolicy {
    fn default() -> Self {
        Self {
            critical_below: 1.0,
            warning_below: 1.2,
            consumption_keys: vec![
                "power_consumption".to_string(),
                "powerConsumption".to_string(),
                "tdp".to_string(),
            ],
            capacity_keys: vec!["wattage".to_string(), "power".to_string()],
        }
    }
}

/// Advisory build checks. Off by default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HeuristicsPolicy {
    pub enabled: bool,
    pub balance_warning_ratio: f64,
    pub balance_recommendation_ratio: f64,
    pub min_ram_gb: f64,
    pub max_ram_gb: f64,
    /// Fraction of the cooler rating above which the CPU runs hot.
    pub thermal_margin: f64,
    /// Load fraction below which the supply is oversized.
    pub psu_oversize_load: f64,
}

impl Default for HeuristicsPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            balance_warning_ratio: 2.0,
            balance_recommendation_ratio: 1.5,
            min_ram_gb: 8.0,
            max_ram_gb: 64.0,
            thermal_margin: 0.8,
            psu_oversize_load: 0.3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_document_keeps_defaults() {
        let config = EngineConfig::from_json_str(
            r#"{"scoring": {"warning_penalty": 20}, "heuristics": {"enabled": true}}"#,
        )
        .unwrap();
        assert_eq!(config.scoring.warning_penalty, 20.0);
        assert_eq!(config.scoring.floor, 10.0);
        assert!(config.heuristics.enabled);
        assert_eq!(config.heuristics.min_ram_gb, 8.0);
        assert_eq!(config.power.warning_below, 1.2);
        assert_eq!(config.category_aliases.get("mice"), Some(&ComponentType::Mouse));
    }

    #[test]
    fn test_aliases_accept_type_tokens() {
        let config = EngineConfig::from_json_str(
            r#"{"category_aliases": {"gamepads": "MOUSE", "psus": "PSU"}, "advisory_rules": [3]}"#,
        )
        .unwrap();
        assert_eq!(config.category_aliases.len(), 2);
        assert_eq!(config.category_aliases["psus"], ComponentType::PowerSupply);
        assert!(config.is_advisory(RuleId(3)));
        assert!(!config.is_advisory(RuleId(10)));
    }
}
