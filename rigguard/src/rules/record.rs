//! Persisted rule records.
//!
//! Field names follow the storage schema exactly. Records keep their enum
//! columns as raw strings so that a legacy or mistyped token surfaces as a
//! [`RuleDefect`] on conversion instead of failing the whole document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::model::{CompatibilityRule, Operator, RuleDefect, RuleId, RuleKind, RuleType, ValueModifier};
use crate::model::ComponentType;

fn default_true() -> bool {
    true
}

/// A nullable boolean column; `null` reads as active.
fn nullable_active<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(true))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ModifierColumn {
    Text(String),
    Number(f64),
}

/// Modifiers are stored as text but some exports write plain numbers.
fn modifier_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<ModifierColumn>::deserialize(deserializer)?.map(|column| match column {
        ModifierColumn::Text(text) => text,
        ModifierColumn::Number(n) => n.to_string(),
    }))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RuleRecord {
    pub id: u64,
    pub source_type: String,
    pub target_type: String,
    pub rule_type: String,
    pub source_property: String,
    pub target_property: String,
    #[serde(default)]
    pub comparison_operator: Option<String>,
    #[serde(default, deserialize_with = "modifier_text")]
    pub value_modifier: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true", deserialize_with = "nullable_active")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl RuleRecord {
    /// Convert into a typed rule, reporting the first defect found.
    pub fn to_rule(&self) -> Result<CompatibilityRule, RuleDefect> {
        let source_type = parse_type("sourceType", &self.source_type)?;
        let target_type = parse_type("targetType", &self.target_type)?;
        let rule_type: RuleType = self.rule_type.parse()?;

        let operator = match self.comparison_operator.as_deref().map(str::trim) {
            Some(token) if !token.is_empty() => token.parse::<Operator>()?,
            _ => rule_type.default_operator(),
        };
        let kind = RuleKind::from_parts(rule_type, operator)?;
        let modifier = match self.value_modifier.as_deref() {
            Some(raw) => ValueModifier::parse(raw)?,
            None => None,
        };

        if self.source_property.trim().is_empty() {
            return Err(RuleDefect::MissingProperty("sourceProperty"));
        }
        if self.target_property.trim().is_empty() {
            return Err(RuleDefect::MissingProperty("targetProperty"));
        }

        Ok(CompatibilityRule {
            id: RuleId(self.id),
            source_type,
            target_type,
            source_property: self.source_property.trim().to_string(),
            target_property: self.target_property.trim().to_string(),
            kind,
            modifier,
            description: self.description.clone().unwrap_or_default(),
            active: self.is_active,
        })
    }
}

impl From<&CompatibilityRule> for RuleRecord {
    fn from(rule: &CompatibilityRule) -> Self {
        Self {
            id: rule.id.0,
            source_type: rule.source_type.token().to_string(),
            target_type: rule.target_type.token().to_string(),
            rule_type: rule.kind.rule_type().token().to_string(),
            source_property: rule.source_property.clone(),
            target_property: rule.target_property.clone(),
            comparison_operator: Some(rule.kind.operator().token().to_string()),
            value_modifier: rule.modifier.map(|m| m.to_string()),
            description: Some(rule.description.clone()).filter(|d| !d.is_empty()),
            is_active: rule.active,
            created_at: None,
            updated_at: None,
        }
    }
}

fn parse_type(field: &'static str, token: &str) -> Result<ComponentType, RuleDefect> {
    token.parse().map_err(|_| RuleDefect::UnknownComponentType {
        field,
        token: token.to_string(),
    })
}
