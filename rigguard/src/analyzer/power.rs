//! Power budget: declared draw against the supply rating.

use serde::{Deserialize, Serialize};

use crate::config::PowerPolicy;
use crate::model::value::parse_number;
use crate::model::{BuildItem, CompatibilityIssue, Component, ComponentId, ComponentType, IssueCategory, ResolvedBuild};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PowerVerdict {
    /// No power supply in the build.
    NoSupply,
    /// Nothing in the build declares a draw.
    NoLoad,
    /// A supply is present but declares no rating.
    UndeclaredCapacity,
    Insufficient,
    Borderline,
    Adequate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PowerReport {
    pub total_draw: u32,
    pub supply_capacity: u32,
    /// `supply_capacity / max(total_draw, 1)`.
    pub headroom_ratio: f64,
    pub verdict: PowerVerdict,
    pub supply: Option<ComponentId>,
    /// Draw per component, quantities included.
    pub contributors: Vec<(ComponentId, u32)>,
}

impl PowerReport {
    /// Share of the supply rating in use, when a rating is known.
    pub fn load(&self) -> Option<f64> {
        (self.supply_capacity > 0).then(|| f64::from(self.total_draw) / f64::from(self.supply_capacity))
    }
}

#[derive(Debug, Clone, Default)]
pub struct PowerBudgetCalculator {
    policy: PowerPolicy,
}

impl PowerBudgetCalculator {
    pub fn new(policy: PowerPolicy) -> Self {
        Self { policy }
    }

    pub fn calculate(&self, build: &ResolvedBuild<'_>) -> PowerReport {
        self.calculate_items(build.items())
    }

    /// Each component counted once.
    pub fn calculate_components(&self, components: &[&Component]) -> PowerReport {
        let items: Vec<BuildItem<'_>> = components
            .iter()
            .map(|c| BuildItem {
                component: *c,
                quantity: 1,
            })
            .collect();
        self.calculate_items(&items)
    }

    pub fn calculate_items(&self, items: &[BuildItem<'_>]) -> PowerReport {
        let mut contributors = Vec::new();
        let mut draw = 0.0_f64;

        for item in items
            .iter()
            .filter(|i| i.component.component_type != ComponentType::PowerSupply)
        {
            let watts = item
                .component
                .spec_any(&self.policy.consumption_keys)
                .and_then(|(_, v)| parse_number(v))
                .filter(|w| *w > 0.0)
                .unwrap_or(0.0)
                * f64::from(item.quantity);
            if watts > 0.0 {
                contributors.push((item.component.id, watts.round() as u32));
                draw += watts;
            }
        }

        let supply = items
            .iter()
            .find(|i| i.component.component_type == ComponentType::PowerSupply)
            .map(|i| i.component);
        let declared = supply.and_then(|psu| {
            psu.spec_any(&self.policy.capacity_keys)
                .and_then(|(_, v)| parse_number(v))
                .filter(|w| *w > 0.0)
        });

        let total_draw = draw.round() as u32;
        let supply_capacity = declared.map_or(0, |w| w.round() as u32);
        let headroom_ratio = f64::from(supply_capacity) / f64::from(total_draw.max(1));

        let verdict = if supply.is_none() {
            PowerVerdict::NoSupply
        } else if total_draw == 0 {
            PowerVerdict::NoLoad
        } else if declared.is_none() {
            PowerVerdict::UndeclaredCapacity
        } else if headroom_ratio < self.policy.critical_below {
            PowerVerdict::Insufficient
        } else if headroom_ratio < self.policy.warning_below {
            PowerVerdict::Borderline
        } else {
            PowerVerdict::Adequate
        };

        tracing::debug!(
            "Power budget: draw {}W, capacity {}W, ratio {:.2}, {:?}",
            total_draw,
            supply_capacity,
            headroom_ratio,
            verdict
        );

        PowerReport {
            total_draw,
            supply_capacity,
            headroom_ratio,
            verdict,
            supply: supply.map(|psu| psu.id),
            contributors,
        }
    }

    /// Zero or one POWER issue for a report.
    pub fn to_issue(&self, report: &PowerReport) -> Option<CompatibilityIssue> {
        let details = format!(
            "draw {}W, capacity {}W, headroom ratio {:.2}",
            report.total_draw, report.supply_capacity, report.headroom_ratio
        );
        let recommended = (f64::from(report.total_draw) * self.policy.warning_below).ceil();

        let issue = match report.verdict {
            PowerVerdict::Insufficient => CompatibilityIssue::critical(
                IssueCategory::Power,
                "Insufficient power supply",
                format!(
                    "The components draw {}W but the power supply is rated for {}W",
                    report.total_draw, report.supply_capacity
                ),
            )
            .with_suggestion(format!("Choose a power supply of at least {}W", recommended)),
            PowerVerdict::Borderline => CompatibilityIssue::warning(
                IssueCategory::Power,
                "Power supply close to its limit",
                format!(
                    "The power supply leaves only {:.0}% headroom over the {}W draw",
                    (report.headroom_ratio - 1.0) * 100.0,
                    report.total_draw
                ),
            )
            .with_suggestion(format!("A {}W or larger supply leaves a safe margin", recommended)),
            PowerVerdict::UndeclaredCapacity => CompatibilityIssue::warning(
                IssueCategory::Power,
                "Power supply rating unknown",
                format!(
                    "The power supply does not declare its wattage; the components draw {}W",
                    report.total_draw
                ),
            ),
            PowerVerdict::NoSupply | PowerVerdict::NoLoad | PowerVerdict::Adequate => return None,
        };

        let issue = issue.with_details(details);
        Some(match report.supply {
            Some(id) => issue.with_component(id),
            None => issue,
        })
    }
}
