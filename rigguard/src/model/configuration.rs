//! User builds and their resolved, validated form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

use super::component::{Catalog, Component, ComponentId, ComponentType};
use super::value::parse_number;
use crate::analyzer::aggregate::CompatibilityAnalysisResult;

/// Precondition violations on a build. These are caller errors, distinct
/// from a build that is merely incompatible.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("component {0} has zero quantity")]
    ZeroQuantity(ComponentId),
    #[error("{component_type} allows a single component but both {existing} and {incoming} were given")]
    DuplicateType {
        component_type: ComponentType,
        existing: ComponentId,
        incoming: ComponentId,
    },
    #[error("component {0} is not in the catalog")]
    UnknownComponent(ComponentId),
    #[error("quantity of component {0} overflows")]
    QuantityOverflow(ComponentId),
    #[error("component {0} is not part of this configuration")]
    NotInConfiguration(ComponentId),
    #[error("component {id} is recorded as {recorded} but the catalog says {actual}")]
    TypeMismatch {
        id: ComponentId,
        recorded: ComponentType,
        actual: ComponentType,
    },
}

/// One line of a build.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfigEntry {
    pub component_id: ComponentId,
    pub component_type: ComponentType,
    pub quantity: u32,
}

/// A named, incrementally edited build. Components are referenced by id and
/// resolved against a catalog on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PcConfiguration {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    entries: Vec<ConfigEntry>,
    #[serde(default)]
    pub is_compatible: Option<bool>,
    #[serde(default)]
    pub last_analysis: Option<CompatibilityAnalysisResult>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PcConfiguration {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            entries: Vec::new(),
            is_compatible: None,
            last_analysis: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn entries(&self) -> &[ConfigEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_type(&self, component_type: ComponentType) -> bool {
        self.entries.iter().any(|e| e.component_type == component_type)
    }

    pub fn quantity_of(&self, id: ComponentId) -> u32 {
        self.entries
            .iter()
            .find(|e| e.component_id == id)
            .map(|e| e.quantity)
            .unwrap_or(0)
    }

    /// Add one unit of `component`. Adding the same component again bumps its
    /// quantity; a different component of a single-instance type is refused.
    pub fn add_component(&mut self, component: &Component) -> Result<(), ConfigurationError> {
        self.add_with_quantity(component, 1)
    }

    pub fn add_with_quantity(
        &mut self,
        component: &Component,
        quantity: u32,
    ) -> Result<(), ConfigurationError> {
        if quantity == 0 {
            return Err(ConfigurationError::ZeroQuantity(component.id));
        }

        if let Some(entry) = self.entries.iter_mut().find(|e| e.component_id == component.id) {
            entry.quantity = entry
                .quantity
                .checked_add(quantity)
                .ok_or(ConfigurationError::QuantityOverflow(component.id))?;
        } else {
            if !component.component_type.allows_multiple() {
                if let Some(existing) = self
                    .entries
                    .iter()
                    .find(|e| e.component_type == component.component_type)
                {
                    return Err(ConfigurationError::DuplicateType {
                        component_type: component.component_type,
                        existing: existing.component_id,
                        incoming: component.id,
                    });
                }
            }
            self.entries.push(ConfigEntry {
                component_id: component.id,
                component_type: component.component_type,
                quantity,
            });
        }

        self.touch();
        Ok(())
    }

    /// Remove one unit; the entry disappears when its quantity reaches zero.
    pub fn remove_component(&mut self, id: ComponentId) -> Result<(), ConfigurationError> {
        let index = self
            .entries
            .iter()
            .position(|e| e.component_id == id)
            .ok_or(ConfigurationError::NotInConfiguration(id))?;

        if self.entries[index].quantity > 1 {
            self.entries[index].quantity -= 1;
        } else {
            self.entries.remove(index);
        }
        self.touch();
        Ok(())
    }

    /// Replace every component of the same type with a single `component`.
    pub fn replace_component(&mut self, component: &Component) {
        self.entries
            .retain(|e| e.component_type != component.component_type);
        self.entries.push(ConfigEntry {
            component_id: component.id,
            component_type: component.component_type,
            quantity: 1,
        });
        self.touch();
    }

    /// Resolve ids against `catalog` and validate the build invariants.
    pub fn resolve<'a>(&self, catalog: &'a Catalog) -> Result<ResolvedBuild<'a>, ConfigurationError> {
        let mut items = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let component = catalog
                .get(entry.component_id)
                .ok_or(ConfigurationError::UnknownComponent(entry.component_id))?;
            if component.component_type != entry.component_type {
                return Err(ConfigurationError::TypeMismatch {
                    id: entry.component_id,
                    recorded: entry.component_type,
                    actual: component.component_type,
                });
            }
            items.push((component, entry.quantity));
        }
        ResolvedBuild::new(items)
    }

    /// Store the outcome of the latest analysis.
    pub fn record_analysis(&mut self, result: &CompatibilityAnalysisResult) {
        self.is_compatible = Some(result.compatible);
        self.last_analysis = Some(result.clone());
        self.updated_at = Utc::now();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
        self.is_compatible = None;
        self.last_analysis = None;
    }
}

/// A component together with how many units the build holds.
#[derive(Debug, Clone, Copy)]
pub struct BuildItem<'a> {
    pub component: &'a Component,
    pub quantity: u32,
}

/// Validated view of a build over borrowed catalog components.
#[derive(Debug, Clone, Default)]
pub struct ResolvedBuild<'a> {
    items: Vec<BuildItem<'a>>,
}

impl<'a> ResolvedBuild<'a> {
    /// Checks quantities and single-instance types. Repeated components are
    /// merged into one item.
    pub fn new(items: Vec<(&'a Component, u32)>) -> Result<Self, ConfigurationError> {
        let mut merged: Vec<BuildItem<'a>> = Vec::with_capacity(items.len());
        let mut singles: BTreeMap<ComponentType, ComponentId> = BTreeMap::new();

        for (component, quantity) in items {
            if quantity == 0 {
                return Err(ConfigurationError::ZeroQuantity(component.id));
            }
            if let Some(item) = merged.iter_mut().find(|i| i.component.id == component.id) {
                item.quantity = item
                    .quantity
                    .checked_add(quantity)
                    .ok_or(ConfigurationError::QuantityOverflow(component.id))?;
                continue;
            }
            let ty = component.component_type;
            if !ty.allows_multiple() {
                if let Some(&existing) = singles.get(&ty) {
                    return Err(ConfigurationError::DuplicateType {
                        component_type: ty,
                        existing,
                        incoming: component.id,
                    });
                }
                singles.insert(ty, component.id);
            }
            merged.push(BuildItem { component, quantity });
        }

        merged.sort_by_key(|i| (i.component.component_type, i.component.id));
        Ok(Self { items: merged })
    }

    /// Each component once with quantity 1.
    pub fn from_components(components: &[&'a Component]) -> Result<Self, ConfigurationError> {
        Self::new(components.iter().map(|c| (*c, 1)).collect())
    }

    pub fn items(&self) -> &[BuildItem<'a>] {
        &self.items
    }

    pub fn components(&self) -> impl Iterator<Item = &'a Component> + '_ {
        self.items.iter().map(|i| i.component)
    }

    pub fn of_type(&self, component_type: ComponentType) -> impl Iterator<Item = BuildItem<'a>> + '_ {
        self.items
            .iter()
            .copied()
            .filter(move |i| i.component.component_type == component_type)
    }

    pub fn first_of(&self, component_type: ComponentType) -> Option<&'a Component> {
        self.of_type(component_type).next().map(|i| i.component)
    }

    pub fn has_type(&self, component_type: ComponentType) -> bool {
        self.of_type(component_type).next().is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Units of `component_type`, counting quantities.
    pub fn count_of(&self, component_type: ComponentType) -> u32 {
        self.of_type(component_type).map(|i| i.quantity).sum()
    }

    pub fn total_price(&self) -> f64 {
        self.items
            .iter()
            .map(|i| i.component.price * f64::from(i.quantity))
            .sum()
    }

    /// Sum of the first parseable performance key per component.
    pub fn total_performance(&self, keys: &[String]) -> f64 {
        self.items
            .iter()
            .filter_map(|i| {
                i.component
                    .spec_any(keys)
                    .and_then(|(_, v)| parse_number(v))
                    .map(|p| p * f64::from(i.quantity))
            })
            .sum()
    }
}
