//! Catalog components and their type metadata.
//!
//! Components are read-only snapshots of catalog products. The engine only
//! ever looks at the key/value specification map; typed catalog columns such
//! as price are carried for the configuration aggregates.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Closed set of part categories.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComponentType {
    Cpu,
    Gpu,
    #[serde(alias = "MB")]
    Motherboard,
    Ram,
    #[serde(alias = "PSU")]
    PowerSupply,
    Case,
    Cooler,
    Storage,
    Monitor,
    Keyboard,
    Mouse,
    #[serde(alias = "HEADSET")]
    Headphones,
    Speakers,
}

impl ComponentType {
    pub const ALL: [ComponentType; 13] = [
        ComponentType::Cpu,
        ComponentType::Gpu,
        ComponentType::Motherboard,
        ComponentType::Ram,
        ComponentType::PowerSupply,
        ComponentType::Case,
        ComponentType::Cooler,
        ComponentType::Storage,
        ComponentType::Monitor,
        ComponentType::Keyboard,
        ComponentType::Mouse,
        ComponentType::Headphones,
        ComponentType::Speakers,
    ];

    /// Must appear in a complete build.
    pub const fn is_required(self) -> bool {
        matches!(
            self,
            ComponentType::Cpu
                | ComponentType::Motherboard
                | ComponentType::Ram
                | ComponentType::PowerSupply
                | ComponentType::Case
                | ComponentType::Storage
        )
    }

    /// May appear more than once in a build.
    pub const fn allows_multiple(self) -> bool {
        matches!(
            self,
            ComponentType::Ram | ComponentType::Storage | ComponentType::Monitor
        )
    }

    /// Not a core internal component.
    pub const fn is_peripheral(self) -> bool {
        matches!(
            self,
            ComponentType::Monitor
                | ComponentType::Keyboard
                | ComponentType::Mouse
                | ComponentType::Headphones
                | ComponentType::Speakers
        )
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ComponentType::Cpu => "Processor",
            ComponentType::Gpu => "Graphics card",
            ComponentType::Motherboard => "Motherboard",
            ComponentType::Ram => "Memory",
            ComponentType::PowerSupply => "Power supply",
            ComponentType::Case => "Case",
            ComponentType::Cooler => "Cooler",
            ComponentType::Storage => "Storage",
            ComponentType::Monitor => "Monitor",
            ComponentType::Keyboard => "Keyboard",
            ComponentType::Mouse => "Mouse",
            ComponentType::Headphones => "Headphones",
            ComponentType::Speakers => "Speakers",
        }
    }

    /// Canonical storage token, e.g. `POWER_SUPPLY`.
    pub fn token(&self) -> &'static str {
        match self {
            ComponentType::Cpu => "CPU",
            ComponentType::Gpu => "GPU",
            ComponentType::Motherboard => "MOTHERBOARD",
            ComponentType::Ram => "RAM",
            ComponentType::PowerSupply => "POWER_SUPPLY",
            ComponentType::Case => "CASE",
            ComponentType::Cooler => "COOLER",
            ComponentType::Storage => "STORAGE",
            ComponentType::Monitor => "MONITOR",
            ComponentType::Keyboard => "KEYBOARD",
            ComponentType::Mouse => "MOUSE",
            ComponentType::Headphones => "HEADPHONES",
            ComponentType::Speakers => "SPEAKERS",
        }
    }

    /// Resolve a type token, falling back to a category-slug alias table.
    pub fn resolve(token: &str, aliases: &BTreeMap<String, ComponentType>) -> Option<Self> {
        token
            .parse()
            .ok()
            .or_else(|| aliases.get(&token.trim().to_lowercase()).copied())
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown component type: {0}")]
pub struct UnknownComponentType(pub String);

impl FromStr for ComponentType {
    type Err = UnknownComponentType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace(['-', ' '], "_");
        let ty = match normalized.as_str() {
            "CPU" | "PROCESSOR" => ComponentType::Cpu,
            "GPU" | "VIDEO_CARD" | "GRAPHICS_CARD" => ComponentType::Gpu,
            "MOTHERBOARD" | "MB" => ComponentType::Motherboard,
            "RAM" | "MEMORY" => ComponentType::Ram,
            "POWER_SUPPLY" | "POWERSUPPLY" | "PSU" => ComponentType::PowerSupply,
            "CASE" => ComponentType::Case,
            "COOLER" => ComponentType::Cooler,
            "STORAGE" => ComponentType::Storage,
            "MONITOR" => ComponentType::Monitor,
            "KEYBOARD" => ComponentType::Keyboard,
            "MOUSE" => ComponentType::Mouse,
            "HEADPHONES" | "HEADSET" => ComponentType::Headphones,
            "SPEAKERS" => ComponentType::Speakers,
            _ => return Err(UnknownComponentType(s.to_string())),
        };
        Ok(ty)
    }
}

/// Catalog identity of a component.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct ComponentId(pub u64);

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A catalog product as seen by the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Component {
    pub id: ComponentId,
    #[serde(rename = "type")]
    pub component_type: ComponentType,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub manufacturer_id: Option<u64>,
    /// Specification key -> value. The only source of truth for attributes.
    #[serde(default)]
    pub specs: BTreeMap<String, String>,
}

impl Component {
    pub fn new(id: u64, component_type: ComponentType, name: impl Into<String>) -> Self {
        Self {
            id: ComponentId(id),
            component_type,
            name: name.into(),
            price: 0.0,
            manufacturer_id: None,
            specs: BTreeMap::new(),
        }
    }

    pub fn with_spec(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.specs.insert(key.into(), value.into());
        self
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = price;
        self
    }

    /// Spec value for `key`; blank values count as absent.
    pub fn spec(&self, key: &str) -> Option<&str> {
        self.specs
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// First present spec among `keys`, with the key that matched.
    pub fn spec_any<'a>(&'a self, keys: &'a [String]) -> Option<(&'a str, &'a str)> {
        keys.iter()
            .find_map(|k| self.spec(k).map(|v| (k.as_str(), v)))
    }

    /// Name for messages, falling back to type and id.
    pub fn label(&self) -> String {
        if self.name.trim().is_empty() {
            format!("{} {}", self.component_type.display_name(), self.id)
        } else {
            self.name.clone()
        }
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("duplicate component id {0}")]
    DuplicateId(ComponentId),
    #[error("failed to parse catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Catalog record as supplied by the storage layer. Either `type` or a
/// category slug identifies the component type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub id: u64,
    #[serde(rename = "type", default)]
    pub component_type: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub manufacturer_id: Option<u64>,
    #[serde(default)]
    pub specs: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct CatalogDocument {
    #[serde(default)]
    components: Vec<CatalogRecord>,
}

/// A record that could not be imported.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRecord {
    pub id: ComponentId,
    pub reason: String,
}

/// Flat component table keyed by id.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    components: BTreeMap<ComponentId, Component>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, component: Component) -> Result<(), CatalogError> {
        if self.components.contains_key(&component.id) {
            return Err(CatalogError::DuplicateId(component.id));
        }
        self.components.insert(component.id, component);
        Ok(())
    }

    pub fn get(&self, id: ComponentId) -> Option<&Component> {
        self.components.get(&id)
    }

    /// Batch lookup; ids absent from the catalog are dropped.
    pub fn get_many(&self, ids: &[ComponentId]) -> Vec<&Component> {
        ids.iter().filter_map(|id| self.components.get(id)).collect()
    }

    pub fn of_type(&self, component_type: ComponentType) -> Vec<&Component> {
        self.components
            .values()
            .filter(|c| c.component_type == component_type)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Component> {
        self.components.values()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Build a catalog from storage records. Records whose type cannot be
    /// resolved are skipped and reported rather than failing the import.
    pub fn from_records(
        records: Vec<CatalogRecord>,
        aliases: &BTreeMap<String, ComponentType>,
    ) -> Result<(Self, Vec<SkippedRecord>), CatalogError> {
        let mut catalog = Self::new();
        let mut skipped = Vec::new();

        for record in records {
            let id = ComponentId(record.id);
            let token = record
                .component_type
                .as_deref()
                .or(record.category.as_deref());

            let component_type = match token.and_then(|t| ComponentType::resolve(t, aliases)) {
                Some(t) => t,
                None => {
                    let reason = format!(
                        "unresolvable component type {:?}",
                        token.unwrap_or("<none>")
                    );
                    tracing::warn!("Skipping catalog record {}: {}", id, reason);
                    skipped.push(SkippedRecord { id, reason });
                    continue;
                }
            };

            catalog.insert(Component {
                id,
                component_type,
                name: record.name,
                price: record.price,
                manufacturer_id: record.manufacturer_id,
                specs: record.specs,
            })?;
        }

        tracing::debug!(
            "Imported {} catalog components ({} skipped)",
            catalog.len(),
            skipped.len()
        );
        Ok((catalog, skipped))
    }

    /// Parse a `{"components": [...]}` catalog document.
    pub fn from_json_str(
        json: &str,
        aliases: &BTreeMap<String, ComponentType>,
    ) -> Result<(Self, Vec<SkippedRecord>), CatalogError> {
        let document: CatalogDocument = serde_json::from_str(json)?;
        Self::from_records(document.components, aliases)
    }
}

impl FromIterator<Component> for Catalog {
    /// Later duplicates replace earlier ones.
    fn from_iter<I: IntoIterator<Item = Component>>(iter: I) -> Self {
        Self {
            components: iter.into_iter().map(|c| (c.id, c)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_flags() {
        assert!(ComponentType::Cpu.is_required());
        assert!(!ComponentType::Gpu.is_required());
        assert!(ComponentType::Ram.allows_multiple());
        assert!(!ComponentType::PowerSupply.allows_multiple());
        assert!(ComponentType::Mouse.is_peripheral());
        assert!(!ComponentType::Case.is_peripheral());
        let required: Vec<_> = ComponentType::ALL.iter().filter(|t| t.is_required()).collect();
        assert_eq!(required.len(), 6);
    }

    #[test]
    fn test_type_tokens() {
        assert_eq!("PSU".parse::<ComponentType>().unwrap(), ComponentType::PowerSupply);
        assert_eq!("mb".parse::<ComponentType>().unwrap(), ComponentType::Motherboard);
        assert_eq!("power-supply".parse::<ComponentType>().unwrap(), ComponentType::PowerSupply);
        assert!("TOASTER".parse::<ComponentType>().is_err());
        for ty in ComponentType::ALL {
            assert_eq!(ty.token().parse::<ComponentType>().unwrap(), ty);
        }
    }

    #[test]
    fn test_serde_aliases() {
        let ty: ComponentType = serde_json::from_str("\"PSU\"").unwrap();
        assert_eq!(ty, ComponentType::PowerSupply);
        assert_eq!(serde_json::to_string(&ComponentType::PowerSupply).unwrap(), "\"POWER_SUPPLY\"");
    }

    #[test]
    fn test_blank_spec_is_absent() {
        let c = Component::new(1, ComponentType::Cpu, "CPU")
            .with_spec("socket", "  ")
            .with_spec("tdp", " 125 ");
        assert_eq!(c.spec("socket"), None);
        assert_eq!(c.spec("tdp"), Some("125"));
        assert_eq!(c.spec("missing"), None);
    }

    #[test]
    fn test_catalog_import_with_aliases() {
        let mut aliases = BTreeMap::new();
        aliases.insert("mice".to_string(), ComponentType::Mouse);

        let json = r#"{"components": [
            {"id": 1, "type": "CPU", "name": "Core i5", "specs": {"socket": "LGA1700"}},
            {"id": 2, "category": "mice", "name": "Mouse"},
            {"id": 3, "type": "FRIDGE", "name": "Cold box"}
        ]}"#;
        let (catalog, skipped) = Catalog::from_json_str(json, &aliases).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get(ComponentId(2)).unwrap().component_type, ComponentType::Mouse);
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].id, ComponentId(3));
    }

    #[test]
    fn test_catalog_duplicate_id() {
        let mut catalog = Catalog::new();
        catalog.insert(Component::new(1, ComponentType::Cpu, "a")).unwrap();
        let err = catalog.insert(Component::new(1, ComponentType::Gpu, "b")).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateId(ComponentId(1))));
    }
}
