//! Domain data: catalog components, builds and issues.

pub mod component;
pub mod configuration;
pub mod issue;
pub mod value;

pub use component::{
    Catalog, CatalogError, CatalogRecord, Component, ComponentId, ComponentType, SkippedRecord,
    UnknownComponentType,
};
pub use configuration::{BuildItem, ConfigEntry, ConfigurationError, PcConfiguration, ResolvedBuild};
pub use issue::{CompatibilityIssue, IssueCategory, IssueType};
