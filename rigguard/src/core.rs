//! Engine facade shared by the CLI and any embedding service.
//! No I/O happens during analysis; files are only read by the loaders.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::analyzer::{
    AnalysisOptions, AnalysisReport, CompatibilityAnalysisResult, ConfigurationAnalyzer, PowerReport,
};
use crate::config::EngineConfig;
use crate::model::{
    Catalog, CatalogError, Component, ComponentId, ComponentType, ConfigurationError, PcConfiguration,
    ResolvedBuild, SkippedRecord,
};
use crate::rules::{default_rule_set, InMemoryRuleStore, RuleSet, RuleStore};

#[derive(Debug, thiserror::Error)]
pub enum RigGuardError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("Unknown component {0}")]
    UnknownComponent(ComponentId),
}

/// One line of a build document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildLine {
    pub id: u64,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

/// Build as exchanged in JSON: `{"name": "...", "components": [{"id": 1}]}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildDocument {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub components: Vec<BuildLine>,
}

impl BuildDocument {
    pub fn load(path: &Path) -> Result<Self, RigGuardError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Read a catalog document, logging records that were skipped.
pub fn load_catalog(path: &Path, config: &EngineConfig) -> Result<(Catalog, Vec<SkippedRecord>), RigGuardError> {
    let content = std::fs::read_to_string(path)?;
    let (catalog, skipped) = Catalog::from_json_str(&content, &config.category_aliases)?;
    tracing::info!(
        "Loaded {} components from {} ({} skipped)",
        catalog.len(),
        path.display(),
        skipped.len()
    );
    Ok((catalog, skipped))
}

/// Engine API over one catalog, one rule store and one policy.
pub struct RigGuardCore {
    catalog: Catalog,
    store: Arc<dyn RuleStore>,
    config: EngineConfig,
}

impl RigGuardCore {
    pub fn new(catalog: Catalog, rules: RuleSet, config: EngineConfig) -> Self {
        Self::with_store(catalog, Arc::new(InMemoryRuleStore::new(rules)), config)
    }

    /// Use an external rule store; each analysis takes its own snapshot.
    pub fn with_store(catalog: Catalog, store: Arc<dyn RuleStore>, config: EngineConfig) -> Self {
        Self { catalog, store, config }
    }

    /// Catalog with the built-in rules and default policy.
    pub fn with_defaults(catalog: Catalog) -> Self {
        Self::new(catalog, default_rule_set(), EngineConfig::default())
    }

    /// Load everything from files. Without a rules file the built-in rules
    /// are used; without a config file the defaults apply.
    pub fn from_files(
        catalog: &Path,
        rules: Option<&Path>,
        config: Option<&Path>,
    ) -> Result<Self, RigGuardError> {
        let config = match config {
            Some(path) => EngineConfig::load(path)?,
            None => EngineConfig::default(),
        };
        let rules = match rules {
            Some(path) => RuleSet::load(path)?,
            None => default_rule_set(),
        };
        let (catalog, _) = load_catalog(catalog, &config)?;
        Ok(Self::new(catalog, rules, config))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn rules(&self) -> Arc<RuleSet> {
        self.store.snapshot()
    }

    pub fn store(&self) -> &Arc<dyn RuleStore> {
        &self.store
    }

    /// Analyzer bound to the current rule snapshot.
    pub fn analyzer(&self) -> ConfigurationAnalyzer {
        ConfigurationAnalyzer::new(self.store.snapshot(), self.config.clone())
    }

    pub fn component(&self, id: ComponentId) -> Result<&Component, RigGuardError> {
        self.catalog.get(id).ok_or(RigGuardError::UnknownComponent(id))
    }

    pub fn check_components_compatibility(&self, a: &Component, b: &Component) -> bool {
        self.analyzer().checker().check_pair(a, b)
    }

    pub fn check_configuration_compatibility(&self, candidate: &Component, existing: &[&Component]) -> bool {
        self.analyzer().checker().check_pairwise(candidate, existing)
    }

    /// `(existing component, reason)` for every blocking rule failure.
    pub fn incompatibility_details(
        &self,
        candidate: &Component,
        existing: &[&Component],
    ) -> Vec<(ComponentId, String)> {
        self.analyzer().checker().incompatibility_details(candidate, existing)
    }

    pub fn get_compatible_components<'c>(
        &self,
        source: &Component,
        target_type: ComponentType,
        pool: &[&'c Component],
    ) -> Vec<&'c Component> {
        self.analyzer()
            .checker()
            .compatible_components(source, target_type, pool)
    }

    /// Catalog components of `target_type` compatible with `source_id`.
    pub fn compatible_in_catalog(
        &self,
        source_id: ComponentId,
        target_type: ComponentType,
    ) -> Result<Vec<&Component>, RigGuardError> {
        let source = self.component(source_id)?;
        let pool = self.catalog.of_type(target_type);
        Ok(self.get_compatible_components(source, target_type, &pool))
    }

    /// Analyze a stored build. Only precondition violations are errors.
    pub fn analyze_configuration(
        &self,
        configuration: &PcConfiguration,
        options: AnalysisOptions,
    ) -> Result<CompatibilityAnalysisResult, RigGuardError> {
        let build = configuration.resolve(&self.catalog)?;
        Ok(self.analyze_build(&build, options))
    }

    pub fn analyze_build(&self, build: &ResolvedBuild<'_>, options: AnalysisOptions) -> CompatibilityAnalysisResult {
        self.analyzer().analyze(build, options)
    }

    pub fn analyze_detailed(
        &self,
        configuration: &PcConfiguration,
        options: AnalysisOptions,
    ) -> Result<AnalysisReport, RigGuardError> {
        let build = configuration.resolve(&self.catalog)?;
        Ok(self.analyzer().analyze_detailed(&build, options))
    }

    /// Analyze and store the result on the configuration.
    pub fn analyze_and_record(
        &self,
        configuration: &mut PcConfiguration,
        options: AnalysisOptions,
    ) -> Result<CompatibilityAnalysisResult, RigGuardError> {
        let result = self.analyze_configuration(configuration, options)?;
        configuration.record_analysis(&result);
        Ok(result)
    }

    pub fn calculate_power_budget(&self, configuration: &PcConfiguration) -> Result<PowerReport, RigGuardError> {
        let build = configuration.resolve(&self.catalog)?;
        Ok(self.analyzer().power_calculator().calculate(&build))
    }

    /// Turn a build document into a configuration over this catalog.
    pub fn configuration_from_document(&self, document: &BuildDocument) -> Result<PcConfiguration, RigGuardError> {
        let name = if document.name.trim().is_empty() {
            "Untitled build".to_string()
        } else {
            document.name.clone()
        };
        let mut configuration = PcConfiguration::new(name);
        for line in &document.components {
            let component = self.component(ComponentId(line.id))?;
            configuration.add_with_quantity(component, line.quantity)?;
        }
        Ok(configuration)
    }

    pub fn load_configuration(&self, path: &Path) -> Result<PcConfiguration, RigGuardError> {
        let document = BuildDocument::load(path)?;
        self.configuration_from_document(&document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn core() -> RigGuardCore {
        let catalog: Catalog = [
            Component::new(1, ComponentType::Cpu, "cpu").with_spec("socket", "AM5"),
            Component::new(2, ComponentType::Motherboard, "am5 board").with_spec("socket", "AM5"),
            Component::new(3, ComponentType::Motherboard, "intel board").with_spec("socket", "LGA1700"),
        ]
        .into_iter()
        .collect();
        RigGuardCore::with_defaults(catalog)
    }

    #[test]
    fn test_facade_pair_and_pool() {
        let core = core();
        let cpu = core.component(ComponentId(1)).unwrap();
        let good = core.component(ComponentId(2)).unwrap();
        let bad = core.component(ComponentId(3)).unwrap();

        assert!(core.check_components_compatibility(cpu, good));
        assert!(!core.check_components_compatibility(bad, cpu));
        assert!(!core.check_configuration_compatibility(cpu, &[good, bad]));

        let found = core.compatible_in_catalog(ComponentId(1), ComponentType::Motherboard).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, ComponentId(2));
    }

    #[test]
    fn test_document_errors() {
        let core = core();
        let unknown = BuildDocument {
            name: String::new(),
            components: vec![BuildLine { id: 42, quantity: 1 }],
        };
        assert!(matches!(
            core.configuration_from_document(&unknown),
            Err(RigGuardError::UnknownComponent(ComponentId(42)))
        ));

        let duplicate = BuildDocument {
            name: "two boards".to_string(),
            components: vec![BuildLine { id: 2, quantity: 1 }, BuildLine { id: 3, quantity: 1 }],
        };
        assert!(matches!(
            core.configuration_from_document(&duplicate),
            Err(RigGuardError::Configuration(ConfigurationError::DuplicateType { .. }))
        ));

        let repeated: BuildDocument = serde_json::from_str(
            r#"{"components": [{"id": 1, "quantity": 4294967295}, {"id": 1, "quantity": 1}]}"#,
        )
        .unwrap();
        assert!(matches!(
            core.configuration_from_document(&repeated),
            Err(RigGuardError::Configuration(ConfigurationError::QuantityOverflow(ComponentId(1))))
        ));
    }

    #[test]
    fn test_analyze_and_record() {
        let core = core();
        let document: BuildDocument =
            serde_json::from_str(r#"{"name": "wip", "components": [{"id": 1}, {"id": 3}]}"#).unwrap();
        let mut configuration = core.configuration_from_document(&document).unwrap();

        let result = core
            .analyze_and_record(&mut configuration, AnalysisOptions::partial())
            .unwrap();
        assert!(!result.compatible);
        assert_eq!(configuration.is_compatible, Some(false));
        assert!(configuration.last_analysis.is_some());
    }
}
