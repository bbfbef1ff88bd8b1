//! RigGuard - PC build compatibility engine
//!
//! This library decides whether the components of a PC build work together.
//! Rules compare specification values between two component types, a power
//! budget checks the supply against the declared draw, and every problem is
//! collected into a scored, prioritized analysis result.
//!
//! # Quick Start
//!
//! ```no_run
//! use rigguard::{AnalysisOptions, RigGuardCore};
//! use std::path::Path;
//!
//! let core = RigGuardCore::from_files(Path::new("catalog.json"), None, None).unwrap();
//! let build = core.load_configuration(Path::new("build.json")).unwrap();
//! let result = core
//!     .analyze_configuration(&build, AnalysisOptions::final_build())
//!     .unwrap();
//!
//! println!("{} ({})", result.status_message, result.compatibility_score);
//! for issue in result.issues() {
//!     println!("{:?}: {}", issue.issue_type, issue.title);
//! }
//! ```
//!
//! # Features
//!
//! - **Typed rules**: every rule type carries only the operators it supports
//! - **Order-independent checks**: a pair has one verdict whichever way round
//! - **Power budget**: tunable headroom thresholds
//! - **Advisory heuristics**: balance, memory, cooling and sizing hints

pub mod analyzer;
pub mod config;
pub mod core;
pub mod model;
pub mod rules;

// Re-export main types
pub use analyzer::{
    AnalysisOptions, AnalysisReport, CompatibilityAnalysisResult, CompatibilityChecker,
    ConfigurationAnalyzer, IssueAggregator, OverallStatus, PowerBudgetCalculator, PowerReport,
    PowerVerdict,
};
pub use config::EngineConfig;
pub use crate::core::{load_catalog, BuildDocument, RigGuardCore, RigGuardError};
pub use model::{
    Catalog, CompatibilityIssue, Component, ComponentId, ComponentType, IssueCategory, IssueType,
    PcConfiguration, ResolvedBuild,
};
pub use rules::{
    default_rule_set, CompatibilityRule, RuleEvaluator, RuleOutcome, RuleRecord, RuleSet, RuleStore,
};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        AnalysisOptions, Catalog, CompatibilityAnalysisResult, CompatibilityIssue, Component,
        ComponentId, ComponentType, EngineConfig, IssueCategory, IssueType, OverallStatus,
        PcConfiguration, RigGuardCore, RigGuardError, RuleSet,
    };
}
