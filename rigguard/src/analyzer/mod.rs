//! Build analysis: pairwise checks, power budget, heuristics and scoring.

pub mod aggregate;
pub mod checker;
pub mod configuration;
pub mod conflicts;
pub mod heuristics;
pub mod power;

pub use aggregate::{CompatibilityAnalysisResult, IssueAggregator, IssueSummary, OverallStatus};
pub use checker::{CompatibilityChecker, PairReport, RuleFailure, SkippedRule};
pub use configuration::{AnalysisOptions, AnalysisReport, AnalysisStage, ConfigurationAnalyzer, Diagnostic};
pub use conflicts::{ConflictGraph, Hotspot};
pub use heuristics::BuildHeuristics;
pub use power::{PowerBudgetCalculator, PowerReport, PowerVerdict};
