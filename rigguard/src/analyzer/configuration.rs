//! Whole-build analysis.
//!
//! One call walks a fixed sequence of stages and always terminates:
//!
//! ```text
//! COLLECT_PAIRS -> EVALUATE_RULES -> EVALUATE_POWER -> CLASSIFY_MISSING
//!     -> [EVALUATE_HEURISTICS] -> AGGREGATE
//! ```

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::analyzer::aggregate::{CompatibilityAnalysisResult, IssueAggregator};
use crate::analyzer::checker::{CompatibilityChecker, PairReport};
use crate::analyzer::conflicts::{ConflictGraph, Hotspot};
use crate::analyzer::heuristics::BuildHeuristics;
use crate::analyzer::power::{PowerBudgetCalculator, PowerReport};
use crate::config::EngineConfig;
use crate::model::{
    BuildItem, CompatibilityIssue, ComponentId, ComponentType, IssueCategory, IssueType, ResolvedBuild,
};
use crate::rules::{RuleId, RuleSet, SkipReason};

/// Caller intent for one analysis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalysisOptions {
    /// The build is still in progress: missing parts are warnings, and an
    /// empty build has no issues at all.
    pub partial: bool,
}

impl AnalysisOptions {
    pub fn partial() -> Self {
        Self { partial: true }
    }

    pub fn final_build() -> Self {
        Self { partial: false }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisStage {
    CollectPairs,
    EvaluateRules,
    EvaluatePower,
    ClassifyMissing,
    EvaluateHeuristics,
    Aggregate,
}

impl fmt::Display for AnalysisStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AnalysisStage::CollectPairs => "COLLECT_PAIRS",
            AnalysisStage::EvaluateRules => "EVALUATE_RULES",
            AnalysisStage::EvaluatePower => "EVALUATE_POWER",
            AnalysisStage::ClassifyMissing => "CLASSIFY_MISSING",
            AnalysisStage::EvaluateHeuristics => "EVALUATE_HEURISTICS",
            AnalysisStage::Aggregate => "AGGREGATE",
        };
        f.write_str(s)
    }
}

/// A rule that was skipped for a pair during analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub rule_id: RuleId,
    pub components: (ComponentId, ComponentId),
    pub reason: SkipReason,
}

/// Result plus the intermediate data it was built from.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub result: CompatibilityAnalysisResult,
    pub power: PowerReport,
    pub pairs: Vec<PairReport>,
    pub diagnostics: Vec<Diagnostic>,
    pub hotspots: Vec<Hotspot>,
}

pub struct ConfigurationAnalyzer {
    checker: CompatibilityChecker,
    power: PowerBudgetCalculator,
    aggregator: IssueAggregator,
    config: EngineConfig,
}

impl ConfigurationAnalyzer {
    pub fn new(rules: Arc<RuleSet>, config: EngineConfig) -> Self {
        Self {
            checker: CompatibilityChecker::new(rules, &config),
            power: PowerBudgetCalculator::new(config.power.clone()),
            aggregator: IssueAggregator::new(config.scoring.clone()),
            config,
        }
    }

    pub fn checker(&self) -> &CompatibilityChecker {
        &self.checker
    }

    pub fn power_calculator(&self) -> &PowerBudgetCalculator {
        &self.power
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn analyze(&self, build: &ResolvedBuild<'_>, options: AnalysisOptions) -> CompatibilityAnalysisResult {
        self.analyze_detailed(build, options).result
    }

    pub fn analyze_detailed(&self, build: &ResolvedBuild<'_>, options: AnalysisOptions) -> AnalysisReport {
        let mut issues = Vec::new();

        enter(AnalysisStage::CollectPairs);
        let pairs = collect_pairs(build);

        enter(AnalysisStage::EvaluateRules);
        let reports: Vec<PairReport> = pairs
            .iter()
            .map(|(a, b)| self.checker.evaluate_pair(a.component, b.component))
            .collect();
        let graph = ConflictGraph::from_reports(&reports);
        issues.extend(self.rule_issues(build, &reports, &graph));
        let diagnostics: Vec<Diagnostic> = reports
            .iter()
            .flat_map(|r| {
                r.skipped.iter().map(move |s| Diagnostic {
                    rule_id: s.rule_id,
                    components: (r.first, r.second),
                    reason: s.reason.clone(),
                })
            })
            .collect();

        enter(AnalysisStage::EvaluatePower);
        let power = self.power.calculate(build);
        issues.extend(self.power.to_issue(&power));

        enter(AnalysisStage::ClassifyMissing);
        issues.extend(missing_components(build, options));

        if self.config.heuristics.enabled {
            enter(AnalysisStage::EvaluateHeuristics);
            let heuristics = BuildHeuristics::new(
                &self.config.heuristics,
                &self.config.performance_keys,
                self.checker.rules(),
            );
            issues.extend(heuristics.check(build, &power));
        }

        enter(AnalysisStage::Aggregate);
        let result = self.aggregator.aggregate(issues);

        tracing::info!(
            "Analyzed {} component(s), {} pair(s): {} (score {}, {} critical, {} warning(s), {} recommendation(s))",
            build.items().len(),
            reports.len(),
            result.overall_status,
            result.compatibility_score,
            result.critical_errors.len(),
            result.warnings.len(),
            result.recommendations.len()
        );

        AnalysisReport {
            result,
            power,
            pairs: reports,
            diagnostics,
            hotspots: graph.hotspots(),
        }
    }

    fn rule_issues(
        &self,
        build: &ResolvedBuild<'_>,
        reports: &[PairReport],
        graph: &ConflictGraph,
    ) -> Vec<CompatibilityIssue> {
        let label = |id: ComponentId| {
            build
                .components()
                .find(|c| c.id == id)
                .map(|c| c.label())
                .unwrap_or_else(|| id.to_string())
        };
        let hotspot = graph.top_hotspot(2);

        let mut issues = Vec::new();
        for report in reports {
            for failure in &report.failures {
                let description = format!(
                    "{} and {} are incompatible: {}",
                    label(report.first),
                    label(report.second),
                    failure.detail
                );
                let issue_type = if failure.advisory {
                    IssueType::Recommendation
                } else {
                    IssueType::CriticalError
                };
                let mut issue = CompatibilityIssue::new(
                    issue_type,
                    IssueCategory::Compatibility,
                    failure.description.clone(),
                    description,
                )
                .with_components(report.first, report.second)
                .with_details(format!("rule {}: {}", failure.rule_id, failure.detail));

                if let Some(spot) = hotspot.filter(|h| !failure.advisory && issue.involves(h.component)) {
                    issue = issue.with_suggestion(format!(
                        "Replacing {} resolves {} conflicts",
                        label(spot.component),
                        spot.degree
                    ));
                }
                issues.push(issue);
            }
        }
        issues
    }
}

fn enter(stage: AnalysisStage) {
    tracing::debug!("Analysis stage {}", stage);
}

/// Unordered pairs of distinct build items.
fn collect_pairs<'b, 'a>(build: &'b ResolvedBuild<'a>) -> Vec<(&'b BuildItem<'a>, &'b BuildItem<'a>)> {
    let items = build.items();
    let mut pairs = Vec::with_capacity(items.len() * items.len().saturating_sub(1) / 2);
    for (i, a) in items.iter().enumerate() {
        for b in &items[i + 1..] {
            pairs.push((a, b));
        }
    }
    pairs
}

fn missing_components(build: &ResolvedBuild<'_>, options: AnalysisOptions) -> Vec<CompatibilityIssue> {
    if options.partial && build.is_empty() {
        return Vec::new();
    }
    ComponentType::ALL
        .iter()
        .filter(|t| t.is_required() && !build.has_type(**t))
        .map(|t| {
            let title = format!("Missing {}", t.display_name().to_lowercase());
            let description = format!("A complete build needs a {}", t.display_name().to_lowercase());
            let issue = if options.partial {
                CompatibilityIssue::warning(IssueCategory::MissingComponent, title, description)
            } else {
                CompatibilityIssue::critical(IssueCategory::MissingComponent, title, description)
            };
            issue.with_details(format!("required type {}", t))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::aggregate::OverallStatus;
    use crate::model::Component;
    use crate::rules::{CompatibilityRule, Operator, RuleKind};

    fn analyzer() -> ConfigurationAnalyzer {
        let rules = RuleSet::new(vec![CompatibilityRule::new(
            1,
            (ComponentType::Cpu, "socket"),
            (ComponentType::Motherboard, "socket"),
            RuleKind::ExactMatch(Operator::Equals),
        )
        .with_description("CPU socket must match")]);
        ConfigurationAnalyzer::new(Arc::new(rules), EngineConfig::default())
    }

    fn full_build(cpu_socket: &str) -> Vec<Component> {
        vec![
            Component::new(1, ComponentType::Cpu, "cpu")
                .with_spec("socket", cpu_socket)
                .with_spec("tdp", "100"),
            Component::new(2, ComponentType::Motherboard, "board").with_spec("socket", "LGA1700"),
            Component::new(3, ComponentType::Ram, "ram"),
            Component::new(4, ComponentType::PowerSupply, "psu").with_spec("wattage", "750"),
            Component::new(5, ComponentType::Case, "case"),
            Component::new(6, ComponentType::Storage, "ssd"),
        ]
    }

    fn resolve(components: &[Component]) -> ResolvedBuild<'_> {
        ResolvedBuild::new(components.iter().map(|c| (c, 1)).collect()).unwrap()
    }

    #[test]
    fn test_clean_build_is_excellent() {
        let components = full_build("LGA1700");
        let result = analyzer().analyze(&resolve(&components), AnalysisOptions::final_build());
        assert_eq!(result.overall_status, OverallStatus::Excellent);
        assert_eq!(result.compatibility_score, 100.0);
    }

    #[test]
    fn test_rule_failure_becomes_critical_issue() {
        let components = full_build("AM4");
        let report = analyzer().analyze_detailed(&resolve(&components), AnalysisOptions::final_build());
        let result = &report.result;
        assert_eq!(result.critical_errors.len(), 1);
        assert_eq!(result.critical_errors[0].category, IssueCategory::Compatibility);
        assert_eq!(result.critical_errors[0].title, "CPU socket must match");
        assert!(result.critical_errors[0].involves(ComponentId(1)));
        assert_eq!(report.pairs.len(), 15);
        assert_eq!(report.hotspots.len(), 2);
    }

    #[test]
    fn test_missing_components_by_intent() {
        let components = vec![Component::new(1, ComponentType::Cpu, "cpu")];
        let build = resolve(&components);

        let final_result = analyzer().analyze(&build, AnalysisOptions::final_build());
        assert_eq!(final_result.critical_errors.len(), 5);
        assert!(final_result
            .critical_errors
            .iter()
            .all(|i| i.category == IssueCategory::MissingComponent));

        let partial = analyzer().analyze(&build, AnalysisOptions::partial());
        assert!(partial.compatible);
        assert_eq!(partial.warnings.len(), 5);
    }

    #[test]
    fn test_empty_build() {
        let build = ResolvedBuild::default();
        let partial = analyzer().analyze(&build, AnalysisOptions::partial());
        assert_eq!(partial.overall_status, OverallStatus::Excellent);
        assert_eq!(partial.total_issues(), 0);

        let final_result = analyzer().analyze(&build, AnalysisOptions::final_build());
        assert_eq!(final_result.critical_errors.len(), 6);
        assert_eq!(final_result.compatibility_score, 0.0);
    }

    #[test]
    fn test_hotspot_suggestion() {
        let rules = RuleSet::new(vec![
            CompatibilityRule::new(
                1,
                (ComponentType::Cpu, "socket"),
                (ComponentType::Motherboard, "socket"),
                RuleKind::ExactMatch(Operator::Equals),
            ),
            CompatibilityRule::new(
                2,
                (ComponentType::Cooler, "sockets"),
                (ComponentType::Cpu, "socket"),
                RuleKind::CompatibilityList(crate::rules::ListOp::Includes),
            ),
        ]);
        let analyzer = ConfigurationAnalyzer::new(Arc::new(rules), EngineConfig::default());
        let components = vec![
            Component::new(1, ComponentType::Cpu, "Odd CPU").with_spec("socket", "AM4"),
            Component::new(2, ComponentType::Motherboard, "board").with_spec("socket", "LGA1700"),
            Component::new(3, ComponentType::Cooler, "cooler").with_spec("sockets", "LGA1700, LGA1200"),
        ];
        let result = analyzer.analyze(&resolve(&components), AnalysisOptions::partial());
        let compat: Vec<_> = result.issues_in(IssueCategory::Compatibility).collect();
        assert_eq!(compat.len(), 2);
        assert!(compat.iter().all(|i| i
            .recommendation
            .as_deref()
            .map(|r| r.starts_with("Replacing Odd CPU resolves 2"))
            .unwrap_or(false)));
    }

    #[test]
    fn test_heuristics_only_when_enabled() {
        let components = full_build("LGA1700");
        let build = resolve(&components);
        let rules = Arc::new(RuleSet::default());

        let off = ConfigurationAnalyzer::new(Arc::clone(&rules), EngineConfig::default());
        assert_eq!(off.analyze(&build, AnalysisOptions::final_build()).total_issues(), 0);

        let mut config = EngineConfig::default();
        config.heuristics.enabled = true;
        let on = ConfigurationAnalyzer::new(rules, config);
        let result = on.analyze(&build, AnalysisOptions::final_build());
        // 100W on a 750W supply is oversized.
        assert!(result.recommendations.iter().any(|i| i.title == "Oversized power supply"));
    }
}
