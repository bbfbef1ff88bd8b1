//! Pairwise compatibility over a rule set.
//!
//! Pairs without any applicable rule are compatible. A pair is incompatible
//! as soon as one applicable, non-advisory rule fails; skipped rules never
//! decide a verdict.

use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::model::{Component, ComponentId, ComponentType};
use crate::rules::{CompatibilityRule, RuleEvaluator, RuleId, RuleOutcome, RuleSet, SkipReason};

/// One failing rule on a pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleFailure {
    pub rule_id: RuleId,
    pub description: String,
    pub detail: String,
    pub advisory: bool,
}

/// A rule that gave no verdict on a pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRule {
    pub rule_id: RuleId,
    pub reason: SkipReason,
}

/// Every rule outcome for one pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairReport {
    pub first: ComponentId,
    pub second: ComponentId,
    pub rules_checked: usize,
    pub failures: Vec<RuleFailure>,
    pub skipped: Vec<SkippedRule>,
}

impl PairReport {
    pub fn compatible(&self) -> bool {
        self.failures.iter().all(|f| f.advisory)
    }

    pub fn blocking_failures(&self) -> impl Iterator<Item = &RuleFailure> {
        self.failures.iter().filter(|f| !f.advisory)
    }
}

pub struct CompatibilityChecker {
    rules: Arc<RuleSet>,
    evaluator: RuleEvaluator,
    advisory: BTreeSet<RuleId>,
}

impl CompatibilityChecker {
    pub fn new(rules: Arc<RuleSet>, config: &EngineConfig) -> Self {
        Self {
            rules,
            evaluator: RuleEvaluator::new(config.list_delimiters.clone()),
            advisory: config.advisory_rules.clone(),
        }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn is_advisory(&self, rule: &CompatibilityRule) -> bool {
        self.advisory.contains(&rule.id)
    }

    /// Verdict for one pair, stopping at the first blocking failure.
    pub fn check_pair(&self, a: &Component, b: &Component) -> bool {
        if a.id == b.id {
            return true;
        }
        for rule in self.rules.applicable(a.component_type, b.component_type) {
            if self.is_advisory(rule) {
                continue;
            }
            if self.evaluate(rule, a, b).failed() {
                tracing::debug!("{} and {} fail rule {}", a.id, b.id, rule.id);
                return false;
            }
        }
        true
    }

    /// Whether `candidate` fits next to every existing component.
    pub fn check_pairwise(&self, candidate: &Component, existing: &[&Component]) -> bool {
        self.pairwise_verdicts(candidate, existing)
            .iter()
            .all(|(_, compatible)| *compatible)
    }

    /// Per-pair verdicts; every pair is checked.
    pub fn pairwise_verdicts(&self, candidate: &Component, existing: &[&Component]) -> Vec<(ComponentId, bool)> {
        existing
            .iter()
            .map(|other| (other.id, self.check_pair(candidate, other)))
            .collect()
    }

    /// Exhaustive evaluation of every applicable rule on a pair.
    pub fn evaluate_pair(&self, a: &Component, b: &Component) -> PairReport {
        let mut report = PairReport {
            first: a.id,
            second: b.id,
            rules_checked: 0,
            failures: Vec::new(),
            skipped: Vec::new(),
        };
        if a.id == b.id {
            return report;
        }

        for rule in self.rules.applicable(a.component_type, b.component_type) {
            report.rules_checked += 1;
            match self.evaluate(rule, a, b) {
                RuleOutcome::Passed { .. } => {}
                RuleOutcome::Failed { detail, .. } => report.failures.push(RuleFailure {
                    rule_id: rule.id,
                    description: rule.summary(),
                    detail,
                    advisory: self.is_advisory(rule),
                }),
                RuleOutcome::Skipped(reason) => {
                    tracing::warn!("Rule {} skipped for {} / {}: {}", rule.id, a.id, b.id, reason);
                    report.skipped.push(SkippedRule {
                        rule_id: rule.id,
                        reason,
                    });
                }
            }
        }
        report
    }

    /// `(existing component, failing rule description)` for every blocking
    /// failure between `candidate` and `existing`.
    pub fn incompatibility_details(
        &self,
        candidate: &Component,
        existing: &[&Component],
    ) -> Vec<(ComponentId, String)> {
        existing
            .iter()
            .flat_map(|other| {
                let report = self.evaluate_pair(candidate, other);
                report
                    .blocking_failures()
                    .map(|f| (other.id, format!("{} ({})", f.description, f.detail)))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Members of `pool` of `target_type` compatible with `source`.
    pub fn compatible_components<'c>(
        &self,
        source: &Component,
        target_type: ComponentType,
        pool: &[&'c Component],
    ) -> Vec<&'c Component> {
        pool.iter()
            .copied()
            .filter(|c| c.component_type == target_type)
            .filter(|c| self.check_pair(source, c))
            .collect()
    }

    fn evaluate(&self, rule: &CompatibilityRule, a: &Component, b: &Component) -> RuleOutcome {
        self.evaluator.evaluate(rule, a, b)
    }
}
