//! Compatibility rules: storage records, typed rules, evaluation and sets.

pub mod builtin;
pub mod evaluator;
pub mod model;
pub mod record;
pub mod set;

pub use builtin::default_rule_set;
pub use evaluator::{RuleEvaluator, RuleOutcome, SkipReason};
pub use model::{
    CompatibilityRule, ListOp, NumericOp, Operator, RuleDefect, RuleId, RuleKind, RuleType,
    ValueModifier,
};
pub use record::RuleRecord;
pub use set::{ConflictKind, DefectiveRule, InMemoryRuleStore, RuleConflict, RuleSet, RuleStore};
