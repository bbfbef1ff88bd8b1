//! Evaluation of one rule against a concrete pair of components.

use serde::Serialize;
use std::fmt;

use super::model::{CompatibilityRule, ListOp, NumericOp, Operator, RuleKind};
use crate::model::value::{parse_number, same_text, same_unit, split_list};
use crate::model::Component;

/// Why a rule produced no verdict for a pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// Neither orientation of the pair matches the rule's types.
    NotApplicable,
    /// A value that must be numeric did not parse.
    UnparseableNumber { property: String, value: String },
    /// An ordering rule had nothing to compare.
    MissingProperty { property: String },
    /// Both values are numeric but stated in different units.
    UnitMismatch { source: String, target: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotApplicable => f.write_str("rule does not apply to this pair"),
            SkipReason::UnparseableNumber { property, value } => {
                write!(f, "{} value {:?} is not numeric", property, value)
            }
            SkipReason::MissingProperty { property } => write!(f, "{} is not specified", property),
            SkipReason::UnitMismatch { source, target } => {
                write!(f, "{:?} and {:?} use different units", source, target)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RuleOutcome {
    Passed { detail: String, margin: Option<f64> },
    Failed { detail: String, margin: Option<f64> },
    Skipped(SkipReason),
}

impl RuleOutcome {
    pub fn passed(&self) -> bool {
        matches!(self, RuleOutcome::Passed { .. })
    }

    pub fn failed(&self) -> bool {
        matches!(self, RuleOutcome::Failed { .. })
    }

    pub fn detail(&self) -> String {
        match self {
            RuleOutcome::Passed { detail, .. } | RuleOutcome::Failed { detail, .. } => detail.clone(),
            RuleOutcome::Skipped(reason) => format!("skipped: {}", reason),
        }
    }

    /// Signed distance from the threshold for numeric comparisons.
    pub fn margin(&self) -> Option<f64> {
        match self {
            RuleOutcome::Passed { margin, .. } | RuleOutcome::Failed { margin, .. } => *margin,
            RuleOutcome::Skipped(_) => None,
        }
    }
}

fn verdict(ok: bool, detail: String, margin: Option<f64>) -> RuleOutcome {
    if ok {
        RuleOutcome::Passed { detail, margin }
    } else {
        RuleOutcome::Failed { detail, margin }
    }
}

/// Stateless rule evaluator. Comparisons read `source OP target`, with the
/// value modifier applied to the source side.
#[derive(Debug, Clone)]
pub struct RuleEvaluator {
    delimiters: String,
}

impl Default for RuleEvaluator {
    fn default() -> Self {
        Self::new(",;|/")
    }
}

impl RuleEvaluator {
    pub fn new(delimiters: impl Into<String>) -> Self {
        Self {
            delimiters: delimiters.into(),
        }
    }

    /// Evaluate `rule` on an unordered pair.
    ///
    /// Rules between two components of the same type are checked in both
    /// orientations and fail if either does, which keeps the verdict
    /// independent of argument order.
    pub fn evaluate(&self, rule: &CompatibilityRule, a: &Component, b: &Component) -> RuleOutcome {
        let Some((source, target)) = rule.orient(a, b) else {
            return RuleOutcome::Skipped(SkipReason::NotApplicable);
        };
        if !rule.is_same_type() {
            return self.evaluate_oriented(rule, source, target);
        }

        let forward = self.evaluate_oriented(rule, a, b);
        let backward = self.evaluate_oriented(rule, b, a);
        match (&forward, &backward) {
            (RuleOutcome::Failed { .. }, _) => forward,
            (_, RuleOutcome::Failed { .. }) => backward,
            (RuleOutcome::Skipped(_), _) => forward,
            (_, RuleOutcome::Skipped(_)) => backward,
            _ => forward,
        }
    }

    /// Evaluate with `source`/`target` already matched to the rule's types.
    pub fn evaluate_oriented(
        &self,
        rule: &CompatibilityRule,
        source: &Component,
        target: &Component,
    ) -> RuleOutcome {
        let outcome = self.compare(rule, source, target);
        tracing::debug!(
            "Rule {} on {} / {}: {:?}",
            rule.id,
            source.id,
            target.id,
            outcome
        );
        outcome
    }

    fn compare(&self, rule: &CompatibilityRule, source: &Component, target: &Component) -> RuleOutcome {
        let src_key = rule.source_property.as_str();
        let tgt_key = rule.target_property.as_str();

        let (src, tgt) = match (source.spec(src_key), target.spec(tgt_key)) {
            (Some(s), Some(t)) => (s, t),
            (s, _) => {
                let missing = if s.is_none() {
                    format!("{}.{}", source.component_type, src_key)
                } else {
                    format!("{}.{}", target.component_type, tgt_key)
                };
                return if rule.kind.fails_closed() {
                    RuleOutcome::Failed {
                        detail: format!("{} is not specified; compatibility cannot be verified", missing),
                        margin: None,
                    }
                } else {
                    RuleOutcome::Skipped(SkipReason::MissingProperty { property: missing })
                };
            }
        };

        match rule.kind {
            RuleKind::ExactMatch(op) => self.exact_match(rule, op, (src_key, src), (tgt_key, tgt)),
            RuleKind::RangeCheck(op) => self.numeric(rule, op, (src_key, src), (tgt_key, tgt)),
            RuleKind::GreaterThan { inclusive } => {
                let op = if inclusive { NumericOp::Gte } else { NumericOp::Gt };
                self.numeric(rule, op, (src_key, src), (tgt_key, tgt))
            }
            RuleKind::LessThan { inclusive } => {
                let op = if inclusive { NumericOp::Lte } else { NumericOp::Lt };
                self.numeric(rule, op, (src_key, src), (tgt_key, tgt))
            }
            RuleKind::CompatibilityList(op) => self.list_membership(op, (src_key, src), (tgt_key, tgt)),
            RuleKind::SubsetCheck => self.subset((src_key, src), (tgt_key, tgt)),
        }
    }

    fn exact_match(
        &self,
        rule: &CompatibilityRule,
        op: Operator,
        src: (&str, &str),
        tgt: (&str, &str),
    ) -> RuleOutcome {
        if op != Operator::Contains && same_unit(src.1, tgt.1) {
            if let Some(numeric) = numeric_op(op) {
                return self.numeric(rule, numeric, src, tgt);
            }
        }

        let detail = format!("{} {:?} {} {:?}", src.0, src.1, op.symbol(), tgt.1);
        match op {
            Operator::Equals => verdict(same_text(src.1, tgt.1), detail, None),
            Operator::NotEquals => verdict(!same_text(src.1, tgt.1), detail, None),
            Operator::Contains => {
                let haystack = src.1.to_lowercase();
                verdict(haystack.contains(&tgt.1.trim().to_lowercase()), detail, None)
            }
            _ if parse_number(src.1).is_some() && parse_number(tgt.1).is_some() => {
                RuleOutcome::Skipped(SkipReason::UnitMismatch {
                    source: src.1.to_string(),
                    target: tgt.1.to_string(),
                })
            }
            _ => {
                let (property, value) = if parse_number(src.1).is_none() { src } else { tgt };
                RuleOutcome::Skipped(SkipReason::UnparseableNumber {
                    property: property.to_string(),
                    value: value.to_string(),
                })
            }
        }
    }

    fn numeric(
        &self,
        rule: &CompatibilityRule,
        op: NumericOp,
        src: (&str, &str),
        tgt: (&str, &str),
    ) -> RuleOutcome {
        let Some(raw_source) = parse_number(src.1) else {
            return RuleOutcome::Skipped(SkipReason::UnparseableNumber {
                property: src.0.to_string(),
                value: src.1.to_string(),
            });
        };
        let Some(target) = parse_number(tgt.1) else {
            return RuleOutcome::Skipped(SkipReason::UnparseableNumber {
                property: tgt.0.to_string(),
                value: tgt.1.to_string(),
            });
        };

        let source = rule.modifier.map_or(raw_source, |m| m.apply(raw_source));
        let detail = match rule.modifier {
            Some(m) => format!(
                "{} {} (adjusted {} by {}) {} {} {}",
                src.0,
                source,
                raw_source,
                m,
                op.operator().symbol(),
                tgt.0,
                target
            ),
            None => format!("{} {} {} {} {}", src.0, source, op.operator().symbol(), tgt.0, target),
        };
        let margin = match op {
            NumericOp::Gt | NumericOp::Gte => Some(source - target),
            NumericOp::Lt | NumericOp::Lte => Some(target - source),
            NumericOp::Eq | NumericOp::Ne => None,
        };
        verdict(op.holds(source, target), detail, margin)
    }

    fn list_membership(&self, op: ListOp, src: (&str, &str), tgt: (&str, &str)) -> RuleOutcome {
        let left = split_list(src.1, &self.delimiters);
        let right = split_list(tgt.1, &self.delimiters);
        let shared = left.iter().any(|token| right.contains(token));
        let detail = format!("{} [{}] vs {} [{}]", src.0, left.join(", "), tgt.0, right.join(", "));
        match op {
            ListOp::Includes => verdict(shared, detail, None),
            ListOp::Excludes => verdict(!shared, detail, None),
        }
    }

    fn subset(&self, src: (&str, &str), tgt: (&str, &str)) -> RuleOutcome {
        let required = split_list(src.1, &self.delimiters);
        let offered = split_list(tgt.1, &self.delimiters);
        let missing: Vec<&str> = required
            .iter()
            .filter(|token| !offered.contains(token))
            .map(String::as_str)
            .collect();
        let detail = if missing.is_empty() {
            format!("every {} token is offered by {}", src.0, tgt.0)
        } else {
            format!("{} lacks {}", tgt.0, missing.join(", "))
        };
        verdict(missing.is_empty(), detail, None)
    }
}

fn numeric_op(op: Operator) -> Option<NumericOp> {
    match op {
        Operator::Equals => Some(NumericOp::Eq),
        Operator::NotEquals => Some(NumericOp::Ne),
        Operator::GreaterThan => Some(NumericOp::Gt),
        Operator::LessThan => Some(NumericOp::Lt),
        Operator::GreaterThanEquals => Some(NumericOp::Gte),
        Operator::LessThanEquals => Some(NumericOp::Lte),
        Operator::Contains => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ComponentType;
    use crate::rules::model::ValueModifier;

    fn socket_rule() -> CompatibilityRule {
        CompatibilityRule::new(
            1,
            (ComponentType::Cpu, "socket"),
            (ComponentType::Motherboard, "socket"),
            RuleKind::ExactMatch(Operator::Equals),
        )
    }

    fn cpu(socket: &str) -> Component {
        Component::new(1, ComponentType::Cpu, "cpu").with_spec("socket", socket)
    }

    fn board(socket: &str) -> Component {
        Component::new(2, ComponentType::Motherboard, "board").with_spec("socket", socket)
    }

    #[test]
    fn test_exact_match_text() {
        let eval = RuleEvaluator::default();
        assert!(eval.evaluate(&socket_rule(), &cpu("LGA1700"), &board("lga1700")).passed());
        assert!(eval.evaluate(&socket_rule(), &cpu("AM4"), &board("LGA1700")).failed());
        // Argument order does not matter.
        assert!(eval.evaluate(&socket_rule(), &board("AM4"), &cpu("LGA1700")).failed());
    }

    #[test]
    fn test_exact_match_respects_units() {
        let rule = CompatibilityRule::new(
            3,
            (ComponentType::Ram, "module_size"),
            (ComponentType::Motherboard, "module_size"),
            RuleKind::ExactMatch(Operator::Equals),
        );
        let ram = |size: &str| Component::new(1, ComponentType::Ram, "ram").with_spec("module_size", size);
        let mb = |size: &str| {
            Component::new(2, ComponentType::Motherboard, "board").with_spec("module_size", size)
        };
        let eval = RuleEvaluator::default();

        assert!(eval.evaluate(&rule, &ram("16GB"), &mb("16MB")).failed());
        assert!(eval.evaluate(&rule, &ram("1TB"), &mb("1GB")).failed());
        assert!(eval.evaluate(&rule, &ram("16GB"), &mb("16 gb")).passed());
        assert!(eval.evaluate(&rule, &ram("16"), &mb("16.0GB")).passed());

        let at_least = CompatibilityRule::new(
            4,
            (ComponentType::Ram, "module_size"),
            (ComponentType::Motherboard, "module_size"),
            RuleKind::ExactMatch(Operator::GreaterThanEquals),
        );
        assert!(matches!(
            eval.evaluate(&at_least, &ram("1TB"), &mb("512GB")),
            RuleOutcome::Skipped(SkipReason::UnitMismatch { .. })
        ));
    }

    #[test]
    fn test_missing_property_fails_closed() {
        let eval = RuleEvaluator::default();
        let bare = Component::new(2, ComponentType::Motherboard, "board");
        let outcome = eval.evaluate(&socket_rule(), &cpu("AM4"), &bare);
        assert!(outcome.failed());
        assert!(outcome.detail().contains("MOTHERBOARD.socket"));
    }

    #[test]
    fn test_missing_property_skips_ordering_rules() {
        let rule = CompatibilityRule::new(
            2,
            (ComponentType::Gpu, "length"),
            (ComponentType::Case, "max_gpu_length"),
            RuleKind::LessThan { inclusive: true },
        );
        let gpu = Component::new(1, ComponentType::Gpu, "gpu");
        let case = Component::new(2, ComponentType::Case, "case").with_spec("max_gpu_length", "330");
        assert!(matches!(
            RuleEvaluator::default().evaluate(&rule, &gpu, &case),
            RuleOutcome::Skipped(SkipReason::MissingProperty { .. })
        ));
    }

    #[test]
    fn test_numeric_with_modifier_and_margin() {
        let rule = CompatibilityRule::new(
            3,
            (ComponentType::Gpu, "power_consumption"),
            (ComponentType::PowerSupply, "wattage"),
            RuleKind::LessThan { inclusive: true },
        )
        .with_modifier(ValueModifier::Scale(1.5));
        let gpu = Component::new(1, ComponentType::Gpu, "gpu").with_spec("power_consumption", "400W");
        let weak = Component::new(2, ComponentType::PowerSupply, "psu").with_spec("wattage", "550");
        let strong = Component::new(3, ComponentType::PowerSupply, "psu").with_spec("wattage", "750");

        let eval = RuleEvaluator::default();
        let failed = eval.evaluate(&rule, &gpu, &weak);
        assert!(failed.failed());
        assert!((failed.margin().unwrap() + 50.0).abs() < 1e-9);
        let passed = eval.evaluate(&rule, &strong, &gpu);
        assert!(passed.passed());
        assert!((passed.margin().unwrap() - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_unparseable_number_skips() {
        let rule = CompatibilityRule::new(
            4,
            (ComponentType::Gpu, "length"),
            (ComponentType::Case, "max_gpu_length"),
            RuleKind::RangeCheck(NumericOp::Lte),
        );
        let gpu = Component::new(1, ComponentType::Gpu, "gpu").with_spec("length", "long");
        let case = Component::new(2, ComponentType::Case, "case").with_spec("max_gpu_length", "330");
        let outcome = RuleEvaluator::default().evaluate(&rule, &gpu, &case);
        assert_eq!(
            outcome,
            RuleOutcome::Skipped(SkipReason::UnparseableNumber {
                property: "length".to_string(),
                value: "long".to_string(),
            })
        );
    }

    #[test]
    fn test_compatibility_list_either_direction() {
        let rule = CompatibilityRule::new(
            5,
            (ComponentType::Case, "form_factors"),
            (ComponentType::Motherboard, "form_factor"),
            RuleKind::CompatibilityList(ListOp::Includes),
        );
        let case = Component::new(1, ComponentType::Case, "case").with_spec("form_factors", "ATX, Micro-ATX");
        let atx = Component::new(2, ComponentType::Motherboard, "atx").with_spec("form_factor", "micro-atx");
        let itx = Component::new(3, ComponentType::Motherboard, "itx").with_spec("form_factor", "E-ATX");

        let eval = RuleEvaluator::default();
        assert!(eval.evaluate(&rule, &case, &atx).passed());
        assert!(eval.evaluate(&rule, &itx, &case).failed());
    }

    #[test]
    fn test_subset_check() {
        let rule = CompatibilityRule::new(
            6,
            (ComponentType::Storage, "interface"),
            (ComponentType::Motherboard, "storage_interfaces"),
            RuleKind::SubsetCheck,
        );
        let nvme = Component::new(1, ComponentType::Storage, "ssd").with_spec("interface", "M.2 | NVMe");
        let board = Component::new(2, ComponentType::Motherboard, "board")
            .with_spec("storage_interfaces", "SATA, M.2, NVMe");
        let old = Component::new(3, ComponentType::Motherboard, "old").with_spec("storage_interfaces", "SATA");

        let eval = RuleEvaluator::default();
        assert!(eval.evaluate(&rule, &nvme, &board).passed());
        let outcome = eval.evaluate(&rule, &nvme, &old);
        assert!(outcome.failed());
        assert!(outcome.detail().contains("m.2"));
    }

    #[test]
    fn test_same_type_rule_is_symmetric() {
        let rule = CompatibilityRule::new(
            7,
            (ComponentType::Ram, "speed"),
            (ComponentType::Ram, "speed"),
            RuleKind::ExactMatch(Operator::GreaterThanEquals),
        );
        let fast = Component::new(1, ComponentType::Ram, "fast").with_spec("speed", "3600");
        let slow = Component::new(2, ComponentType::Ram, "slow").with_spec("speed", "3200");

        let eval = RuleEvaluator::default();
        let ab = eval.evaluate(&rule, &fast, &slow);
        let ba = eval.evaluate(&rule, &slow, &fast);
        assert!(ab.failed());
        assert_eq!(ab.passed(), ba.passed());
    }

    #[test]
    fn test_ordering_operator_on_text_skips() {
        let rule = CompatibilityRule::new(
            8,
            (ComponentType::Ram, "type"),
            (ComponentType::Motherboard, "memory_type"),
            RuleKind::ExactMatch(Operator::GreaterThan),
        );
        let ram = Component::new(1, ComponentType::Ram, "ram").with_spec("type", "DDR5");
        let board = Component::new(2, ComponentType::Motherboard, "board").with_spec("memory_type", "DDR4");
        assert!(matches!(
            RuleEvaluator::default().evaluate(&rule, &ram, &board),
            RuleOutcome::Skipped(SkipReason::UnparseableNumber { .. })
        ));
    }
}
