//! Rule sets and the rule store seam.
//!
//! A [`RuleSet`] is immutable once built. Stores hand out `Arc` snapshots so
//! an analysis in flight keeps the set it started with while an administrator
//! swaps in a new one.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock};

use super::model::{CompatibilityRule, Operator, RuleDefect, RuleId, RuleKind};
use super::record::RuleRecord;
use crate::model::ComponentType;

/// A stored rule that could not be converted.
#[derive(Debug, Clone, PartialEq)]
pub struct DefectiveRule {
    pub id: RuleId,
    pub defect: RuleDefect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// Same properties and the same operator.
    Duplicate,
    /// Same properties and operators that cannot both hold.
    Contradictory,
}

/// Two active rules on the same type pair and property pair that overlap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleConflict {
    pub first: RuleId,
    pub second: RuleId,
    pub kind: ConflictKind,
    pub description: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RuleDocument {
    Wrapped { rules: Vec<serde_json::Value> },
    Bare(Vec<serde_json::Value>),
}

/// Frozen collection of rules plus the records that were rejected.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<CompatibilityRule>,
    defects: Vec<DefectiveRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<CompatibilityRule>) -> Self {
        let mut rules = rules;
        rules.sort_by_key(|r| r.id);
        Self {
            rules,
            defects: Vec::new(),
        }
    }

    /// Convert stored records. Defective records are logged and kept aside.
    pub fn from_records(records: &[RuleRecord]) -> Self {
        let mut rules = Vec::with_capacity(records.len());
        let mut defects = Vec::new();

        for record in records {
            match record.to_rule() {
                Ok(rule) => rules.push(rule),
                Err(defect) => {
                    tracing::warn!("Skipping rule {}: {}", record.id, defect);
                    defects.push(DefectiveRule {
                        id: RuleId(record.id),
                        defect,
                    });
                }
            }
        }

        let mut set = Self::new(rules);
        set.defects = defects;
        tracing::debug!(
            "Loaded {} rules ({} defective)",
            set.rules.len(),
            set.defects.len()
        );
        set
    }

    /// Parse either a bare array of records or `{"rules": [...]}`.
    ///
    /// Only a document that is not an array of objects is an error. A record
    /// whose fields do not deserialize is kept aside as malformed.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        let values = match serde_json::from_str::<RuleDocument>(json)? {
            RuleDocument::Wrapped { rules } | RuleDocument::Bare(rules) => rules,
        };

        let mut records = Vec::with_capacity(values.len());
        let mut malformed = Vec::new();
        for value in values {
            let id = value.get("id").and_then(serde_json::Value::as_u64).unwrap_or(0);
            match serde_json::from_value::<RuleRecord>(value) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!("Skipping malformed rule record {}: {}", id, e);
                    malformed.push(DefectiveRule {
                        id: RuleId(id),
                        defect: RuleDefect::MalformedRecord(e.to_string()),
                    });
                }
            }
        }

        let mut set = Self::from_records(&records);
        set.defects.extend(malformed);
        set.defects.sort_by_key(|d| d.id);
        Ok(set)
    }

    pub fn load(path: &Path) -> Result<Self, crate::core::RigGuardError> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_json_str(&content)?)
    }

    pub fn to_records(&self) -> Vec<RuleRecord> {
        self.rules.iter().map(RuleRecord::from).collect()
    }

    pub fn rules(&self) -> &[CompatibilityRule] {
        &self.rules
    }

    pub fn defects(&self) -> &[DefectiveRule] {
        &self.defects
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, id: RuleId) -> Option<&CompatibilityRule> {
        self.rules.iter().find(|r| r.id == id)
    }

    pub fn active(&self) -> impl Iterator<Item = &CompatibilityRule> {
        self.rules.iter().filter(|r| r.active)
    }

    /// Active rules covering the unordered pair `{a, b}`.
    pub fn applicable(&self, a: ComponentType, b: ComponentType) -> impl Iterator<Item = &CompatibilityRule> {
        self.active().filter(move |r| r.applies_to(a, b))
    }

    /// Active rules filtered by type. Filters match either side of a rule.
    pub fn list_active_rules(
        &self,
        source: Option<ComponentType>,
        target: Option<ComponentType>,
    ) -> Vec<&CompatibilityRule> {
        self.active()
            .filter(|r| match (source, target) {
                (Some(s), Some(t)) => r.applies_to(s, t),
                (Some(t), None) | (None, Some(t)) => r.mentions(t),
                (None, None) => true,
            })
            .collect()
    }

    /// Every rule, active or not, mentioning `t` on either side.
    pub fn rules_for_type(&self, t: ComponentType) -> Vec<&CompatibilityRule> {
        self.rules.iter().filter(|r| r.mentions(t)).collect()
    }

    /// Conflicts between active rules already in the set.
    pub fn conflicts(&self) -> Vec<RuleConflict> {
        let active: Vec<&CompatibilityRule> = self.active().collect();
        let mut conflicts = Vec::new();
        for (i, first) in active.iter().enumerate() {
            for second in &active[i + 1..] {
                if let Some(conflict) = conflict_between(first, second) {
                    conflicts.push(conflict);
                }
            }
        }
        conflicts
    }

    /// Conflicts a candidate rule would introduce. A rule with the same id
    /// is treated as the version being replaced.
    pub fn conflicts_with(&self, candidate: &CompatibilityRule) -> Vec<RuleConflict> {
        self.active()
            .filter(|existing| existing.id != candidate.id)
            .filter_map(|existing| conflict_between(existing, candidate))
            .collect()
    }
}

/// Operator as seen from the other side of the comparison.
fn mirrored(op: Operator) -> Operator {
    match op {
        Operator::GreaterThan => Operator::LessThan,
        Operator::LessThan => Operator::GreaterThan,
        Operator::GreaterThanEquals => Operator::LessThanEquals,
        Operator::LessThanEquals => Operator::GreaterThanEquals,
        other => other,
    }
}

fn conflict_between(first: &CompatibilityRule, second: &CompatibilityRule) -> Option<RuleConflict> {
    let same_orientation = first.source_type == second.source_type
        && first.target_type == second.target_type
        && first.source_property == second.source_property
        && first.target_property == second.target_property;
    let reversed = first.source_type == second.target_type
        && first.target_type == second.source_type
        && first.source_property == second.target_property
        && first.target_property == second.source_property;

    let second_op = if same_orientation {
        second.kind.operator()
    } else if reversed {
        mirrored(second.kind.operator())
    } else {
        return None;
    };
    let first_op = first.kind.operator();

    // List rules and scalar rules never overlap.
    let list_kinds = |k: &RuleKind| matches!(k, RuleKind::CompatibilityList(_) | RuleKind::SubsetCheck);
    if list_kinds(&first.kind) != list_kinds(&second.kind) {
        return None;
    }

    let kind = if first_op == second_op && first.modifier == second.modifier {
        ConflictKind::Duplicate
    } else if first_op.contradiction() == Some(second_op) && first.modifier == second.modifier {
        ConflictKind::Contradictory
    } else {
        return None;
    };

    Some(RuleConflict {
        first: first.id,
        second: second.id,
        kind,
        description: format!(
            "{} ({}) and {} ({}) on {}.{} / {}.{}",
            first.id,
            first_op.symbol(),
            second.id,
            second.kind.operator().symbol(),
            first.source_type,
            first.source_property,
            first.target_type,
            first.target_property
        ),
    })
}

/// Query seam to whatever holds the authoritative rules.
pub trait RuleStore: Send + Sync {
    /// Consistent view used for one analysis.
    fn snapshot(&self) -> Arc<RuleSet>;

    fn list_active_rules(
        &self,
        source: Option<ComponentType>,
        target: Option<ComponentType>,
    ) -> Vec<CompatibilityRule> {
        self.snapshot()
            .list_active_rules(source, target)
            .into_iter()
            .cloned()
            .collect()
    }
}

/// Copy-on-write store: writers build a new set and swap the pointer.
#[derive(Debug, Default)]
pub struct InMemoryRuleStore {
    current: RwLock<Arc<RuleSet>>,
}

impl InMemoryRuleStore {
    pub fn new(set: RuleSet) -> Self {
        Self {
            current: RwLock::new(Arc::new(set)),
        }
    }

    pub fn replace(&self, set: RuleSet) {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = Arc::new(set);
    }

    /// Insert or replace one rule from its stored record.
    pub fn upsert(&self, record: &RuleRecord) -> Result<Vec<RuleConflict>, RuleDefect> {
        let rule = record.to_rule()?;
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        let conflicts = guard.conflicts_with(&rule);

        let mut next = RuleSet::clone(&guard);
        next.rules.retain(|r| r.id != rule.id);
        next.defects.retain(|d| d.id != rule.id);
        next.rules.push(rule);
        next.rules.sort_by_key(|r| r.id);
        *guard = Arc::new(next);
        Ok(conflicts)
    }

    pub fn remove(&self, id: RuleId) -> bool {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        if guard.get(id).is_none() {
            return false;
        }
        let mut next = RuleSet::clone(&guard);
        next.rules.retain(|r| r.id != id);
        *guard = Arc::new(next);
        true
    }
}

impl RuleStore for InMemoryRuleStore {
    fn snapshot(&self) -> Arc<RuleSet> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::model::{NumericOp, RuleKind};

    fn rule(id: u64, source: ComponentType, target: ComponentType, kind: RuleKind) -> CompatibilityRule {
        CompatibilityRule::new(id, (source, "a"), (target, "b"), kind)
    }

    #[test]
    fn test_bare_and_wrapped_documents() {
        let record = r#"{"id": 1, "sourceType": "CPU", "targetType": "MOTHERBOARD",
            "ruleType": "EXACT_MATCH", "sourceProperty": "socket", "targetProperty": "socket",
            "comparisonOperator": "EQUALS"}"#;
        let bare = RuleSet::from_json_str(&format!("[{}]", record)).unwrap();
        let wrapped = RuleSet::from_json_str(&format!(r#"{{"rules": [{}]}}"#, record)).unwrap();
        assert_eq!(bare.len(), 1);
        assert_eq!(wrapped.len(), 1);
    }

    #[test]
    fn test_defective_records_are_kept_aside() {
        let json = r#"[
            {"id": 1, "sourceType": "CPU", "targetType": "MB", "ruleType": "EXACT_MATCH",
             "sourceProperty": "socket", "targetProperty": "socket", "comparisonOperator": "EQUALS"},
            {"id": 2, "sourceType": "CPU", "targetType": "MB", "ruleType": "BALANCED",
             "sourceProperty": "x", "targetProperty": "y", "comparisonOperator": "EQUALS"}
        ]"#;
        let set = RuleSet::from_json_str(json).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.defects().len(), 1);
        assert_eq!(set.defects()[0].id, RuleId(2));
    }

    #[test]
    fn test_malformed_record_does_not_reject_document() {
        let json = r#"[
            {"id": 1, "sourceType": "CPU", "targetType": "MOTHERBOARD", "ruleType": "EXACT_MATCH",
             "sourceProperty": "socket", "targetProperty": "socket", "comparisonOperator": "EQUALS"},
            {"id": 2, "sourceType": "GPU", "targetType": "PSU", "ruleType": "LESS_THAN",
             "sourceProperty": "power_consumption", "targetProperty": "wattage",
             "valueModifier": 1.2, "isActive": null},
            {"id": 3, "sourceType": "CPU", "targetType": ["MOTHERBOARD"], "ruleType": "EXACT_MATCH",
             "sourceProperty": "socket", "targetProperty": "socket"}
        ]"#;
        let set = RuleSet::from_json_str(json).unwrap();

        assert_eq!(set.len(), 2);
        assert!(set.get(RuleId(1)).is_some());
        assert!(set.get(RuleId(2)).is_some_and(|r| r.active));
        assert_eq!(set.defects().len(), 1);
        assert_eq!(set.defects()[0].id, RuleId(3));
        assert!(matches!(set.defects()[0].defect, RuleDefect::MalformedRecord(_)));
    }

    #[test]
    fn test_non_array_document_is_an_error() {
        assert!(RuleSet::from_json_str(r#"{"rule": 1}"#).is_err());
        assert!(RuleSet::from_json_str("not json").is_err());
    }

    #[test]
    fn test_queries_ignore_orientation() {
        let set = RuleSet::new(vec![
            rule(1, ComponentType::Cpu, ComponentType::Motherboard, RuleKind::ExactMatch(Operator::Equals)),
            rule(2, ComponentType::Gpu, ComponentType::Case, RuleKind::LessThan { inclusive: true }),
            rule(3, ComponentType::Cpu, ComponentType::Cooler, RuleKind::SubsetCheck).inactive(),
        ]);

        assert_eq!(set.applicable(ComponentType::Motherboard, ComponentType::Cpu).count(), 1);
        assert_eq!(
            set.list_active_rules(Some(ComponentType::Case), Some(ComponentType::Gpu)).len(),
            1
        );
        assert_eq!(set.list_active_rules(Some(ComponentType::Cpu), None).len(), 1);
        assert_eq!(set.rules_for_type(ComponentType::Cpu).len(), 2);
    }

    #[test]
    fn test_conflicts() {
        let set = RuleSet::new(vec![
            rule(1, ComponentType::Gpu, ComponentType::Case, RuleKind::RangeCheck(NumericOp::Gt)),
            rule(2, ComponentType::Gpu, ComponentType::Case, RuleKind::RangeCheck(NumericOp::Lte)),
            rule(3, ComponentType::Gpu, ComponentType::Case, RuleKind::GreaterThan { inclusive: false }),
            rule(4, ComponentType::Cpu, ComponentType::Motherboard, RuleKind::ExactMatch(Operator::Equals)),
        ]);
        let conflicts = set.conflicts();
        assert_eq!(conflicts.len(), 3);
        assert!(conflicts
            .iter()
            .any(|c| c.first == RuleId(1) && c.second == RuleId(3) && c.kind == ConflictKind::Duplicate));
        assert!(conflicts
            .iter()
            .any(|c| c.first == RuleId(1) && c.second == RuleId(2) && c.kind == ConflictKind::Contradictory));
    }

    #[test]
    fn test_reversed_rule_is_mirrored() {
        let forward = CompatibilityRule::new(
            1,
            (ComponentType::Gpu, "length"),
            (ComponentType::Case, "max_gpu_length"),
            RuleKind::LessThan { inclusive: true },
        );
        let reversed = CompatibilityRule::new(
            2,
            (ComponentType::Case, "max_gpu_length"),
            (ComponentType::Gpu, "length"),
            RuleKind::GreaterThan { inclusive: true },
        );
        let set = RuleSet::new(vec![forward]);
        let conflicts = set.conflicts_with(&reversed);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, ConflictKind::Duplicate);
    }

    #[test]
    fn test_store_snapshot_isolation() {
        let store = InMemoryRuleStore::new(RuleSet::new(vec![rule(
            1,
            ComponentType::Cpu,
            ComponentType::Motherboard,
            RuleKind::ExactMatch(Operator::Equals),
        )]));
        let before = store.snapshot();

        let record = RuleRecord::from(&rule(
            2,
            ComponentType::Ram,
            ComponentType::Motherboard,
            RuleKind::ExactMatch(Operator::Equals),
        ));
        assert!(store.upsert(&record).unwrap().is_empty());

        assert_eq!(before.len(), 1);
        assert_eq!(store.snapshot().len(), 2);
        assert_eq!(store.list_active_rules(Some(ComponentType::Ram), None).len(), 1);
        assert!(store.remove(RuleId(1)));
        assert!(!store.remove(RuleId(1)));
        assert_eq!(store.snapshot().len(), 1);
    }
}
