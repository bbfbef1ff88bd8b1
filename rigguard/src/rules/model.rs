//! Typed compatibility rules.
//!
//! A persisted rule pairs a free `ruleType` token with a free
//! `comparisonOperator` token. Here each rule type is its own variant that
//! carries only the operators it can evaluate, so an unsupported combination
//! is rejected once when the rule is loaded.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::{Component, ComponentType};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct RuleId(pub u64);

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.0)
    }
}

/// Why a stored rule cannot be used.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuleDefect {
    #[error("unknown component type {token:?} in {field}")]
    UnknownComponentType { field: &'static str, token: String },
    #[error("unknown rule type {0:?}")]
    UnknownRuleType(String),
    #[error("unknown comparison operator {0:?}")]
    UnknownOperator(String),
    #[error("{rule_type} rules do not support operator {operator}")]
    UnsupportedOperator { rule_type: RuleType, operator: Operator },
    #[error("unparseable value modifier {0:?}")]
    InvalidModifier(String),
    #[error("missing {0}")]
    MissingProperty(&'static str),
    #[error("malformed record: {0}")]
    MalformedRecord(String),
}

/// Stored `ruleType` token.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleType {
    ExactMatch,
    RangeCheck,
    CompatibilityList,
    GreaterThan,
    LessThan,
    SubsetCheck,
}

impl RuleType {
    pub fn token(&self) -> &'static str {
        match self {
            RuleType::ExactMatch => "EXACT_MATCH",
            RuleType::RangeCheck => "RANGE_CHECK",
            RuleType::CompatibilityList => "COMPATIBILITY_LIST",
            RuleType::GreaterThan => "GREATER_THAN",
            RuleType::LessThan => "LESS_THAN",
            RuleType::SubsetCheck => "SUBSET_CHECK",
        }
    }

    /// Operator used when a record leaves `comparisonOperator` blank.
    pub fn default_operator(&self) -> Operator {
        match self {
            RuleType::ExactMatch | RuleType::RangeCheck => Operator::Equals,
            RuleType::CompatibilityList | RuleType::SubsetCheck => Operator::Contains,
            RuleType::GreaterThan => Operator::GreaterThan,
            RuleType::LessThan => Operator::LessThan,
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for RuleType {
    type Err = RuleDefect;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace(['-', ' '], "_").as_str() {
            "EXACT_MATCH" => Ok(RuleType::ExactMatch),
            "RANGE_CHECK" => Ok(RuleType::RangeCheck),
            "COMPATIBILITY_LIST" => Ok(RuleType::CompatibilityList),
            "GREATER_THAN" => Ok(RuleType::GreaterThan),
            "LESS_THAN" => Ok(RuleType::LessThan),
            "SUBSET_CHECK" => Ok(RuleType::SubsetCheck),
            _ => Err(RuleDefect::UnknownRuleType(s.to_string())),
        }
    }
}

/// Stored `comparisonOperator` token.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operator {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    GreaterThanEquals,
    LessThanEquals,
    Contains,
}

impl Operator {
    pub fn token(&self) -> &'static str {
        match self {
            Operator::Equals => "EQUALS",
            Operator::NotEquals => "NOT_EQUALS",
            Operator::GreaterThan => "GREATER_THAN",
            Operator::LessThan => "LESS_THAN",
            Operator::GreaterThanEquals => "GREATER_THAN_EQUALS",
            Operator::LessThanEquals => "LESS_THAN_EQUALS",
            Operator::Contains => "CONTAINS",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Equals => "=",
            Operator::NotEquals => "!=",
            Operator::GreaterThan => ">",
            Operator::LessThan => "<",
            Operator::GreaterThanEquals => ">=",
            Operator::LessThanEquals => "<=",
            Operator::Contains => "CONTAINS",
        }
    }

    /// Operator that can never hold together with `self` on the same values.
    pub fn contradiction(&self) -> Option<Operator> {
        match self {
            Operator::Equals => Some(Operator::NotEquals),
            Operator::NotEquals => Some(Operator::Equals),
            Operator::GreaterThan => Some(Operator::LessThanEquals),
            Operator::LessThanEquals => Some(Operator::GreaterThan),
            Operator::LessThan => Some(Operator::GreaterThanEquals),
            Operator::GreaterThanEquals => Some(Operator::LessThan),
            Operator::Contains => None,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Operator {
    type Err = RuleDefect;

    /// Accepts names (`GREATER_THAN_EQUALS`) and symbols (`>=`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let op = match s.trim().to_uppercase().as_str() {
            "EQUALS" | "=" | "==" => Operator::Equals,
            "NOT_EQUALS" | "!=" | "<>" => Operator::NotEquals,
            "GREATER_THAN" | ">" => Operator::GreaterThan,
            "LESS_THAN" | "<" => Operator::LessThan,
            "GREATER_THAN_EQUALS" | "GREATER_THAN_OR_EQUALS" | ">=" => Operator::GreaterThanEquals,
            "LESS_THAN_EQUALS" | "LESS_THAN_OR_EQUALS" | "<=" => Operator::LessThanEquals,
            "CONTAINS" => Operator::Contains,
            _ => return Err(RuleDefect::UnknownOperator(s.to_string())),
        };
        Ok(op)
    }
}

/// Numeric comparison, `source OP target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
}

impl NumericOp {
    pub fn holds(self, source: f64, target: f64) -> bool {
        match self {
            NumericOp::Eq => (source - target).abs() < f64::EPSILON * source.abs().max(1.0),
            NumericOp::Ne => !NumericOp::Eq.holds(source, target),
            NumericOp::Gt => source > target,
            NumericOp::Lt => source < target,
            NumericOp::Gte => source >= target,
            NumericOp::Lte => source <= target,
        }
    }

    fn from_operator(op: Operator) -> Option<Self> {
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

    pub fn operator(self) -> Operator {
        match self {
            NumericOp::Eq => Operator::Equals,
            NumericOp::Ne => Operator::NotEquals,
            NumericOp::Gt => Operator::GreaterThan,
            NumericOp::Lt => Operator::LessThan,
            NumericOp::Gte => Operator::GreaterThanEquals,
            NumericOp::Lte => Operator::LessThanEquals,
        }
    }
}

/// Membership test for list rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListOp {
    /// The two lists share a token.
    Includes,
    /// The two lists share no token.
    Excludes,
}

/// A rule type together with the operator it was stored with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RuleKind {
    /// Raw comparison; numeric when both sides parse, text otherwise.
    ExactMatch(Operator),
    /// Numeric comparison of the (modified) source against the target.
    RangeCheck(NumericOp),
    /// Source must exceed the target, optionally allowing equality.
    GreaterThan { inclusive: bool },
    /// Source must stay below the target, optionally allowing equality.
    LessThan { inclusive: bool },
    CompatibilityList(ListOp),
    /// Every source token must appear in the target list.
    SubsetCheck,
}

impl RuleKind {
    pub fn from_parts(rule_type: RuleType, operator: Operator) -> Result<Self, RuleDefect> {
        let unsupported = || RuleDefect::UnsupportedOperator { rule_type, operator };
        let kind = match rule_type {
            RuleType::ExactMatch => RuleKind::ExactMatch(operator),
            RuleType::RangeCheck => {
                RuleKind::RangeCheck(NumericOp::from_operator(operator).ok_or_else(unsupported)?)
            }
            RuleType::GreaterThan => match operator {
                Operator::GreaterThan => RuleKind::GreaterThan { inclusive: false },
                Operator::GreaterThanEquals => RuleKind::GreaterThan { inclusive: true },
                _ => return Err(unsupported()),
            },
            RuleType::LessThan => match operator {
                Operator::LessThan => RuleKind::LessThan { inclusive: false },
                Operator::LessThanEquals => RuleKind::LessThan { inclusive: true },
                _ => return Err(unsupported()),
            },
            RuleType::CompatibilityList => match operator {
                Operator::Contains | Operator::Equals => RuleKind::CompatibilityList(ListOp::Includes),
                Operator::NotEquals => RuleKind::CompatibilityList(ListOp::Excludes),
                _ => return Err(unsupported()),
            },
            RuleType::SubsetCheck => match operator {
                Operator::Contains | Operator::Equals => RuleKind::SubsetCheck,
                _ => return Err(unsupported()),
            },
        };
        Ok(kind)
    }

    pub fn rule_type(&self) -> RuleType {
        match self {
            RuleKind::ExactMatch(_) => RuleType::ExactMatch,
            RuleKind::RangeCheck(_) => RuleType::RangeCheck,
            RuleKind::GreaterThan { .. } => RuleType::GreaterThan,
            RuleKind::LessThan { .. } => RuleType::LessThan,
            RuleKind::CompatibilityList(_) => RuleType::CompatibilityList,
            RuleKind::SubsetCheck => RuleType::SubsetCheck,
        }
    }

    pub fn operator(&self) -> Operator {
        match self {
            RuleKind::ExactMatch(op) => *op,
            RuleKind::RangeCheck(op) => op.operator(),
            RuleKind::GreaterThan { inclusive: false } => Operator::GreaterThan,
            RuleKind::GreaterThan { inclusive: true } => Operator::GreaterThanEquals,
            RuleKind::LessThan { inclusive: false } => Operator::LessThan,
            RuleKind::LessThan { inclusive: true } => Operator::LessThanEquals,
            RuleKind::CompatibilityList(ListOp::Includes) | RuleKind::SubsetCheck => Operator::Contains,
            RuleKind::CompatibilityList(ListOp::Excludes) => Operator::NotEquals,
        }
    }

    /// A missing property fails these kinds instead of skipping them.
    pub fn fails_closed(&self) -> bool {
        !matches!(self, RuleKind::GreaterThan { .. } | RuleKind::LessThan { .. })
    }
}

/// Numeric adjustment applied to the source value before comparing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueModifier {
    Scale(f64),
    Offset(f64),
}

impl ValueModifier {
    /// `"1.2"`, `"*1.2"` and `"x1.2"` scale; `"+50"` and `"-50"` offset.
    /// Blank input means no modifier.
    pub fn parse(raw: &str) -> Result<Option<Self>, RuleDefect> {
        let s = raw.trim();
        if s.is_empty() {
            return Ok(None);
        }
        let invalid = || RuleDefect::InvalidModifier(raw.to_string());
        let number = |t: &str| {
            t.trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .ok_or_else(invalid)
        };

        let modifier = if let Some(rest) = s.strip_prefix(['*', 'x', 'X']) {
            ValueModifier::Scale(number(rest)?)
        } else if s.starts_with('+') || s.starts_with('-') {
            ValueModifier::Offset(number(s)?)
        } else {
            ValueModifier::Scale(number(s)?)
        };
        Ok(Some(modifier))
    }

    pub fn apply(&self, value: f64) -> f64 {
        match self {
            ValueModifier::Scale(factor) => value * factor,
            ValueModifier::Offset(delta) => value + delta,
        }
    }
}

impl fmt::Display for ValueModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueModifier::Scale(factor) => write!(f, "{}", factor),
            ValueModifier::Offset(delta) if *delta >= 0.0 => write!(f, "+{}", delta),
            ValueModifier::Offset(delta) => write!(f, "{}", delta),
        }
    }
}

/// One usable compatibility constraint between two component types.
#[derive(Debug, Clone, PartialEq)]
pub struct CompatibilityRule {
    pub id: RuleId,
    pub source_type: ComponentType,
    pub target_type: ComponentType,
    pub source_property: String,
    pub target_property: String,
    pub kind: RuleKind,
    pub modifier: Option<ValueModifier>,
    pub description: String,
    pub active: bool,
}

impl CompatibilityRule {
    pub fn new(
        id: u64,
        source: (ComponentType, &str),
        target: (ComponentType, &str),
        kind: RuleKind,
    ) -> Self {
        Self {
            id: RuleId(id),
            source_type: source.0,
            target_type: target.0,
            source_property: source.1.to_string(),
            target_property: target.1.to_string(),
            kind,
            modifier: None,
            description: String::new(),
            active: true,
        }
    }

    pub fn with_modifier(mut self, modifier: ValueModifier) -> Self {
        self.modifier = Some(modifier);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Whether the rule covers the unordered pair `{a, b}`.
    pub fn applies_to(&self, a: ComponentType, b: ComponentType) -> bool {
        (self.source_type == a && self.target_type == b)
            || (self.source_type == b && self.target_type == a)
    }

    pub fn mentions(&self, t: ComponentType) -> bool {
        self.source_type == t || self.target_type == t
    }

    pub fn is_same_type(&self) -> bool {
        self.source_type == self.target_type
    }

    /// Order `(a, b)` as `(source, target)` by type.
    pub fn orient<'c>(&self, a: &'c Component, b: &'c Component) -> Option<(&'c Component, &'c Component)> {
        if a.component_type == self.source_type && b.component_type == self.target_type {
            Some((a, b))
        } else if b.component_type == self.source_type && a.component_type == self.target_type {
            Some((b, a))
        } else {
            None
        }
    }

    /// Description, or a generated one when the stored text is blank.
    pub fn summary(&self) -> String {
        if !self.description.trim().is_empty() {
            return self.description.clone();
        }
        format!(
            "{}.{} {} {}.{}",
            self.source_type,
            self.source_property,
            self.kind.operator().symbol(),
            self.target_type,
            self.target_property
        )
    }
}
