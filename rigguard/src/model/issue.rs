//! Typed compatibility issues.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::component::ComponentId;

/// Namespace for content-derived issue ids.
const ISSUE_NAMESPACE: Uuid = Uuid::from_u128(0x5f1c_2a8e_93d4_4b6f_a1e0_7c3b_9d2e_4f10);

/// Severity of an issue.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueType {
    CriticalError,
    Warning,
    Recommendation,
}

impl IssueType {
    /// 1 = highest.
    pub const fn default_priority(self) -> u8 {
        match self {
            IssueType::CriticalError => 1,
            IssueType::Warning => 2,
            IssueType::Recommendation => 3,
        }
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IssueType::CriticalError => "CRITICAL_ERROR",
            IssueType::Warning => "WARNING",
            IssueType::Recommendation => "RECOMMENDATION",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCategory {
    Compatibility,
    Performance,
    Power,
    Thermal,
    Physical,
    Balance,
    MissingComponent,
}

impl fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IssueCategory::Compatibility => "COMPATIBILITY",
            IssueCategory::Performance => "PERFORMANCE",
            IssueCategory::Power => "POWER",
            IssueCategory::Thermal => "THERMAL",
            IssueCategory::Physical => "PHYSICAL",
            IssueCategory::Balance => "BALANCE",
            IssueCategory::MissingComponent => "MISSING_COMPONENT",
        };
        f.write_str(s)
    }
}

/// Ordering key of an issue, see [`CompatibilityIssue::sort_key`].
pub type SortKey<'a> = (
    u8,
    IssueCategory,
    &'a str,
    Option<ComponentId>,
    Option<ComponentId>,
    &'a str,
    Option<&'a str>,
    Option<&'a str>,
);

/// One detected problem or suggestion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompatibilityIssue {
    /// Derived from the issue content; stable across repeated analyses.
    pub id: Uuid,
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub category: IssueCategory,
    pub title: String,
    pub description: String,
    pub component1: Option<ComponentId>,
    pub component2: Option<ComponentId>,
    pub recommendation: Option<String>,
    pub technical_details: Option<String>,
    pub priority: u8,
}

impl CompatibilityIssue {
    pub fn new(
        issue_type: IssueType,
        category: IssueCategory,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let mut issue = Self {
            id: Uuid::nil(),
            issue_type,
            category,
            title: title.into(),
            description: description.into(),
            component1: None,
            component2: None,
            recommendation: None,
            technical_details: None,
            priority: issue_type.default_priority(),
        };
        issue.refresh_id();
        issue
    }

    pub fn critical(category: IssueCategory, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(IssueType::CriticalError, category, title, description)
    }

    pub fn warning(category: IssueCategory, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(IssueType::Warning, category, title, description)
    }

    pub fn recommendation(category: IssueCategory, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(IssueType::Recommendation, category, title, description)
    }

    pub fn with_component(mut self, id: ComponentId) -> Self {
        self.component1 = Some(id);
        self.refresh_id();
        self
    }

    pub fn with_components(mut self, first: ComponentId, second: ComponentId) -> Self {
        self.component1 = Some(first);
        self.component2 = Some(second);
        self.refresh_id();
        self
    }

    pub fn with_suggestion(mut self, text: impl Into<String>) -> Self {
        self.recommendation = Some(text.into());
        self.refresh_id();
        self
    }

    pub fn with_details(mut self, text: impl Into<String>) -> Self {
        self.technical_details = Some(text.into());
        self.refresh_id();
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self.refresh_id();
        self
    }

    pub fn involves(&self, id: ComponentId) -> bool {
        self.component1 == Some(id) || self.component2 == Some(id)
    }

    /// Total ordering used by the aggregator. Priority first, then content.
    pub fn sort_key(&self) -> SortKey<'_> {
        (
            self.priority,
            self.category,
            self.title.as_str(),
            self.component1,
            self.component2,
            self.description.as_str(),
            self.recommendation.as_deref(),
            self.technical_details.as_deref(),
        )
    }

    pub(crate) fn refresh_id(&mut self) {
        let fingerprint = format!(
            "{}|{}|{}|{}|{:?}|{:?}|{:?}|{:?}|{}",
            self.issue_type,
            self.category,
            self.title,
            self.description,
            self.component1,
            self.component2,
            self.recommendation,
            self.technical_details,
            self.priority,
        );
        self.id = Uuid::new_v5(&ISSUE_NAMESPACE, fingerprint.as_bytes());
    }
}

impl fmt::Display for CompatibilityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.category, self.title, self.description)
    }
}
