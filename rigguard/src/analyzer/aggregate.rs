//! Issue aggregation and scoring.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::ScoringPolicy;
use crate::model::{CompatibilityIssue, IssueCategory, IssueType};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Critical,
    Warning,
    Good,
    Excellent,
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OverallStatus::Critical => "critical",
            OverallStatus::Warning => "warning",
            OverallStatus::Good => "good",
            OverallStatus::Excellent => "excellent",
        };
        f.write_str(s)
    }
}

/// Issue counts by type.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
pub struct IssueSummary {
    pub critical: usize,
    pub warnings: usize,
    pub recommendations: usize,
}

impl IssueSummary {
    pub fn total(&self) -> usize {
        self.critical + self.warnings + self.recommendations
    }
}

/// Verdict over a whole build. Built once by [`IssueAggregator`] and never
/// modified afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompatibilityAnalysisResult {
    pub critical_errors: Vec<CompatibilityIssue>,
    pub warnings: Vec<CompatibilityIssue>,
    pub recommendations: Vec<CompatibilityIssue>,
    pub compatible: bool,
    pub overall_status: OverallStatus,
    pub status_message: String,
    pub compatibility_score: f64,
    pub recommendation: String,
}

impl CompatibilityAnalysisResult {
    pub fn has_critical_errors(&self) -> bool {
        !self.critical_errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn has_recommendations(&self) -> bool {
        !self.recommendations.is_empty()
    }

    pub fn summary(&self) -> IssueSummary {
        IssueSummary {
            critical: self.critical_errors.len(),
            warnings: self.warnings.len(),
            recommendations: self.recommendations.len(),
        }
    }

    pub fn total_issues(&self) -> usize {
        self.summary().total()
    }

    /// Every issue, critical errors first.
    pub fn issues(&self) -> impl Iterator<Item = &CompatibilityIssue> {
        self.critical_errors
            .iter()
            .chain(&self.warnings)
            .chain(&self.recommendations)
    }

    pub fn issues_in(&self, category: IssueCategory) -> impl Iterator<Item = &CompatibilityIssue> {
        self.issues().filter(move |i| i.category == category)
    }
}

#[derive(Debug, Clone, Default)]
pub struct IssueAggregator {
    scoring: ScoringPolicy,
}

impl IssueAggregator {
    pub fn new(scoring: ScoringPolicy) -> Self {
        Self { scoring }
    }

    pub fn aggregate(&self, issues: Vec<CompatibilityIssue>) -> CompatibilityAnalysisResult {
        let mut critical_errors = Vec::new();
        let mut warnings = Vec::new();
        let mut recommendations = Vec::new();
        for issue in issues {
            match issue.issue_type {
                IssueType::CriticalError => critical_errors.push(issue),
                IssueType::Warning => warnings.push(issue),
                IssueType::Recommendation => recommendations.push(issue),
            }
        }
        for partition in [&mut critical_errors, &mut warnings, &mut recommendations] {
            partition.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        }

        let summary = IssueSummary {
            critical: critical_errors.len(),
            warnings: warnings.len(),
            recommendations: recommendations.len(),
        };
        let overall_status = status_for(&summary);

        CompatibilityAnalysisResult {
            compatible: summary.critical == 0,
            overall_status,
            status_message: status_message(overall_status, &summary),
            compatibility_score: self.score(&summary),
            recommendation: recommendation_text(overall_status).to_string(),
            critical_errors,
            warnings,
            recommendations,
        }
    }

    /// Score in `[0, 100]`.
    pub fn score(&self, summary: &IssueSummary) -> f64 {
        if summary.critical > 0 {
            return 0.0;
        }
        let penalty = self.scoring.warning_penalty * summary.warnings as f64
            + self.scoring.recommendation_penalty * summary.recommendations as f64;
        (100.0 - penalty).max(self.scoring.floor).clamp(0.0, 100.0)
    }
}

fn status_for(summary: &IssueSummary) -> OverallStatus {
    if summary.critical > 0 {
        OverallStatus::Critical
    } else if summary.warnings > 0 {
        OverallStatus::Warning
    } else if summary.recommendations > 0 {
        OverallStatus::Good
    } else {
        OverallStatus::Excellent
    }
}

fn status_message(status: OverallStatus, summary: &IssueSummary) -> String {
    match status {
        OverallStatus::Critical => format!(
            "Configuration is incompatible: {} critical error(s) found.",
            summary.critical
        ),
        OverallStatus::Warning => format!(
            "Configuration works, but {} warning(s) need attention.",
            summary.warnings
        ),
        OverallStatus::Good => format!(
            "Configuration is compatible with {} optimization suggestion(s).",
            summary.recommendations
        ),
        OverallStatus::Excellent => "Configuration is fully compatible.".to_string(),
    }
}

fn recommendation_text(status: OverallStatus) -> &'static str {
    match status {
        OverallStatus::Critical => "Resolve the critical compatibility errors before using this configuration.",
        OverallStatus::Warning => "The build will run; review the warnings for reliable operation.",
        OverallStatus::Good => "Great build. Consider the recommendations for further improvement.",
        OverallStatus::Excellent => "Ideal build. All components are fully compatible.",
    }
}
