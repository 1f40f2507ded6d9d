use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Aggregate usage metrics for one timeframe at query time.
///
/// All counters are non-negative; every ratio field lies in [0, 1].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Number of analysis runs in the window.
    pub total_analyses: u64,
    /// Distinct users active in the window, across all activity kinds.
    pub unique_users: u64,
    /// Mean analysis duration in seconds; 0.0 when no analyses ran.
    pub average_analysis_time: f64,
    /// Most frequently detected issue categories, descending frequency,
    /// ties broken by first-seen order. At most `TOP_ISSUE_LIMIT` entries.
    pub top_issue_types: Vec<String>,
    /// Analysis counts keyed by language.
    pub language_distribution: BTreeMap<String, u64>,
    /// Chronological bucket averages of quality scores; empty buckets omitted.
    pub quality_trend: Vec<f64>,
    /// Mean quality score over the window; 0.0 when no scores exist.
    pub average_quality_score: f64,
    /// Resolved issues per detected issue, capped at 1.
    pub issue_resolution_rate: f64,
    /// Completed reviews per analysis, capped at 1.
    pub code_review_efficiency: f64,
}

/// Bound on `top_issue_types`.
pub const TOP_ISSUE_LIMIT: u32 = 5;
