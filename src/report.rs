use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::metrics::MetricsSnapshot;
use crate::timeframe::Timeframe;

/// Derived per-team productivity figures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamProductivity {
    pub analyses_per_user: f64,
    pub average_quality_score: f64,
    pub issue_resolution_rate: f64,
    pub code_review_efficiency: f64,
}

/// A usage report: one snapshot plus derived productivity metrics and a
/// generation timestamp. Built fresh on each request and never cached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Canonical timeframe key, e.g. `2025-Q1` or `30d`.
    pub timeframe: String,
    pub total_analyses: u64,
    pub unique_users: u64,
    pub average_analysis_time: f64,
    pub top_issue_types: Vec<String>,
    pub language_distribution: BTreeMap<String, u64>,
    pub quality_trend: Vec<f64>,
    pub team_productivity: TeamProductivity,
    pub generated_at: DateTime<Utc>,
}

impl Report {
    /// Assemble a report from a snapshot. Pure function of its inputs;
    /// the snapshot is consumed, never mutated.
    pub fn from_snapshot(
        timeframe: &Timeframe,
        snapshot: MetricsSnapshot,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let team_productivity = TeamProductivity {
            // Guard against empty windows: a report over zero users
            // attributes all analyses to one nominal user.
            analyses_per_user: snapshot.total_analyses as f64
                / snapshot.unique_users.max(1) as f64,
            average_quality_score: snapshot.average_quality_score,
            issue_resolution_rate: snapshot.issue_resolution_rate,
            code_review_efficiency: snapshot.code_review_efficiency,
        };
        Self {
            timeframe: timeframe.to_key(),
            total_analyses: snapshot.total_analyses,
            unique_users: snapshot.unique_users,
            average_analysis_time: snapshot.average_analysis_time,
            top_issue_types: snapshot.top_issue_types,
            language_distribution: snapshot.language_distribution,
            quality_trend: snapshot.quality_trend,
            team_productivity,
            generated_at,
        }
    }
}
