use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// What kind of work an activity event represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    /// A code analysis run.
    Analysis,
    /// An issue surfaced by an analysis.
    IssueDetected,
    /// A previously detected issue marked resolved.
    IssueResolved,
    /// A completed code review.
    Review,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Analysis => "analysis",
            ActivityKind::IssueDetected => "issue_detected",
            ActivityKind::IssueResolved => "issue_resolved",
            ActivityKind::Review => "review",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "analysis" => Ok(ActivityKind::Analysis),
            "issue_detected" => Ok(ActivityKind::IssueDetected),
            "issue_resolved" => Ok(ActivityKind::IssueResolved),
            "review" => Ok(ActivityKind::Review),
            other => Err(Error::InvalidArgument(format!(
                "unknown activity kind: {other}"
            ))),
        }
    }
}

/// A single recorded activity event. Immutable once recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub kind: ActivityKind,
    /// Language of the analyzed code, for `analysis` events.
    pub language: Option<String>,
    /// Issue category, for `issue_detected` / `issue_resolved` events.
    pub issue_type: Option<String>,
    /// Wall-clock duration of the analysis or review, in seconds.
    pub duration_seconds: Option<f64>,
    /// Quality score in [0, 1] produced by an analysis.
    pub quality_score: Option<f64>,
    pub occurred_at: DateTime<Utc>,
}

impl Activity {
    pub fn new(kind: ActivityKind) -> Self {
        Self {
            kind,
            language: None,
            issue_type: None,
            duration_seconds: None,
            quality_score: None,
            occurred_at: Utc::now(),
        }
    }

    /// An analysis run over `language` code.
    pub fn analysis(language: &str, duration_seconds: f64, quality_score: f64) -> Self {
        Self {
            language: Some(language.to_string()),
            duration_seconds: Some(duration_seconds),
            quality_score: Some(quality_score),
            ..Self::new(ActivityKind::Analysis)
        }
    }

    pub fn issue_detected(issue_type: &str) -> Self {
        Self {
            issue_type: Some(issue_type.to_string()),
            ..Self::new(ActivityKind::IssueDetected)
        }
    }

    pub fn issue_resolved(issue_type: &str) -> Self {
        Self {
            issue_type: Some(issue_type.to_string()),
            ..Self::new(ActivityKind::IssueResolved)
        }
    }

    pub fn review(duration_seconds: f64) -> Self {
        Self {
            duration_seconds: Some(duration_seconds),
            ..Self::new(ActivityKind::Review)
        }
    }

    pub fn at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = occurred_at;
        self
    }

    /// Check that the event is well-formed for the given user.
    pub fn validate(&self, user_id: &str) -> Result<()> {
        if user_id.trim().is_empty() {
            return Err(Error::Validation("user id must not be empty".into()));
        }
        if let Some(d) = self.duration_seconds {
            if d < 0.0 || !d.is_finite() {
                return Err(Error::Validation(format!(
                    "duration must be a non-negative number of seconds, got {d}"
                )));
            }
        }
        if let Some(q) = self.quality_score {
            if !(0.0..=1.0).contains(&q) {
                return Err(Error::Validation(format!(
                    "quality score must be within [0, 1], got {q}"
                )));
            }
        }
        Ok(())
    }
}
