pub mod activity;
pub mod date_util;
pub mod error;
pub mod export;
pub mod metrics;
pub mod report;
pub mod storage;
pub mod timeframe;

pub use activity::{Activity, ActivityKind};
pub use error::{Error, Result};
pub use export::ExportFormat;
pub use metrics::MetricsSnapshot;
pub use report::{Report, TeamProductivity};
pub use storage::Database;
pub use timeframe::Timeframe;

// Row type returned by activity listings, re-exported for convenience
pub use storage::repository::ActivityRow;

use storage::repository;

/// Main entry point for the usage analytics warehouse.
///
/// Constructed explicitly and passed by reference to callers; there is
/// no process-wide instance.
pub struct AnalyticsService {
    db: Database,
}

impl AnalyticsService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Access the database (for direct queries in the CLI).
    pub fn db(&self) -> &Database {
        &self.db
    }

    // ── Activity ingestion ─────────────────────────────────────────

    /// Record one activity event for a user.
    ///
    /// Appends to the activity log; events are immutable once stored.
    /// Malformed input (blank user id, out-of-range score, negative
    /// duration) is rejected with [`Error::Validation`]; well-formed
    /// input never fails.
    pub async fn record_activity(&self, user_id: &str, activity: Activity) -> Result<()> {
        activity.validate(user_id)?;
        let kind = activity.kind;
        let user_id = user_id.to_string();
        self.db
            .writer()
            .call(move |conn| repository::insert_activity(conn, &user_id, &activity))
            .await?;
        log::debug!("recorded {} activity", kind.as_str());
        Ok(())
    }

    // ── Reporting ──────────────────────────────────────────────────

    /// Build a fresh report for the timeframe.
    ///
    /// Queries the aggregate snapshot, derives team productivity, and
    /// stamps the current time. Nothing is cached across calls.
    pub async fn generate_report(&self, timeframe: &Timeframe) -> Result<Report> {
        let snapshot = metrics::compute_snapshot(&self.db, timeframe).await?;
        Ok(Report::from_snapshot(timeframe, snapshot, chrono::Utc::now()))
    }

    /// Build a report and serialize it.
    ///
    /// Returns `Ok(None)` when the encoder fails; encoding problems are
    /// recoverable and reported as an absent payload rather than an error.
    pub async fn export_report(
        &self,
        timeframe: &Timeframe,
        format: ExportFormat,
    ) -> Result<Option<Vec<u8>>> {
        let report = self.generate_report(timeframe).await?;
        Ok(export::export(&report, format))
    }

    /// List the most recently recorded activities, newest first.
    pub async fn recent_activities(&self, limit: u32) -> Result<Vec<ActivityRow>> {
        self.db
            .reader()
            .call(move |conn| repository::recent_activities(conn, limit))
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    // ── Config commands ────────────────────────────────────────────

    pub async fn config_get(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        self.db
            .reader()
            .call(move |conn| repository::get_config(conn, &key))
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    pub async fn config_set(&self, key: &str, value: &str) -> Result<()> {
        let key = key.to_string();
        let value = value.to_string();
        self.db
            .writer()
            .call(move |conn| repository::set_config(conn, &key, &value))
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    pub async fn config_list(&self) -> Result<Vec<(String, String)>> {
        self.db
            .reader()
            .call(|conn| repository::list_config(conn))
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    async fn service() -> AnalyticsService {
        AnalyticsService::new(Database::open_memory().await.unwrap())
    }

    #[tokio::test]
    async fn test_record_then_query_is_observable() {
        let svc = service().await;
        let tf = Timeframe::parse("2025-01").unwrap();

        let before = svc.generate_report(&tf).await.unwrap();
        assert_eq!(before.total_analyses, 0);

        svc.record_activity(
            "alice",
            Activity::analysis("Rust", 3.2, 0.85)
                .at(chrono::Utc.with_ymd_and_hms(2025, 1, 15, 10, 0, 0).unwrap()),
        )
        .await
        .unwrap();

        let after = svc.generate_report(&tf).await.unwrap();
        assert_eq!(after.total_analyses, 1);
        assert_eq!(after.unique_users, 1);
        assert_eq!(after.team_productivity.analyses_per_user, 1.0);
    }

    #[tokio::test]
    async fn test_record_rejects_blank_user() {
        let svc = service().await;
        let err = svc
            .record_activity("  ", Activity::review(60.0))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        // Nothing was stored
        let rows = svc.recent_activities(10).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_export_report_json() {
        let svc = service().await;
        svc.record_activity(
            "alice",
            Activity::analysis("Rust", 2.0, 0.9)
                .at(chrono::Utc.with_ymd_and_hms(2025, 1, 15, 10, 0, 0).unwrap()),
        )
        .await
        .unwrap();

        let tf = Timeframe::Month(2025, 1);
        let bytes = svc
            .export_report(&tf, ExportFormat::Json)
            .await
            .unwrap()
            .expect("json export should produce bytes");
        let decoded: Report = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded.timeframe, "2025-01");
        assert_eq!(decoded.total_analyses, 1);
    }

    #[tokio::test]
    async fn test_export_report_csv_header() {
        let svc = service().await;
        let bytes = svc
            .export_report(&Timeframe::Year(2025), ExportFormat::Csv)
            .await
            .unwrap()
            .unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("Metric,Value\n"));
    }
}
