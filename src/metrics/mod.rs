pub mod types;

pub use types::*;

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::error::Result;
use crate::storage::Database;
use crate::timeframe::Timeframe;

/// Number of chronological buckets in the quality trend.
const TREND_BUCKETS: i64 = 4;

/// Compute the aggregate snapshot for a timeframe.
///
/// Reads only events whose `occurred_date_key` falls inside the window,
/// so the result is a deterministic function of the stored data. An
/// empty window yields an all-zero snapshot.
pub async fn compute_snapshot(db: &Database, timeframe: &Timeframe) -> Result<MetricsSnapshot> {
    let (start, end) = timeframe.date_range();
    let start_str = start.format("%Y-%m-%d").to_string();
    let end_str = end.format("%Y-%m-%d").to_string();

    db.reader()
        .call(move |conn| {
            let (total_analyses, average_analysis_time) =
                analysis_totals_sql(conn, &start_str, &end_str)?;
            let unique_users = unique_users_sql(conn, &start_str, &end_str)?;
            let top_issue_types = top_issue_types_sql(conn, &start_str, &end_str)?;
            let language_distribution = language_distribution_sql(conn, &start_str, &end_str)?;

            let samples = quality_samples_sql(conn, &start_str, &end_str)?;
            let quality_trend = trend_from_samples(start, end, &samples);
            let average_quality_score = if samples.is_empty() {
                0.0
            } else {
                samples.iter().map(|(_, q)| q).sum::<f64>() / samples.len() as f64
            };

            let detected = count_kind_sql(conn, "issue_detected", &start_str, &end_str)?;
            let resolved = count_kind_sql(conn, "issue_resolved", &start_str, &end_str)?;
            let reviews = count_kind_sql(conn, "review", &start_str, &end_str)?;

            Ok::<MetricsSnapshot, rusqlite::Error>(MetricsSnapshot {
                total_analyses,
                unique_users,
                average_analysis_time,
                top_issue_types,
                language_distribution,
                quality_trend,
                average_quality_score,
                issue_resolution_rate: capped_ratio(resolved, detected),
                code_review_efficiency: capped_ratio(reviews, total_analyses),
            })
        })
        .await
        .map_err(|e| crate::error::Error::Database(e.to_string()))
}

// ── Internal SQL helpers ───────────────────────────────────────────

fn analysis_totals_sql(
    conn: &rusqlite::Connection,
    start: &str,
    end: &str,
) -> std::result::Result<(u64, f64), rusqlite::Error> {
    conn.query_row(
        "SELECT COUNT(*), COALESCE(AVG(duration_seconds), 0.0)
         FROM fact_activities
         WHERE kind = 'analysis'
           AND occurred_date_key >= ?1 AND occurred_date_key <= ?2",
        [start, end],
        |row| Ok((row.get::<_, i64>(0)? as u64, row.get::<_, f64>(1)?)),
    )
}

fn unique_users_sql(
    conn: &rusqlite::Connection,
    start: &str,
    end: &str,
) -> std::result::Result<u64, rusqlite::Error> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(DISTINCT user_id)
         FROM fact_activities
         WHERE occurred_date_key >= ?1 AND occurred_date_key <= ?2",
        [start, end],
        |row| row.get(0),
    )?;
    Ok(n as u64)
}

fn count_kind_sql(
    conn: &rusqlite::Connection,
    kind: &str,
    start: &str,
    end: &str,
) -> std::result::Result<u64, rusqlite::Error> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*)
         FROM fact_activities
         WHERE kind = ?1
           AND occurred_date_key >= ?2 AND occurred_date_key <= ?3",
        [kind, start, end],
        |row| row.get(0),
    )?;
    Ok(n as u64)
}

fn top_issue_types_sql(
    conn: &rusqlite::Connection,
    start: &str,
    end: &str,
) -> std::result::Result<Vec<String>, rusqlite::Error> {
    // MIN(activity_id) is the arrival order of the first occurrence,
    // which breaks frequency ties.
    let mut stmt = conn.prepare(
        "SELECT issue_type
         FROM fact_activities
         WHERE kind = 'issue_detected' AND issue_type IS NOT NULL
           AND occurred_date_key >= ?1 AND occurred_date_key <= ?2
         GROUP BY issue_type
         ORDER BY COUNT(*) DESC, MIN(activity_id) ASC
         LIMIT ?3",
    )?;
    let rows = stmt.query_map(
        rusqlite::params![start, end, TOP_ISSUE_LIMIT],
        |row| row.get(0),
    )?;
    rows.collect()
}

fn language_distribution_sql(
    conn: &rusqlite::Connection,
    start: &str,
    end: &str,
) -> std::result::Result<BTreeMap<String, u64>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT language, COUNT(*)
         FROM fact_activities
         WHERE kind = 'analysis' AND language IS NOT NULL
           AND occurred_date_key >= ?1 AND occurred_date_key <= ?2
         GROUP BY language",
    )?;
    let rows = stmt.query_map([start, end], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
    })?;
    rows.collect()
}

fn quality_samples_sql(
    conn: &rusqlite::Connection,
    start: &str,
    end: &str,
) -> std::result::Result<Vec<(NaiveDate, f64)>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT occurred_date_key, quality_score
         FROM fact_activities
         WHERE kind = 'analysis' AND quality_score IS NOT NULL
           AND occurred_date_key >= ?1 AND occurred_date_key <= ?2
         ORDER BY occurred_date_key, activity_id",
    )?;
    let rows = stmt.query_map([start, end], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
    })?;
    let mut samples = Vec::new();
    for row in rows {
        let (key, score) = row?;
        // Date keys are written by insert_activity and always well-formed.
        if let Ok(date) = NaiveDate::parse_from_str(&key, "%Y-%m-%d") {
            samples.push((date, score));
        }
    }
    Ok(samples)
}

/// Split the window into up to `TREND_BUCKETS` equal chronological slices
/// and average the scores falling into each. Empty buckets are omitted so
/// the trend only reflects observed data.
fn trend_from_samples(start: NaiveDate, end: NaiveDate, samples: &[(NaiveDate, f64)]) -> Vec<f64> {
    if samples.is_empty() {
        return Vec::new();
    }

    let span_days = (end - start).num_days() + 1;
    let buckets = TREND_BUCKETS.min(span_days).max(1);

    let mut sums = vec![0.0f64; buckets as usize];
    let mut counts = vec![0u64; buckets as usize];
    for (date, score) in samples {
        let offset = (*date - start).num_days().clamp(0, span_days - 1);
        let idx = (offset * buckets / span_days).min(buckets - 1) as usize;
        sums[idx] += score;
        counts[idx] += 1;
    }

    sums.iter()
        .zip(&counts)
        .filter(|(_, &n)| n > 0)
        .map(|(s, &n)| s / n as f64)
        .collect()
}

fn capped_ratio(numerator: u64, denominator: u64) -> f64 {
    let ratio = numerator as f64 / denominator.max(1) as f64;
    ratio.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::Activity;
    use crate::storage::repository::insert_activity;
    use chrono::{TimeZone, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_trend_empty() {
        let trend = trend_from_samples(date(2025, 1, 1), date(2025, 1, 31), &[]);
        assert!(trend.is_empty());
    }

    #[test]
    fn test_trend_four_buckets() {
        // 28-day window, one sample per 7-day bucket
        let samples = vec![
            (date(2025, 2, 1), 0.75),
            (date(2025, 2, 9), 0.78),
            (date(2025, 2, 16), 0.82),
            (date(2025, 2, 24), 0.85),
        ];
        let trend = trend_from_samples(date(2025, 2, 1), date(2025, 2, 28), &samples);
        assert_eq!(trend, vec![0.75, 0.78, 0.82, 0.85]);
    }

    #[test]
    fn test_trend_averages_within_bucket() {
        let samples = vec![
            (date(2025, 2, 1), 0.6),
            (date(2025, 2, 2), 0.8),
            (date(2025, 2, 27), 0.9),
        ];
        let trend = trend_from_samples(date(2025, 2, 1), date(2025, 2, 28), &samples);
        // First bucket averages 0.6 and 0.8; middle buckets are empty and omitted.
        assert_eq!(trend.len(), 2);
        assert!((trend[0] - 0.7).abs() < 1e-9);
        assert!((trend[1] - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_trend_single_day_window() {
        let d = date(2025, 8, 28);
        let trend = trend_from_samples(d, d, &[(d, 0.5), (d, 0.7)]);
        assert_eq!(trend.len(), 1);
        assert!((trend[0] - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_capped_ratio() {
        assert_eq!(capped_ratio(89, 100), 0.89);
        assert_eq!(capped_ratio(5, 0), 1.0); // divide-by-zero guard, then capped
        assert_eq!(capped_ratio(0, 0), 0.0);
        assert_eq!(capped_ratio(12, 10), 1.0);
    }

    async fn seed_db() -> Database {
        let db = Database::open_memory().await.unwrap();
        db.writer()
            .call(|conn| {
                let jan = |d: u32, h: u32| Utc.with_ymd_and_hms(2025, 1, d, h, 0, 0).unwrap();

                insert_activity(conn, "alice", &Activity::analysis("Rust", 2.0, 0.8).at(jan(5, 9)))?;
                insert_activity(conn, "alice", &Activity::analysis("Rust", 4.0, 0.9).at(jan(20, 9)))?;
                insert_activity(conn, "bob", &Activity::analysis("Go", 3.0, 0.7).at(jan(12, 14)))?;
                insert_activity(conn, "bob", &Activity::issue_detected("Unused Variables").at(jan(5, 10)))?;
                insert_activity(conn, "bob", &Activity::issue_detected("Unused Variables").at(jan(6, 10)))?;
                insert_activity(conn, "carol", &Activity::issue_detected("Long Functions").at(jan(7, 10)))?;
                insert_activity(conn, "carol", &Activity::issue_resolved("Unused Variables").at(jan(8, 10)))?;
                insert_activity(conn, "alice", &Activity::review(300.0).at(jan(9, 10)))?;

                // Outside the January window; must not be counted
                insert_activity(
                    conn,
                    "mallory",
                    &Activity::analysis("Rust", 9.0, 0.1)
                        .at(Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap()),
                )?;
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();
        db
    }

    #[tokio::test]
    async fn test_snapshot_aggregates() {
        let db = seed_db().await;
        let snap = compute_snapshot(&db, &Timeframe::Month(2025, 1)).await.unwrap();

        assert_eq!(snap.total_analyses, 3);
        assert_eq!(snap.unique_users, 3);
        assert!((snap.average_analysis_time - 3.0).abs() < 1e-9);

        assert_eq!(snap.language_distribution.get("Rust"), Some(&2));
        assert_eq!(snap.language_distribution.get("Go"), Some(&1));

        // 2x Unused Variables, 1x Long Functions
        assert_eq!(
            snap.top_issue_types,
            vec!["Unused Variables".to_string(), "Long Functions".to_string()]
        );

        assert!((snap.average_quality_score - 0.8).abs() < 1e-9);
        // 1 resolved / 3 detected
        assert!((snap.issue_resolution_rate - 1.0 / 3.0).abs() < 1e-9);
        // 1 review / 3 analyses
        assert!((snap.code_review_efficiency - 1.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_snapshot_excludes_outside_window() {
        let db = seed_db().await;
        let snap = compute_snapshot(&db, &Timeframe::Month(2025, 2)).await.unwrap();
        assert_eq!(snap.total_analyses, 1);
        assert_eq!(snap.unique_users, 1);
        assert!(snap.top_issue_types.is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_empty_window() {
        let db = Database::open_memory().await.unwrap();
        let snap = compute_snapshot(&db, &Timeframe::Year(2025)).await.unwrap();
        assert_eq!(snap, MetricsSnapshot::default());
    }

    #[tokio::test]
    async fn test_top_issue_tie_broken_by_first_seen() {
        let db = Database::open_memory().await.unwrap();
        db.writer()
            .call(|conn| {
                let at = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
                insert_activity(conn, "u1", &Activity::issue_detected("Long Functions").at(at))?;
                insert_activity(conn, "u1", &Activity::issue_detected("Force Unwrap").at(at))?;
                insert_activity(conn, "u1", &Activity::issue_detected("Force Unwrap").at(at))?;
                insert_activity(conn, "u1", &Activity::issue_detected("Long Functions").at(at))?;
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();

        let snap = compute_snapshot(&db, &Timeframe::Month(2025, 3)).await.unwrap();
        // Both appear twice; Long Functions was seen first.
        assert_eq!(
            snap.top_issue_types,
            vec!["Long Functions".to_string(), "Force Unwrap".to_string()]
        );
    }

    #[tokio::test]
    async fn test_quality_trend_chronological() {
        let db = Database::open_memory().await.unwrap();
        db.writer()
            .call(|conn| {
                for (day, score) in [(2u32, 0.75), (9, 0.78), (16, 0.82), (24, 0.85)] {
                    insert_activity(
                        conn,
                        "u1",
                        &Activity::analysis("Rust", 1.0, score)
                            .at(Utc.with_ymd_and_hms(2025, 2, day, 12, 0, 0).unwrap()),
                    )?;
                }
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();

        let snap = compute_snapshot(&db, &Timeframe::Month(2025, 2)).await.unwrap();
        assert_eq!(snap.quality_trend, vec![0.75, 0.78, 0.82, 0.85]);
        for q in &snap.quality_trend {
            assert!((0.0..=1.0).contains(q));
        }
    }
}
