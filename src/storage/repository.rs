use rusqlite::{params, Connection, OptionalExtension};

use crate::activity::Activity;

// ── Activities ─────────────────────────────────────────────────────

/// Append an activity event. Events are never updated or deleted.
pub fn insert_activity(
    conn: &Connection,
    user_id: &str,
    activity: &Activity,
) -> Result<(), rusqlite::Error> {
    let occurred_at = activity.occurred_at.to_rfc3339();
    let date_key = activity.occurred_at.date_naive().format("%Y-%m-%d").to_string();
    conn.execute(
        "INSERT INTO fact_activities (
            user_id, kind, language, issue_type,
            duration_seconds, quality_score, occurred_at, occurred_date_key
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            user_id,
            activity.kind.as_str(),
            activity.language,
            activity.issue_type,
            activity.duration_seconds,
            activity.quality_score,
            occurred_at,
            date_key,
        ],
    )?;
    Ok(())
}

/// A stored activity row, as returned by listing queries.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ActivityRow {
    pub activity_id: i64,
    pub user_id: String,
    pub kind: String,
    pub language: Option<String>,
    pub issue_type: Option<String>,
    pub duration_seconds: Option<f64>,
    pub quality_score: Option<f64>,
    pub occurred_at: String,
}

/// List the most recently recorded activities, newest first.
pub fn recent_activities(
    conn: &Connection,
    limit: u32,
) -> Result<Vec<ActivityRow>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT activity_id, user_id, kind, language, issue_type,
                duration_seconds, quality_score, occurred_at
         FROM fact_activities
         ORDER BY activity_id DESC
         LIMIT ?1",
    )?;
    let rows = stmt.query_map([limit], |row| {
        Ok(ActivityRow {
            activity_id: row.get(0)?,
            user_id: row.get(1)?,
            kind: row.get(2)?,
            language: row.get(3)?,
            issue_type: row.get(4)?,
            duration_seconds: row.get(5)?,
            quality_score: row.get(6)?,
            occurred_at: row.get(7)?,
        })
    })?;
    rows.collect()
}

pub fn count_activities(conn: &Connection) -> Result<i64, rusqlite::Error> {
    conn.query_row("SELECT COUNT(*) FROM fact_activities", [], |row| row.get(0))
}

pub fn count_users(conn: &Connection) -> Result<i64, rusqlite::Error> {
    conn.query_row(
        "SELECT COUNT(DISTINCT user_id) FROM fact_activities",
        [],
        |row| row.get(0),
    )
}

pub fn last_recorded_at(conn: &Connection) -> Result<Option<String>, rusqlite::Error> {
    conn.query_row(
        "SELECT MAX(recorded_at) FROM fact_activities",
        [],
        |row| row.get(0),
    )
}

// ── App config ─────────────────────────────────────────────────────

pub fn get_config(conn: &Connection, key: &str) -> Result<Option<String>, rusqlite::Error> {
    conn.query_row(
        "SELECT value FROM app_config WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
}

pub fn set_config(conn: &Connection, key: &str, value: &str) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO app_config (key, value, updated_at)
         VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(key) DO UPDATE SET
           value = excluded.value, updated_at = excluded.updated_at",
        params![key, value],
    )?;
    Ok(())
}

pub fn list_config(conn: &Connection) -> Result<Vec<(String, String)>, rusqlite::Error> {
    let mut stmt = conn.prepare("SELECT key, value FROM app_config ORDER BY key")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    rows.collect()
}
