use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::{AppError, Result};
use crate::models::{
    CreateWorkoutSession, FromSqliteRow, RangeTotals, SessionWithTotals, UpdateWorkoutSession,
    WorkoutSession,
};

/// Optional inclusive bounds on `performed_at`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

const RANGE_FILTER: &str = "(?2 IS NULL OR julianday(ws.performed_at) >= julianday(?2))
    AND (?3 IS NULL OR julianday(ws.performed_at) <= julianday(?3))";

#[derive(Clone)]
pub struct WorkoutRepository {
    pool: DbPool,
}

impl WorkoutRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create_session(
        &self,
        user_id: &str,
        input: &CreateWorkoutSession,
    ) -> Result<WorkoutSession> {
        let session = WorkoutSession {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            performed_at: input.performed_at,
            description: input.description.clone(),
            location: input.location.clone(),
            summary: None,
            created_at: Utc::now(),
        };

        let pool = self.pool.clone();
        let row = session.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let conn = pool.get()?;
            conn.execute(
                "INSERT INTO workout_sessions (id, user_id, performed_at, description, location, created_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
                rusqlite::params![
                    row.id,
                    row.user_id,
                    row.performed_at,
                    row.description,
                    row.location,
                    row.created_at
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

        Ok(session)
    }

    pub async fn find_session_by_id(&self, id: &str) -> Result<Option<WorkoutSession>> {
        let pool = self.pool.clone();
        let id = id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let mut stmt = conn.prepare("SELECT * FROM workout_sessions WHERE id = ?")?;
            let result = stmt.query_row([&id], WorkoutSession::from_row).optional()?;
            Ok(result)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// Sessions with their totals, newest first.
    pub async fn find_sessions_by_user_paginated(
        &self,
        user_id: &str,
        range: DateRange,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<SessionWithTotals>> {
        let pool = self.pool.clone();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let sql = format!(
                "SELECT ws.*,
                        COALESCE(SUM(es.weight * es.reps), 0.0) AS total_weight,
                        COALESCE(SUM(es.reps), 0) AS total_reps,
                        COUNT(es.id) AS set_count
                 FROM workout_sessions ws
                 LEFT JOIN exercise_sets es ON es.session_id = ws.id
                 WHERE ws.user_id = ?1 AND {RANGE_FILTER}
                 GROUP BY ws.id
                 ORDER BY julianday(ws.performed_at) DESC, ws.created_at DESC
                 LIMIT ?4 OFFSET ?5"
            );
            let mut stmt = conn.prepare(&sql)?;
            let sessions = stmt
                .query_map(
                    rusqlite::params![user_id, range.from, range.to, limit, offset],
                    SessionWithTotals::from_row,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(sessions)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    pub async fn count_sessions_by_user(&self, user_id: &str, range: DateRange) -> Result<i64> {
        let pool = self.pool.clone();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let sql = format!(
                "SELECT COUNT(*) FROM workout_sessions ws WHERE ws.user_id = ?1 AND {RANGE_FILTER}"
            );
            let count: i64 = conn.query_row(
                &sql,
                rusqlite::params![user_id, range.from, range.to],
                |row| row.get(0),
            )?;
            Ok(count)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// Sessions the user has on the UTC calendar day of `day`, optionally
    /// ignoring one session (the one being edited).
    pub async fn count_sessions_on_day(
        &self,
        user_id: &str,
        day: DateTime<Utc>,
        exclude_id: Option<&str>,
    ) -> Result<i64> {
        let pool = self.pool.clone();
        let user_id = user_id.to_string();
        let exclude_id = exclude_id.map(|s| s.to_string());
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM workout_sessions
                 WHERE user_id = ?1 AND date(performed_at) = date(?2)
                   AND (?3 IS NULL OR id != ?3)",
                rusqlite::params![user_id, day, exclude_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    pub async fn update_session(
        &self,
        id: &str,
        user_id: &str,
        input: &UpdateWorkoutSession,
    ) -> Result<bool> {
        let pool = self.pool.clone();
        let id = id.to_string();
        let user_id = user_id.to_string();
        let input = input.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let rows = conn.execute(
                "UPDATE workout_sessions SET performed_at = ?, description = ?, location = ?
                 WHERE id = ? AND user_id = ?",
                rusqlite::params![
                    input.performed_at,
                    input.description,
                    input.location,
                    id,
                    user_id
                ],
            )?;
            Ok(rows > 0)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    pub async fn delete_session(&self, id: &str, user_id: &str) -> Result<bool> {
        let pool = self.pool.clone();
        let id = id.to_string();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let rows = conn.execute(
                "DELETE FROM workout_sessions WHERE id = ? AND user_id = ?",
                rusqlite::params![id, user_id],
            )?;
            Ok(rows > 0)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// Store a summary unless the session already has one.
    pub async fn set_summary(&self, id: &str, summary: &str) -> Result<bool> {
        let pool = self.pool.clone();
        let id = id.to_string();
        let summary = summary.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let rows = conn.execute(
                "UPDATE workout_sessions SET summary = ? WHERE id = ? AND summary IS NULL",
                rusqlite::params![summary, id],
            )?;
            Ok(rows > 0)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    // Statistics
    pub async fn count_sessions_this_week(&self, user_id: &str) -> Result<i64> {
        self.count_sessions_since(user_id, "-7 days").await
    }

    pub async fn count_sessions_this_month(&self, user_id: &str) -> Result<i64> {
        self.count_sessions_since(user_id, "-30 days").await
    }

    async fn count_sessions_since(&self, user_id: &str, modifier: &'static str) -> Result<i64> {
        let pool = self.pool.clone();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM workout_sessions
                 WHERE user_id = ? AND julianday(performed_at) >= julianday('now', ?)",
                rusqlite::params![user_id, modifier],
                |row| row.get(0),
            )?;
            Ok(count)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    pub async fn range_totals(&self, user_id: &str, range: DateRange) -> Result<RangeTotals> {
        let pool = self.pool.clone();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let sql = format!(
                "SELECT COUNT(DISTINCT ws.id),
                        COUNT(es.id),
                        COALESCE(SUM(es.reps), 0),
                        COALESCE(SUM(es.weight * es.reps), 0.0)
                 FROM workout_sessions ws
                 LEFT JOIN exercise_sets es ON es.session_id = ws.id
                 WHERE ws.user_id = ?1 AND {RANGE_FILTER}"
            );
            let totals = conn.query_row(
                &sql,
                rusqlite::params![user_id, range.from, range.to],
                |row| {
                    Ok(RangeTotals {
                        from: range.from,
                        to: range.to,
                        session_count: row.get(0)?,
                        set_count: row.get(1)?,
                        total_reps: row.get(2)?,
                        total_weight: row.get(3)?,
                    })
                },
            )?;
            Ok(totals)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }
}
