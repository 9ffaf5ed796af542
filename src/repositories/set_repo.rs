use chrono::Utc;
use rusqlite::OptionalExtension;
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::{AppError, Result};
use crate::models::{
    CreateExerciseSet, ExerciseSet, ExerciseSetWithExercise, FromSqliteRow, UpdateExerciseSet,
};

#[derive(Clone)]
pub struct SetRepository {
    pool: DbPool,
}

impl SetRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create_set(
        &self,
        session_id: &str,
        input: &CreateExerciseSet,
    ) -> Result<ExerciseSet> {
        let set = ExerciseSet {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            exercise_id: input.exercise_id.clone(),
            reps: input.reps,
            weight: input.weight,
            created_at: Utc::now(),
        };

        let pool = self.pool.clone();
        let row = set.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let conn = pool.get()?;
            conn.execute(
                "INSERT INTO exercise_sets (id, session_id, exercise_id, reps, weight, created_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
                rusqlite::params![
                    row.id,
                    row.session_id,
                    row.exercise_id,
                    row.reps,
                    row.weight,
                    row.created_at
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

        Ok(set)
    }

    pub async fn find_set_by_id(&self, id: &str) -> Result<Option<ExerciseSet>> {
        let pool = self.pool.clone();
        let id = id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let mut stmt = conn.prepare("SELECT * FROM exercise_sets WHERE id = ?")?;
            let result = stmt.query_row([&id], ExerciseSet::from_row).optional()?;
            Ok(result)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    pub async fn find_sets_by_session(
        &self,
        session_id: &str,
    ) -> Result<Vec<ExerciseSetWithExercise>> {
        let pool = self.pool.clone();
        let session_id = session_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let mut stmt = conn.prepare(
                "SELECT es.id, es.session_id, es.exercise_id, e.name AS exercise_name,
                        es.reps, es.weight, es.created_at
                 FROM exercise_sets es
                 JOIN exercises e ON es.exercise_id = e.id
                 WHERE es.session_id = ?
                 ORDER BY es.created_at",
            )?;
            let sets = stmt
                .query_map([&session_id], ExerciseSetWithExercise::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(sets)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    pub async fn count_sets(&self, session_id: &str) -> Result<i64> {
        let pool = self.pool.clone();
        let session_id = session_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM exercise_sets WHERE session_id = ?",
                [&session_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    pub async fn update_set(
        &self,
        id: &str,
        session_id: &str,
        input: &UpdateExerciseSet,
    ) -> Result<bool> {
        let pool = self.pool.clone();
        let id = id.to_string();
        let session_id = session_id.to_string();
        let (reps, weight) = (input.reps, input.weight);
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let rows = conn.execute(
                "UPDATE exercise_sets SET reps = ?, weight = ? WHERE id = ? AND session_id = ?",
                rusqlite::params![reps, weight, id, session_id],
            )?;
            Ok(rows > 0)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    pub async fn delete_set(&self, id: &str, session_id: &str) -> Result<bool> {
        let pool = self.pool.clone();
        let id = id.to_string();
        let session_id = session_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let rows = conn.execute(
                "DELETE FROM exercise_sets WHERE id = ? AND session_id = ?",
                rusqlite::params![id, session_id],
            )?;
            Ok(rows > 0)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }
}
