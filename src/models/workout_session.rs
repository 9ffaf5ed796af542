use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use super::{ExerciseSetWithExercise, FromSqliteRow};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSession {
    pub id: String,
    pub user_id: String,
    pub performed_at: DateTime<Utc>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl FromSqliteRow for WorkoutSession {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            performed_at: row.get("performed_at")?,
            description: row.get("description")?,
            location: row.get("location")?,
            summary: row.get("summary")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Derived totals over a session's sets. `total_weight` is the lifted volume
/// (weight x reps summed over every set).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionTotals {
    pub total_weight: f64,
    pub total_reps: i64,
    pub set_count: i64,
}

impl SessionTotals {
    pub fn from_sets(sets: &[ExerciseSetWithExercise]) -> Self {
        sets.iter().fold(Self::default(), |acc, set| Self {
            total_weight: acc.total_weight + set.weight * f64::from(set.reps),
            total_reps: acc.total_reps + i64::from(set.reps),
            set_count: acc.set_count + 1,
        })
    }
}

impl FromSqliteRow for SessionTotals {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            total_weight: row.get("total_weight")?,
            total_reps: row.get("total_reps")?,
            set_count: row.get("set_count")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionWithTotals {
    #[serde(flatten)]
    pub session: WorkoutSession,
    #[serde(flatten)]
    pub totals: SessionTotals,
}

impl FromSqliteRow for SessionWithTotals {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            session: WorkoutSession::from_row(row)?,
            totals: SessionTotals::from_row(row)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDetail {
    pub session: WorkoutSession,
    pub sets: Vec<ExerciseSetWithExercise>,
    pub totals: SessionTotals,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateWorkoutSession {
    pub performed_at: DateTime<Utc>,
    pub description: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateWorkoutSession {
    pub performed_at: DateTime<Utc>,
    pub description: Option<String>,
    pub location: Option<String>,
}
