pub mod auth;
pub mod exercise;
pub mod exercise_set;
pub mod page;
pub mod stats;
pub mod summary;
pub mod user;
pub mod workout_session;

pub use auth::{AuthResponse, AuthSession};
pub use exercise::Exercise;
pub use exercise_set::{CreateExerciseSet, ExerciseSet, ExerciseSetWithExercise, UpdateExerciseSet};
pub use page::Page;
pub use stats::{RangeTotals, Stats};
pub use summary::{GenerateSummaryRequest, GenerationStatus, SummaryResponse};
pub use user::{Credentials, PasswordResetConfirm, PasswordResetRequest, User, UserProfile};
pub use workout_session::{
    CreateWorkoutSession, SessionDetail, SessionTotals, SessionWithTotals, UpdateWorkoutSession,
    WorkoutSession,
};

/// Row mapping for types read straight out of a query.
pub trait FromSqliteRow: Sized {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self>;
}
