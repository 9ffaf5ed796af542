use std::sync::Arc;
use std::time::Duration;

use crate::db::DbPool;
use crate::repositories::{
    ExerciseRepository, SetRepository, TokenRepository, UserRepository, WorkoutRepository,
};
use crate::summaries::{Summarizer, SummaryService};

/// Shared handler state: one repository per table group plus the summary service.
#[derive(Clone)]
pub struct AppState {
    pub user_repo: UserRepository,
    pub token_repo: TokenRepository,
    pub workout_repo: WorkoutRepository,
    pub set_repo: SetRepository,
    pub exercise_repo: ExerciseRepository,
    pub summaries: SummaryService,
}

impl AppState {
    pub fn new(pool: DbPool, summarizer: Arc<dyn Summarizer>, summary_timeout: Duration) -> Self {
        let user_repo = UserRepository::new(pool.clone());
        let workout_repo = WorkoutRepository::new(pool.clone());
        let set_repo = SetRepository::new(pool.clone());

        let summaries = SummaryService {
            user_repo: user_repo.clone(),
            workout_repo: workout_repo.clone(),
            set_repo: set_repo.clone(),
            summarizer,
            timeout: summary_timeout,
        };

        Self {
            user_repo,
            token_repo: TokenRepository::new(pool.clone()),
            workout_repo,
            set_repo,
            exercise_repo: ExerciseRepository::new(pool),
            summaries,
        }
    }
}
