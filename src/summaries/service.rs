use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use super::{Summarizer, SummaryInput};
use crate::error::{AppError, ErrorBody, Result};
use crate::models::SummaryResponse;
use crate::repositories::{SetRepository, UserRepository, WorkoutRepository};

#[derive(Clone)]
pub struct SummaryService {
    pub user_repo: UserRepository,
    pub workout_repo: WorkoutRepository,
    pub set_repo: SetRepository,
    pub summarizer: Arc<dyn Summarizer>,
    pub timeout: Duration,
}

impl SummaryService {
    /// Generate and store the summary of one session.
    ///
    /// Refusals (ownership, existing summary, generation already running) are
    /// returned as errors; a failed or timed-out generation is reported in the
    /// response body.
    pub async fn generate(&self, user_id: &str, session_id: &str) -> Result<SummaryResponse> {
        let session = self
            .workout_repo
            .find_session_by_id(session_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Workout not found".to_string()))?;

        if session.user_id != user_id {
            return Err(AppError::Forbidden(
                "You can only summarize your own workouts".to_string(),
            ));
        }

        if session.summary.is_some() {
            return Err(AppError::AlreadySummarized);
        }

        let sets = self.set_repo.find_sets_by_session(session_id).await?;
        if sets.is_empty() {
            return Err(AppError::Validation(
                "Add at least one set before generating a summary".to_string(),
            ));
        }

        let now = Utc::now();
        let ttl =
            chrono::Duration::from_std(self.timeout).unwrap_or_else(|_| chrono::Duration::zero());
        let stale_before = now - ttl;
        if !self
            .user_repo
            .claim_generation(user_id, now, stale_before)
            .await?
        {
            return Err(AppError::GenerationInProgress);
        }

        tracing::info!(
            "Generating summary for session {} with {} summarizer",
            session_id,
            self.summarizer.name()
        );

        let input = SummaryInput::new(session, sets);
        let outcome = tokio::time::timeout(self.timeout, self.summarizer.summarize(&input)).await;

        // The marker is released whatever the outcome
        self.user_repo.release_generation(user_id).await?;

        match outcome {
            Ok(Ok(summary)) => {
                if !self.workout_repo.set_summary(session_id, &summary).await? {
                    return Err(AppError::AlreadySummarized);
                }
                tracing::info!("Stored summary for session {}", session_id);
                Ok(SummaryResponse::completed(summary))
            }
            Ok(Err(err)) => {
                tracing::warn!("Summary generation failed for {}: {}", session_id, err);
                Ok(SummaryResponse::failed(ErrorBody {
                    message: err.public_message(),
                    code: err.code(),
                }))
            }
            Err(_) => {
                tracing::warn!(
                    "Summary generation for {} exceeded {:?}",
                    session_id,
                    self.timeout
                );
                let err = AppError::Timeout;
                Ok(SummaryResponse::failed(ErrorBody {
                    message: err.public_message(),
                    code: err.code(),
                }))
            }
        }
    }
}
