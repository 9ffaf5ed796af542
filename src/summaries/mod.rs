//! Server side of the summary function: a pluggable summarizer plus the
//! service that guards and records generations.

mod openai;
mod service;
mod totals;

pub use openai::OpenAiSummarizer;
pub use service::SummaryService;
pub use totals::TotalsSummarizer;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::SummaryConfig;
use crate::error::Result;
use crate::models::{ExerciseSetWithExercise, SessionTotals, WorkoutSession};

/// Everything a summarizer gets to see about one session.
#[derive(Debug, Clone)]
pub struct SummaryInput {
    pub session: WorkoutSession,
    pub sets: Vec<ExerciseSetWithExercise>,
    pub totals: SessionTotals,
}

impl SummaryInput {
    pub fn new(session: WorkoutSession, sets: Vec<ExerciseSetWithExercise>) -> Self {
        let totals = SessionTotals::from_sets(&sets);
        Self {
            session,
            sets,
            totals,
        }
    }

    /// Plain-text rendering of the session, one line per set.
    pub fn describe(&self) -> String {
        let mut lines = vec![format!(
            "Workout on {}",
            self.session.performed_at.format("%Y-%m-%d %H:%M UTC")
        )];
        if let Some(location) = &self.session.location {
            lines.push(format!("Location: {}", location));
        }
        if let Some(description) = &self.session.description {
            lines.push(format!("Notes: {}", description));
        }
        for set in &self.sets {
            lines.push(format!(
                "- {}: {} reps x {} kg",
                set.exercise_name, set.reps, set.weight
            ));
        }
        lines.push(format!(
            "Totals: {} sets, {} reps, {} kg volume",
            self.totals.set_count, self.totals.total_reps, self.totals.total_weight
        ));
        lines.join("\n")
    }
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    fn name(&self) -> &'static str;

    async fn summarize(&self, input: &SummaryInput) -> Result<String>;
}

/// The LLM-backed summarizer when an API key is configured, otherwise the
/// deterministic totals summarizer.
pub fn summarizer_from_config(config: &SummaryConfig) -> Arc<dyn Summarizer> {
    match &config.llm_api_key {
        Some(api_key) => Arc::new(OpenAiSummarizer::new(
            config.llm_base_url.clone(),
            api_key.clone(),
            config.llm_model.clone(),
            config.timeout,
        )),
        None => {
            tracing::warn!("LLM_API_KEY not set, summaries use the totals summarizer");
            Arc::new(TotalsSummarizer)
        }
    }
}
