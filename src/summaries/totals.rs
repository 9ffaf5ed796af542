use async_trait::async_trait;
use std::collections::BTreeMap;

use super::{Summarizer, SummaryInput};
use crate::error::Result;

/// Builds a summary from the numbers alone.
pub struct TotalsSummarizer;

#[async_trait]
impl Summarizer for TotalsSummarizer {
    fn name(&self) -> &'static str {
        "totals"
    }

    async fn summarize(&self, input: &SummaryInput) -> Result<String> {
        let mut per_exercise: BTreeMap<&str, (i64, f64)> = BTreeMap::new();
        for set in &input.sets {
            let entry = per_exercise.entry(set.exercise_name.as_str()).or_default();
            entry.0 += 1;
            entry.1 = entry.1.max(set.weight);
        }

        let exercises = per_exercise
            .iter()
            .map(|(name, (sets, top))| {
                let noun = if *sets == 1 { "set" } else { "sets" };
                format!("{} ({} {}, top {} kg)", name, sets, noun, top)
            })
            .collect::<Vec<_>>()
            .join(", ");

        Ok(format!(
            "{} sets and {} reps for {} kg of total volume. Exercises: {}.",
            input.totals.set_count, input.totals.total_reps, input.totals.total_weight, exercises
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExerciseSetWithExercise, WorkoutSession};
    use chrono::Utc;

    fn set(name: &str, reps: i32, weight: f64) -> ExerciseSetWithExercise {
        ExerciseSetWithExercise {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: "w1".to_string(),
            exercise_id: name.to_lowercase(),
            exercise_name: name.to_string(),
            reps,
            weight,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_summary_mentions_totals_and_exercises() {
        let now = Utc::now();
        let input = SummaryInput::new(
            WorkoutSession {
                id: "w1".to_string(),
                user_id: "u1".to_string(),
                performed_at: now,
                description: None,
                location: None,
                summary: None,
                created_at: now,
            },
            vec![set("Squat", 5, 100.0), set("Squat", 5, 110.0), set("Deadlift", 3, 140.0)],
        );

        let summary = TotalsSummarizer.summarize(&input).await.unwrap();
        assert!(summary.starts_with("3 sets and 13 reps"));
        assert!(summary.contains("Squat (2 sets, top 110 kg)"));
        assert!(summary.contains("Deadlift (1 set, top 140 kg)"));
    }
}
