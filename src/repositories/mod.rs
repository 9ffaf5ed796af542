pub mod exercise_repo;
pub mod set_repo;
pub mod token_repo;
pub mod user_repo;
pub mod workout_repo;

pub use exercise_repo::ExerciseRepository;
pub use set_repo::SetRepository;
pub use token_repo::TokenRepository;
pub use user_repo::UserRepository;
pub use workout_repo::{DateRange, WorkoutRepository};
