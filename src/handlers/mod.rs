pub mod auth;
pub mod exercises;
pub mod functions;
pub mod health;
pub mod sessions;
pub mod sets;
pub mod stats;
