pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod migrations;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod rules;
pub mod session;
pub mod state;
pub mod summaries;
pub mod validation;
pub mod version;
