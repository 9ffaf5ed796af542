//! Client-side core: the typed gateway to the API, the reactive auth state
//! machine with its rate limiter and persisted snapshot, and the debounced
//! summary orchestrator.

pub mod auth;
pub mod error;
pub mod gateway;
pub mod rate_limit;
pub mod snapshot;
pub mod storage;
pub mod summary;

pub use auth::{AuthCore, AuthState};
pub use error::{ClientError, ClientResult};
pub use gateway::{AuthGateway, HttpGateway, SessionQuery, SummaryGateway, SESSION_KEY};
pub use rate_limit::LoginRateLimiter;
pub use snapshot::{PersistedAuthState, SnapshotStore};
pub use storage::{FileStorage, LocalStorage, MemoryStorage};
pub use summary::{SummaryOrchestrator, SummaryStatus};

use std::time::Duration;

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub base_url: String,
    /// Failed sign-ins allowed per email inside `login_window`.
    pub max_login_attempts: usize,
    pub login_window: Duration,
    /// Inactivity after which the client signs out on its own.
    pub session_timeout: Duration,
    /// Persisted auth snapshots older than this are discarded on load.
    pub snapshot_max_age: Duration,
    pub summary_debounce: Duration,
    pub summary_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            max_login_attempts: 5,
            login_window: Duration::from_secs(15 * 60),
            session_timeout: Duration::from_secs(30 * 60),
            snapshot_max_age: Duration::from_secs(24 * 60 * 60),
            summary_debounce: Duration::from_secs(1),
            summary_timeout: Duration::from_secs(60),
        }
    }
}
