use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::error::{ClientError, ClientResult};
use super::gateway::AuthGateway;
use super::rate_limit::LoginRateLimiter;
use super::snapshot::SnapshotStore;
use super::storage::{lock, LocalStorage};
use super::ClientConfig;
use crate::error::ErrorCode;
use crate::models::{AuthResponse, AuthSession, UserProfile};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub user: Option<UserProfile>,
    pub session: Option<AuthSession>,
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub error: Option<ClientError>,
    /// When the client signs itself out unless `touch` is called first.
    pub session_deadline: Option<DateTime<Utc>>,
}

/// Client authentication state machine. Cloning yields another handle to
/// the same state.
#[derive(Clone)]
pub struct AuthCore {
    inner: Arc<AuthInner>,
}

struct AuthInner {
    gateway: Arc<dyn AuthGateway>,
    limiter: LoginRateLimiter,
    snapshots: SnapshotStore,
    session_timeout: Duration,
    state: watch::Sender<AuthState>,
    deadline: Mutex<Option<Instant>>,
    timeout_task: Mutex<Option<JoinHandle<()>>>,
}

impl AuthInner {
    fn current_deadline(&self) -> Option<Instant> {
        *lock(&self.deadline)
    }
}

impl Drop for AuthInner {
    fn drop(&mut self) {
        if let Some(task) = lock(&self.timeout_task).take() {
            task.abort();
        }
    }
}

fn wall_deadline(timeout: Duration) -> Option<DateTime<Utc>> {
    Utc::now().checked_add_signed(chrono::Duration::from_std(timeout).ok()?)
}

async fn watch_inactivity(inner: Weak<AuthInner>) {
    loop {
        let Some(deadline) = inner.upgrade().and_then(|i| i.current_deadline()) else {
            return;
        };
        tokio::time::sleep_until(deadline).await;

        let Some(strong) = inner.upgrade() else {
            return;
        };
        match strong.current_deadline() {
            Some(deadline) if deadline > Instant::now() => continue,
            Some(_) => {
                // Detach rather than abort: this task is the one running
                drop(lock(&strong.timeout_task).take());
                tracing::info!("Signing out after {:?} of inactivity", strong.session_timeout);

                let core = AuthCore { inner: strong };
                if let Err(e) = core.sign_out().await {
                    tracing::debug!("Remote sign-out after timeout failed: {}", e);
                }
                core.transition(|s| {
                    s.error = Some(ClientError::new(
                        ErrorCode::Unauthorized,
                        "Your session expired due to inactivity",
                    ))
                });
                return;
            }
            None => return,
        }
    }
}

impl AuthCore {
    pub fn new(
        gateway: Arc<dyn AuthGateway>,
        storage: Arc<dyn LocalStorage>,
        config: &ClientConfig,
    ) -> Self {
        let (state, _) = watch::channel(AuthState::default());
        Self {
            inner: Arc::new(AuthInner {
                gateway,
                limiter: LoginRateLimiter::new(
                    storage.clone(),
                    config.max_login_attempts,
                    config.login_window,
                ),
                snapshots: SnapshotStore::new(storage, config.snapshot_max_age),
                session_timeout: config.session_timeout,
                state,
                deadline: Mutex::new(None),
                timeout_task: Mutex::new(None),
            }),
        }
    }

    pub fn state(&self) -> AuthState {
        self.inner.state.borrow().clone()
    }

    /// Every transition is observable through the returned receiver.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.inner.state.subscribe()
    }

    fn transition(&self, update: impl FnOnce(&mut AuthState)) {
        self.inner.state.send_modify(update);
        if let Err(e) = self.inner.snapshots.save(&self.state()) {
            tracing::warn!("Failed to persist auth state: {}", e);
        }
    }

    fn begin(&self) {
        self.transition(|s| {
            s.is_loading = true;
            s.error = None;
        });
    }

    fn fail(&self, err: ClientError) -> ClientError {
        let recorded = err.clone();
        self.transition(|s| {
            s.is_loading = false;
            s.error = Some(recorded);
        });
        err
    }

    fn finish(&self) {
        self.transition(|s| s.is_loading = false);
    }

    fn establish(&self, response: AuthResponse) -> UserProfile {
        let user = response.user.clone();
        let deadline = self.start_timeout();
        self.transition(|s| {
            s.user = Some(response.user);
            s.session = Some(response.session);
            s.is_authenticated = true;
            s.is_loading = false;
            s.error = None;
            s.session_deadline = deadline;
        });
        user
    }

    fn clear_local(&self, error: Option<ClientError>) {
        self.stop_timeout();
        self.transition(|s| {
            *s = AuthState {
                error,
                ..Default::default()
            }
        });
    }

    fn start_timeout(&self) -> Option<DateTime<Utc>> {
        let timeout = self.inner.session_timeout;
        *lock(&self.inner.deadline) = Some(Instant::now() + timeout);

        let task = tokio::spawn(watch_inactivity(Arc::downgrade(&self.inner)));
        if let Some(previous) = lock(&self.inner.timeout_task).replace(task) {
            previous.abort();
        }
        wall_deadline(timeout)
    }

    fn stop_timeout(&self) {
        *lock(&self.inner.deadline) = None;
        if let Some(task) = lock(&self.inner.timeout_task).take() {
            task.abort();
        }
    }

    /// Restore the persisted snapshot, then confirm it with the server.
    pub async fn initialize(&self) {
        if let Some(snapshot) = self.inner.snapshots.load() {
            tracing::debug!("Restored auth snapshot from {}", snapshot.saved_at);
            self.inner.state.send_modify(|s| {
                s.user = snapshot.user;
                s.is_authenticated = snapshot.is_authenticated;
            });
        }

        self.begin();
        match self.inner.gateway.current_user().await {
            Ok(user) => {
                let deadline = self.start_timeout();
                self.transition(|s| {
                    s.user = Some(user);
                    s.is_authenticated = true;
                    s.is_loading = false;
                    s.session_deadline = deadline;
                });
            }
            Err(e) if e.code == ErrorCode::Unauthorized => {
                tracing::debug!("No active session to restore");
                self.clear_local(None);
            }
            Err(e) => {
                tracing::warn!("Could not verify restored session: {}", e);
                self.clear_local(Some(e));
            }
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> ClientResult<UserProfile> {
        if let Err(e) = self.inner.limiter.check(email) {
            return Err(self.fail(e));
        }

        self.begin();
        match self.inner.gateway.sign_in(email, password).await {
            Ok(response) => {
                if let Err(e) = self.inner.limiter.reset(email) {
                    tracing::warn!("Failed to clear login attempts: {}", e);
                }
                tracing::info!("Signed in as {}", response.user.id);
                Ok(self.establish(response))
            }
            Err(e) => {
                if e.code == ErrorCode::InvalidCredentials {
                    if let Err(se) = self.inner.limiter.record_failure(email) {
                        tracing::warn!("Failed to record login attempt: {}", se);
                    }
                }
                Err(self.fail(e))
            }
        }
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> ClientResult<UserProfile> {
        self.begin();
        match self.inner.gateway.sign_up(email, password).await {
            Ok(response) => {
                tracing::info!("Signed up as {}", response.user.id);
                Ok(self.establish(response))
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Local state is cleared whether or not the server call succeeds.
    pub async fn sign_out(&self) -> ClientResult<()> {
        self.stop_timeout();
        self.begin();

        let result = self.inner.gateway.sign_out().await;
        if let Err(e) = &result {
            tracing::warn!("Remote sign-out failed: {}", e);
        }
        self.clear_local(result.as_ref().err().cloned());
        result
    }

    pub async fn refresh(&self) -> ClientResult<()> {
        self.begin();
        match self.inner.gateway.refresh().await {
            Ok(response) => {
                self.establish(response);
                Ok(())
            }
            Err(e) if e.code == ErrorCode::Unauthorized => {
                self.clear_local(Some(e.clone()));
                Err(e)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    pub async fn reset_password(&self, email: &str) -> ClientResult<()> {
        self.begin();
        match self.inner.gateway.request_password_reset(email).await {
            Ok(()) => {
                self.finish();
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    pub async fn confirm_password_reset(&self, token: &str, password: &str) -> ClientResult<()> {
        self.begin();
        match self
            .inner
            .gateway
            .confirm_password_reset(token, password)
            .await
        {
            Ok(()) => {
                self.finish();
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Record user activity, pushing the inactivity deadline forward.
    pub fn touch(&self) {
        if !self.inner.state.borrow().is_authenticated {
            return;
        }
        {
            let mut deadline = lock(&self.inner.deadline);
            if deadline.is_none() {
                return;
            }
            *deadline = Some(Instant::now() + self.inner.session_timeout);
        }
        let wall = wall_deadline(self.inner.session_timeout);
        self.inner.state.send_modify(|s| s.session_deadline = wall);
    }

    pub fn clear_error(&self) {
        self.transition(|s| s.error = None);
    }
}
