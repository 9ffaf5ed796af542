use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::error::{ClientError, ClientResult};
use super::gateway::SummaryGateway;
use super::storage::lock;
use super::ClientConfig;
use crate::error::{AppError, ErrorCode};
use crate::models::GenerationStatus;

#[derive(Debug, Clone, PartialEq)]
pub enum SummaryStatus {
    Idle,
    Pending { session_id: String },
    Generating { session_id: String },
    Completed { session_id: String, summary: String },
    Failed { session_id: String, error: ClientError },
}

struct PendingRequest {
    ticket: u64,
    task: JoinHandle<()>,
}

/// Debounces summary requests per session and runs at most one generation
/// call per request, under a hard timeout.
#[derive(Clone)]
pub struct SummaryOrchestrator {
    inner: Arc<OrchestratorInner>,
}

struct OrchestratorInner {
    gateway: Arc<dyn SummaryGateway>,
    debounce: Duration,
    timeout: Duration,
    pending: Mutex<HashMap<String, PendingRequest>>,
    next_ticket: AtomicU64,
    status: watch::Sender<SummaryStatus>,
}

impl Drop for OrchestratorInner {
    fn drop(&mut self) {
        for (_, request) in lock(&self.pending).drain() {
            request.task.abort();
        }
    }
}

impl SummaryOrchestrator {
    pub fn new(gateway: Arc<dyn SummaryGateway>, config: &ClientConfig) -> Self {
        let (status, _) = watch::channel(SummaryStatus::Idle);
        Self {
            inner: Arc::new(OrchestratorInner {
                gateway,
                debounce: config.summary_debounce,
                timeout: config.summary_timeout,
                pending: Mutex::new(HashMap::new()),
                next_ticket: AtomicU64::new(0),
                status,
            }),
        }
    }

    pub fn status(&self) -> SummaryStatus {
        self.inner.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SummaryStatus> {
        self.inner.status.subscribe()
    }

    pub fn is_pending(&self, session_id: &str) -> bool {
        lock(&self.inner.pending).contains_key(session_id)
    }

    /// Schedule generation after the debounce delay. A later request for the
    /// same session replaces this one.
    pub fn request(&self, session_id: &str) {
        let ticket = self.inner.next_ticket.fetch_add(1, Ordering::Relaxed);
        let weak = Arc::downgrade(&self.inner);
        let debounce = self.inner.debounce;
        let id = session_id.to_string();

        // Held across the spawn so the task cannot look itself up too early
        let mut pending = lock(&self.inner.pending);
        let task = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            {
                let mut pending = lock(&inner.pending);
                if pending.get(&id).map(|p| p.ticket) != Some(ticket) {
                    return;
                }
                pending.remove(&id);
            }

            let orchestrator = SummaryOrchestrator { inner };
            if let Err(e) = orchestrator.generate_now(&id).await {
                tracing::debug!("Debounced summary for {} not generated: {}", id, e);
            }
        });

        let previous = pending.insert(session_id.to_string(), PendingRequest { ticket, task });
        if let Some(previous) = previous {
            tracing::debug!("Superseding pending summary request for {}", session_id);
            previous.task.abort();
        }
        drop(pending);

        self.inner.status.send_replace(SummaryStatus::Pending {
            session_id: session_id.to_string(),
        });
    }

    pub fn cancel(&self, session_id: &str) {
        let removed = lock(&self.inner.pending).remove(session_id);
        if let Some(request) = removed {
            request.task.abort();
            self.inner.status.send_if_modified(|status| match status {
                SummaryStatus::Pending { session_id: id } if id == session_id => {
                    *status = SummaryStatus::Idle;
                    true
                }
                _ => false,
            });
        }
    }

    pub fn cancel_all(&self) {
        let drained: Vec<PendingRequest> = lock(&self.inner.pending)
            .drain()
            .map(|(_, request)| request)
            .collect();
        for request in drained {
            request.task.abort();
        }
        self.inner.status.send_if_modified(|status| {
            if matches!(status, SummaryStatus::Pending { .. }) {
                *status = SummaryStatus::Idle;
                true
            } else {
                false
            }
        });
    }

    /// Run the refusal checks, then generate immediately.
    pub async fn generate_now(&self, session_id: &str) -> ClientResult<String> {
        let result = self.run(session_id).await;
        let status = match &result {
            Ok(summary) => SummaryStatus::Completed {
                session_id: session_id.to_string(),
                summary: summary.clone(),
            },
            Err(error) => SummaryStatus::Failed {
                session_id: session_id.to_string(),
                error: error.clone(),
            },
        };
        self.inner.status.send_replace(status);
        result
    }

    fn is_running(&self, since: DateTime<Utc>) -> bool {
        match chrono::Duration::from_std(self.inner.timeout) {
            Ok(timeout) => Utc::now() - since < timeout,
            Err(_) => true,
        }
    }

    async fn run(&self, session_id: &str) -> ClientResult<String> {
        let gateway = &self.inner.gateway;

        let user = gateway.current_user().await.map_err(|e| {
            if e.code == ErrorCode::Unauthorized {
                ClientError::new(ErrorCode::Unauthorized, "Sign in to generate summaries")
            } else {
                e
            }
        })?;

        // Sessions of other users read as missing. The function call below
        // then answers forbidden or not found on its own.
        match gateway.get_session(session_id).await {
            Ok(detail) => {
                if detail.session.user_id != user.id {
                    return Err(AppError::Forbidden(
                        "You can only summarize your own workouts".to_string(),
                    )
                    .into());
                }
                if detail.session.summary.is_some() {
                    return Err(AppError::AlreadySummarized.into());
                }
            }
            Err(e) if e.code == ErrorCode::NotFound => {
                tracing::debug!("Session {} not visible, deferring to the server", session_id);
            }
            Err(e) => return Err(e),
        }
        if let Some(since) = user.generating_since {
            if self.is_running(since) {
                return Err(AppError::GenerationInProgress.into());
            }
        }

        self.inner.status.send_replace(SummaryStatus::Generating {
            session_id: session_id.to_string(),
        });
        tracing::debug!("Requesting summary for {}", session_id);

        let call = gateway.generate_summary(session_id);
        let response = tokio::time::timeout(self.inner.timeout, call)
            .await
            .map_err(|_| {
                tracing::warn!(
                    "Summary for {} not returned within {:?}",
                    session_id,
                    self.inner.timeout
                );
                ClientError::timeout()
            })??;

        match response.status {
            GenerationStatus::Completed => response.summary.ok_or_else(ClientError::unknown),
            GenerationStatus::Failed => Err(response
                .error
                .map(ClientError::from)
                .unwrap_or_else(ClientError::unknown)),
        }
    }
}
