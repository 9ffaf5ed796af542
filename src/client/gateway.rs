use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::sync::{Arc, PoisonError, RwLock};

use super::error::{ClientError, ClientResult};
use super::storage::LocalStorage;
use crate::error::{AppError, ErrorBody, ErrorCode};
use crate::models::{
    AuthResponse, AuthSession, CreateExerciseSet, CreateWorkoutSession, Exercise, ExerciseSet,
    Page, SessionDetail, SessionWithTotals, Stats, SummaryResponse, UpdateExerciseSet,
    UpdateWorkoutSession, UserProfile, WorkoutSession,
};
use crate::validation::{
    validate_date_range, validate_email, validate_new_session, validate_new_set,
    validate_pagination, validate_password, validate_session_update, validate_set_update,
};

/// Authentication calls the auth core depends on.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> ClientResult<AuthResponse>;
    async fn sign_in(&self, email: &str, password: &str) -> ClientResult<AuthResponse>;
    async fn sign_out(&self) -> ClientResult<()>;
    async fn current_user(&self) -> ClientResult<UserProfile>;
    async fn refresh(&self) -> ClientResult<AuthResponse>;
    async fn request_password_reset(&self, email: &str) -> ClientResult<()>;
    async fn confirm_password_reset(&self, token: &str, password: &str) -> ClientResult<()>;
}

/// Calls the summary orchestrator depends on.
#[async_trait]
pub trait SummaryGateway: Send + Sync {
    async fn current_user(&self) -> ClientResult<UserProfile>;
    async fn get_session(&self, id: &str) -> ClientResult<SessionDetail>;
    async fn generate_summary(&self, session_id: &str) -> ClientResult<SummaryResponse>;
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
struct RangeQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    from: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    to: Option<DateTime<Utc>>,
}

/// Storage key of the gateway's own bearer session.
pub const SESSION_KEY: &str = "gymlog.session";

/// Typed access to the HTTP API. Inputs are validated before any request
/// goes out, and error bodies come back as [`ClientError`].
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    token: RwLock<Option<String>>,
    session_storage: Option<Arc<dyn LocalStorage>>,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: RwLock::new(None),
            session_storage: None,
        }
    }

    /// Keep the bearer session in `storage` so a gateway built later over
    /// the same storage resumes it. An unexpired stored session is picked
    /// up immediately.
    pub fn with_session_storage(mut self, storage: Arc<dyn LocalStorage>) -> Self {
        let stored = storage
            .get_item(SESSION_KEY)
            .and_then(|raw| serde_json::from_str::<AuthSession>(&raw).ok());
        match stored {
            Some(session) if session.expires_at > Utc::now() => {
                tracing::debug!("Resuming stored session");
                *self.token.get_mut().unwrap_or_else(PoisonError::into_inner) =
                    Some(session.access_token);
            }
            Some(_) => {
                tracing::debug!("Discarding expired stored session");
                Self::discard(storage.as_ref());
            }
            None => {}
        }
        self.session_storage = Some(storage);
        self
    }

    pub fn access_token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_access_token(&self, token: Option<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match self.access_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn check(response: Response) -> ClientResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => Err(body.into()),
            Err(_) => {
                tracing::warn!("Unexpected error response ({}): {}", status, text);
                Err(ClientError::unknown())
            }
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ClientResult<T> {
        let response = Self::check(builder.send().await?).await?;
        Ok(response.json::<T>().await?)
    }

    async fn send_empty(&self, builder: RequestBuilder) -> ClientResult<()> {
        Self::check(builder.send().await?).await?;
        Ok(())
    }

    fn remember(&self, response: &AuthResponse) {
        self.set_access_token(Some(response.session.access_token.clone()));
        let Some(storage) = &self.session_storage else {
            return;
        };
        match serde_json::to_string(&response.session) {
            Ok(raw) => {
                if let Err(e) = storage.set_item(SESSION_KEY, &raw) {
                    tracing::warn!("Failed to store session: {}", e);
                }
            }
            Err(e) => tracing::warn!("Failed to encode session: {}", e),
        }
    }

    fn forget(&self) {
        self.set_access_token(None);
        if let Some(storage) = &self.session_storage {
            Self::discard(storage.as_ref());
        }
    }

    fn discard(storage: &dyn LocalStorage) {
        if let Err(e) = storage.remove_item(SESSION_KEY) {
            tracing::warn!("Failed to remove stored session: {}", e);
        }
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> ClientResult<AuthResponse> {
        validate_email(email)?;
        validate_password(password)?;

        let response: AuthResponse = self
            .send(
                self.request(Method::POST, "/auth/signup")
                    .json(&json!({ "email": email, "password": password })),
            )
            .await?;
        self.remember(&response);
        Ok(response)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> ClientResult<AuthResponse> {
        validate_email(email)?;
        if password.is_empty() {
            return Err(AppError::Validation("Password is required".to_string()).into());
        }

        let response: AuthResponse = self
            .send(
                self.request(Method::POST, "/auth/signin")
                    .json(&json!({ "email": email, "password": password })),
            )
            .await?;
        self.remember(&response);
        Ok(response)
    }

    /// The local token is dropped even when the server call fails.
    pub async fn sign_out(&self) -> ClientResult<()> {
        if self.access_token().is_none() {
            return Ok(());
        }
        let result = self
            .send_empty(self.request(Method::POST, "/auth/signout"))
            .await;
        self.forget();
        result
    }

    /// A token the server no longer accepts is dropped along with its
    /// stored copy.
    pub async fn current_user(&self) -> ClientResult<UserProfile> {
        let result = self.send(self.request(Method::GET, "/auth/user")).await;
        if let Err(e) = &result {
            if e.code == ErrorCode::Unauthorized && self.access_token().is_some() {
                self.forget();
            }
        }
        result
    }

    pub async fn refresh(&self) -> ClientResult<AuthResponse> {
        let response: AuthResponse = self
            .send(self.request(Method::POST, "/auth/refresh"))
            .await?;
        self.remember(&response);
        Ok(response)
    }

    pub async fn request_password_reset(&self, email: &str) -> ClientResult<()> {
        validate_email(email)?;
        self.send_empty(
            self.request(Method::POST, "/auth/reset-password")
                .json(&json!({ "email": email })),
        )
        .await
    }

    pub async fn confirm_password_reset(&self, token: &str, password: &str) -> ClientResult<()> {
        validate_password(password)?;
        self.send_empty(
            self.request(Method::POST, "/auth/reset-password/confirm")
                .json(&json!({ "token": token, "password": password })),
        )
        .await
    }

    pub async fn list_sessions(
        &self,
        query: &SessionQuery,
    ) -> ClientResult<Page<SessionWithTotals>> {
        validate_pagination(query.page.unwrap_or(1), query.per_page.unwrap_or(10))?;
        validate_date_range(query.from, query.to)?;
        self.send(self.request(Method::GET, "/sessions").query(query))
            .await
    }

    pub async fn get_session(&self, id: &str) -> ClientResult<SessionDetail> {
        self.send(self.request(Method::GET, &format!("/sessions/{}", id)))
            .await
    }

    pub async fn create_session(
        &self,
        input: &CreateWorkoutSession,
    ) -> ClientResult<WorkoutSession> {
        validate_new_session(input)?;
        self.send(self.request(Method::POST, "/sessions").json(input))
            .await
    }

    pub async fn update_session(
        &self,
        id: &str,
        input: &UpdateWorkoutSession,
    ) -> ClientResult<WorkoutSession> {
        validate_session_update(input)?;
        self.send(
            self.request(Method::PUT, &format!("/sessions/{}", id))
                .json(input),
        )
        .await
    }

    pub async fn delete_session(&self, id: &str) -> ClientResult<()> {
        self.send_empty(self.request(Method::DELETE, &format!("/sessions/{}", id)))
            .await
    }

    pub async fn add_set(
        &self,
        session_id: &str,
        input: &CreateExerciseSet,
    ) -> ClientResult<ExerciseSet> {
        validate_new_set(input)?;
        self.send(
            self.request(Method::POST, &format!("/sessions/{}/sets", session_id))
                .json(input),
        )
        .await
    }

    pub async fn update_set(
        &self,
        session_id: &str,
        set_id: &str,
        input: &UpdateExerciseSet,
    ) -> ClientResult<ExerciseSet> {
        validate_set_update(input)?;
        self.send(
            self.request(
                Method::PUT,
                &format!("/sessions/{}/sets/{}", session_id, set_id),
            )
            .json(input),
        )
        .await
    }

    pub async fn delete_set(&self, session_id: &str, set_id: &str) -> ClientResult<()> {
        self.send_empty(self.request(
            Method::DELETE,
            &format!("/sessions/{}/sets/{}", session_id, set_id),
        ))
        .await
    }

    pub async fn list_exercises(&self) -> ClientResult<Vec<Exercise>> {
        self.send(self.request(Method::GET, "/exercises")).await
    }

    pub async fn stats(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> ClientResult<Stats> {
        validate_date_range(from, to)?;
        self.send(
            self.request(Method::GET, "/stats")
                .query(&RangeQuery { from, to }),
        )
        .await
    }

    pub async fn generate_summary(&self, session_id: &str) -> ClientResult<SummaryResponse> {
        if session_id.trim().is_empty() {
            return Err(AppError::Validation("Session id is required".to_string()).into());
        }
        self.send(
            self.request(Method::POST, "/functions/generate-summary")
                .json(&json!({ "session_id": session_id })),
        )
        .await
    }
}

#[async_trait]
impl AuthGateway for HttpGateway {
    async fn sign_up(&self, email: &str, password: &str) -> ClientResult<AuthResponse> {
        HttpGateway::sign_up(self, email, password).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> ClientResult<AuthResponse> {
        HttpGateway::sign_in(self, email, password).await
    }

    async fn sign_out(&self) -> ClientResult<()> {
        HttpGateway::sign_out(self).await
    }

    async fn current_user(&self) -> ClientResult<UserProfile> {
        HttpGateway::current_user(self).await
    }

    async fn refresh(&self) -> ClientResult<AuthResponse> {
        HttpGateway::refresh(self).await
    }

    async fn request_password_reset(&self, email: &str) -> ClientResult<()> {
        HttpGateway::request_password_reset(self, email).await
    }

    async fn confirm_password_reset(&self, token: &str, password: &str) -> ClientResult<()> {
        HttpGateway::confirm_password_reset(self, token, password).await
    }
}

#[async_trait]
impl SummaryGateway for HttpGateway {
    async fn current_user(&self) -> ClientResult<UserProfile> {
        HttpGateway::current_user(self).await
    }

    async fn get_session(&self, id: &str) -> ClientResult<SessionDetail> {
        HttpGateway::get_session(self, id).await
    }

    async fn generate_summary(&self, session_id: &str) -> ClientResult<SummaryResponse> {
        HttpGateway::generate_summary(self, session_id).await
    }
}
