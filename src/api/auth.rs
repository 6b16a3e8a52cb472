use async_trait::async_trait;
use reqwest::Method;
use std::sync::Arc;
use tracing::{debug, instrument};

use super::client::HttpTransport;
use super::error::ApiError;
use crate::domain::Envelope;
use crate::domain::user::{AuthResponse, LoginRequest, RegisterRequest, User};
use crate::services::gateway::AuthGateway;

/// Authentication endpoints. Returned tokens are handed back to the caller;
/// this layer never writes the session itself.
#[derive(Clone)]
pub struct AuthApi {
    transport: Arc<HttpTransport>,
}

impl AuthApi {
    pub fn new(transport: Arc<HttpTransport>) -> Self {
        Self { transport }
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        self.transport.post_json("/auth/register", request).await
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        self.transport.post_json("/auth/login", request).await
    }

    /// Does nothing when no credential is held.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), ApiError> {
        if self.transport.session().read().is_none() {
            debug!("No session credential, skipping remote logout");
            return Ok(());
        }
        let builder = self
            .transport
            .request(Method::POST, "/auth/logout")
            .json(&serde_json::json!({}));
        self.transport.send_discard("/auth/logout", builder).await
    }

    #[instrument(skip(self))]
    pub async fn me(&self) -> Result<Option<User>, ApiError> {
        if self.transport.session().read().is_none() {
            return Ok(None);
        }
        let envelope: Envelope<User> = self.transport.get_json("/me").await?;
        Ok(Some(envelope.data))
    }
}

#[async_trait]
impl AuthGateway for AuthApi {
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        AuthApi::login(self, request).await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        AuthApi::register(self, request).await
    }

    async fn logout(&self) -> Result<(), ApiError> {
        AuthApi::logout(self).await
    }

    async fn current_user(&self) -> Result<Option<User>, ApiError> {
        self.me().await
    }
}
