use async_trait::async_trait;
use reqwest::Method;
use std::sync::Arc;
use tracing::instrument;

use super::client::HttpTransport;
use super::error::ApiError;
use crate::domain::Envelope;
use crate::domain::user::{User, UserStats};
use crate::services::gateway::UserDirectory;

#[derive(Clone)]
pub struct UserApi {
    transport: Arc<HttpTransport>,
}

impl UserApi {
    pub fn new(transport: Arc<HttpTransport>) -> Self {
        Self { transport }
    }

    /// `GET /users?email=`; an empty filter lists without the parameter.
    #[instrument(skip(self))]
    pub async fn search(&self, email: &str) -> Result<Vec<User>, ApiError> {
        let mut builder = self.transport.request(Method::GET, "/users");
        if !email.is_empty() {
            builder = builder.query(&[("email", email)]);
        }
        let envelope: Envelope<Vec<User>> = self.transport.send_json("/users", builder).await?;
        Ok(envelope.data)
    }

    #[instrument(skip(self))]
    pub async fn stats(&self) -> Result<UserStats, ApiError> {
        self.transport.get_json("/users/stats").await
    }
}

#[async_trait]
impl UserDirectory for UserApi {
    async fn search_by_email(&self, email: &str) -> Result<Vec<User>, ApiError> {
        self.search(email).await
    }

    async fn stats(&self) -> Result<UserStats, ApiError> {
        UserApi::stats(self).await
    }
}
