pub mod assets;
pub mod auth;
pub mod client;
pub mod error;
pub mod projects;
pub mod users;

pub use client::{API_PREFIX, HttpTransport};
pub use error::{ApiError, ErrorBody, FALLBACK_MESSAGE};

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::config::ClientConfig;
use crate::session::Session;

/// One handle per remote resource, all sharing a single transport.
#[derive(Clone)]
pub struct ApiClient {
    pub transport: Arc<HttpTransport>,
    pub auth: auth::AuthApi,
    pub projects: projects::ProjectApi,
    pub assets: assets::AssetApi,
    pub users: users::UserApi,
}

impl ApiClient {
    pub fn new(base_url: &str, session: Session) -> Result<Self> {
        let transport = HttpTransport::new(base_url, session, None)
            .context("Failed to build HTTP client")?;
        Ok(Self::with_transport(transport))
    }

    pub fn from_config(config: &ClientConfig, session: Session) -> Result<Self> {
        let transport = HttpTransport::new(&config.api_base_url, session, config.request_timeout())
            .context("Failed to build HTTP client")?
            .with_upload_chunk_bytes(config.upload_chunk_bytes);
        Ok(Self::with_transport(transport))
    }

    pub fn with_transport(transport: HttpTransport) -> Self {
        let transport = Arc::new(transport);
        Self {
            auth: auth::AuthApi::new(transport.clone()),
            projects: projects::ProjectApi::new(transport.clone()),
            assets: assets::AssetApi::new(transport.clone()),
            users: users::UserApi::new(transport.clone()),
            transport,
        }
    }

    pub fn session(&self) -> &Session {
        self.transport.session()
    }
}
