use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

use super::error::{ApiError, ErrorBody};
use crate::session::Session;

pub const API_PREFIX: &str = "/api/v1";

const DEFAULT_UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

/// Shared request layer. Attaches `Authorization: Bearer <token>` whenever the
/// session holds a credential and maps failures into [`ApiError`].
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    session: Session,
    upload_chunk_bytes: usize,
}

impl HttpTransport {
    pub fn new(base_url: &str, session: Session, timeout: Option<Duration>) -> reqwest::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
            upload_chunk_bytes: DEFAULT_UPLOAD_CHUNK_BYTES,
        })
    }

    pub fn with_upload_chunk_bytes(mut self, bytes: usize) -> Self {
        self.upload_chunk_bytes = bytes.max(1);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn upload_chunk_bytes(&self) -> usize {
        self.upload_chunk_bytes
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, API_PREFIX, path)
    }

    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match self.session.read() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub async fn send(&self, path: &str, builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = builder.send().await.map_err(|source| {
            warn!(path, error = %source, "Request did not complete");
            ApiError::Transport {
                path: path.to_string(),
                source,
            }
        })?;

        let status = response.status();
        if status.is_success() {
            debug!(path, status = status.as_u16(), "Request succeeded");
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let body = serde_json::from_str::<ErrorBody>(&text).ok();
        warn!(path, status = status.as_u16(), "Request rejected");
        Err(ApiError::rejected(path, status.as_u16(), body))
    }

    pub async fn send_json<T: DeserializeOwned>(
        &self,
        path: &str,
        builder: RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = self.send(path, builder).await?;
        let bytes = response.bytes().await.map_err(|source| ApiError::Transport {
            path: path.to_string(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| ApiError::Decode {
            path: path.to_string(),
            source,
        })
    }

    /// Sends the request and ignores whatever body comes back.
    pub async fn send_discard(&self, path: &str, builder: RequestBuilder) -> Result<(), ApiError> {
        self.send(path, builder).await.map(|_| ())
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send_json(path, self.request(Method::GET, path)).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(path, self.request(Method::POST, path).json(body))
            .await
    }
}
