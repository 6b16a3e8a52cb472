use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Method};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, instrument};

use super::client::HttpTransport;
use super::error::ApiError;
use crate::domain::Envelope;
use crate::domain::asset::{Asset, AssetId};
use crate::domain::media::UploadFile;
use crate::domain::project::ProjectId;
use crate::services::gateway::{AssetGateway, Uploader};

#[derive(Clone)]
pub struct AssetApi {
    transport: Arc<HttpTransport>,
}

impl AssetApi {
    pub fn new(transport: Arc<HttpTransport>) -> Self {
        Self { transport }
    }

    #[instrument(skip(self))]
    pub async fn list_for_project(&self, project_id: ProjectId) -> Result<Vec<Asset>, ApiError> {
        let path = format!("/projects/{}/assets", project_id);
        let envelope: Envelope<Vec<Asset>> = self.transport.get_json(&path).await?;
        Ok(envelope.data)
    }

    #[instrument(skip(self))]
    pub async fn list_for_user(&self) -> Result<Vec<Asset>, ApiError> {
        let envelope: Envelope<Vec<Asset>> = self.transport.get_json("/users/assets").await?;
        Ok(envelope.data)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: AssetId) -> Result<(), ApiError> {
        let path = format!("/assets/{}", id);
        let builder = self.transport.request(Method::DELETE, &path);
        self.transport.send_discard(&path, builder).await
    }

    /// `POST /projects/:id/assets` with the whole file as the multipart `file`
    /// field. The body is streamed in chunks so that each chunk handed to the
    /// connection produces a progress percentage.
    #[instrument(skip(self, file, progress), fields(file = %file.name(), bytes = file.len()))]
    pub async fn upload(
        &self,
        project_id: ProjectId,
        file: &UploadFile,
        progress: mpsc::UnboundedSender<u8>,
    ) -> Result<(), ApiError> {
        let path = format!("/projects/{}/assets", project_id);
        let total = file.len() as u64;
        let chunks: Vec<Vec<u8>> = file
            .bytes()
            .chunks(self.transport.upload_chunk_bytes())
            .map(<[u8]>::to_vec)
            .collect();

        let mut sent = 0u64;
        let stream = futures::stream::iter(chunks.into_iter().map(move |chunk| {
            sent += chunk.len() as u64;
            // The receiver may already be gone; progress is advisory.
            let _ = progress.send(percent_of(sent, total));
            Ok::<_, std::io::Error>(chunk)
        }));

        let part = Part::stream_with_length(Body::wrap_stream(stream), total)
            .file_name(file.name().to_string());
        let form = Form::new().part("file", part);

        let builder = self.transport.request(Method::POST, &path).multipart(form);
        self.transport.send_discard(&path, builder).await?;
        debug!(project_id, "Upload accepted");
        Ok(())
    }
}

fn percent_of(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    ((sent.min(total) * 100) / total) as u8
}

#[async_trait]
impl AssetGateway for AssetApi {
    async fn list_project_assets(&self, project_id: ProjectId) -> Result<Vec<Asset>, ApiError> {
        self.list_for_project(project_id).await
    }

    async fn list_user_assets(&self) -> Result<Vec<Asset>, ApiError> {
        self.list_for_user().await
    }

    async fn delete_asset(&self, id: AssetId) -> Result<(), ApiError> {
        self.delete(id).await
    }
}

#[async_trait]
impl Uploader for AssetApi {
    async fn upload(
        &self,
        project_id: ProjectId,
        file: &UploadFile,
        progress: mpsc::UnboundedSender<u8>,
    ) -> Result<(), ApiError> {
        AssetApi::upload(self, project_id, file, progress).await
    }
}
