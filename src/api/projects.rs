use async_trait::async_trait;
use reqwest::Method;
use std::sync::Arc;
use tracing::instrument;

use super::client::HttpTransport;
use super::error::ApiError;
use crate::domain::Envelope;
use crate::domain::project::{NewProject, Project, ProjectId, ProjectPatch};
use crate::services::gateway::ProjectGateway;

#[derive(Clone)]
pub struct ProjectApi {
    transport: Arc<HttpTransport>,
}

impl ProjectApi {
    pub fn new(transport: Arc<HttpTransport>) -> Self {
        Self { transport }
    }

    /// `GET /projects`, including the server-computed `assets_count` and `creator_name`.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Project>, ApiError> {
        let envelope: Envelope<Vec<Project>> = self.transport.get_json("/projects").await?;
        Ok(envelope.data)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: ProjectId) -> Result<Option<Project>, ApiError> {
        let path = format!("/projects/{}", id);
        match self.transport.get_json::<Envelope<Project>>(&path).await {
            Ok(envelope) => Ok(Some(envelope.data)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, project), fields(name = %project.name))]
    pub async fn create(&self, project: &NewProject) -> Result<(), ApiError> {
        let builder = self.transport.request(Method::POST, "/projects").json(project);
        self.transport.send_discard("/projects", builder).await
    }

    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: ProjectId, patch: &ProjectPatch) -> Result<(), ApiError> {
        let path = format!("/projects/{}", id);
        let builder = self.transport.request(Method::PATCH, &path).json(patch);
        self.transport.send_discard(&path, builder).await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: ProjectId) -> Result<(), ApiError> {
        let path = format!("/projects/{}", id);
        let builder = self.transport.request(Method::DELETE, &path);
        self.transport.send_discard(&path, builder).await
    }
}

#[async_trait]
impl ProjectGateway for ProjectApi {
    async fn list_projects(&self) -> Result<Vec<Project>, ApiError> {
        self.list().await
    }

    async fn get_project(&self, id: ProjectId) -> Result<Option<Project>, ApiError> {
        self.get(id).await
    }

    async fn create_project(&self, project: &NewProject) -> Result<(), ApiError> {
        self.create(project).await
    }

    async fn update_project(&self, id: ProjectId, patch: &ProjectPatch) -> Result<(), ApiError> {
        self.update(id, patch).await
    }

    async fn delete_project(&self, id: ProjectId) -> Result<(), ApiError> {
        self.delete(id).await
    }
}
