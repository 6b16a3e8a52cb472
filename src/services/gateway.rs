//! Remote capabilities the services depend on. The HTTP endpoints in
//! [`crate::api`] implement them; tests substitute mocks.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tokio::sync::mpsc;

use crate::api::ApiError;
use crate::domain::asset::{Asset, AssetId};
use crate::domain::media::UploadFile;
use crate::domain::project::{NewProject, Project, ProjectId, ProjectPatch};
use crate::domain::user::{AuthResponse, LoginRequest, RegisterRequest, User, UserStats};

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ProjectGateway: Send + Sync {
    async fn list_projects(&self) -> Result<Vec<Project>, ApiError>;

    /// `Ok(None)` when the project does not exist.
    async fn get_project(&self, id: ProjectId) -> Result<Option<Project>, ApiError>;

    async fn create_project(&self, project: &NewProject) -> Result<(), ApiError>;

    async fn update_project(&self, id: ProjectId, patch: &ProjectPatch) -> Result<(), ApiError>;

    async fn delete_project(&self, id: ProjectId) -> Result<(), ApiError>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait AssetGateway: Send + Sync {
    async fn list_project_assets(&self, project_id: ProjectId) -> Result<Vec<Asset>, ApiError>;

    /// Every asset the current user can see, across projects.
    async fn list_user_assets(&self) -> Result<Vec<Asset>, ApiError>;

    async fn delete_asset(&self, id: AssetId) -> Result<(), ApiError>;
}

/// Uploads one whole file in a single request. Transfer progress (0-100) is
/// pushed on `progress` while the request is in flight; the returned future
/// resolves once the server has answered.
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(
        &self,
        project_id: ProjectId,
        file: &UploadFile,
        progress: mpsc::UnboundedSender<u8>,
    ) -> Result<(), ApiError>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait AuthGateway: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError>;

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError>;

    /// Invalidates the current credential server-side.
    async fn logout(&self) -> Result<(), ApiError>;

    /// `Ok(None)` when no credential is held.
    async fn current_user(&self) -> Result<Option<User>, ApiError>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn search_by_email(&self, email: &str) -> Result<Vec<User>, ApiError>;

    async fn stats(&self) -> Result<UserStats, ApiError>;
}
