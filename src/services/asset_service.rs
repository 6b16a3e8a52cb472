use std::sync::Arc;
use tracing::{debug, instrument};

use super::error_handling::{AppError, AppResult, LogHelper};
use super::gateway::{AssetGateway, Uploader};
use super::list_state::ListState;
use super::upload_orchestrator::{UploadObserver, UploadOrchestrator, UploadSummary};
use crate::domain::asset::{Asset, AssetId, AssetStats};
use crate::domain::media::UploadFile;
use crate::domain::project::ProjectId;

pub const ASSET_DELETED: &str = "Asset deleted.";
pub const PROJECT_REQUIRED_FOR_UPLOAD: &str = "Choose a project before uploading.";

/// Which listing backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetScope {
    Project(ProjectId),
    /// Every asset visible to the signed-in user, across projects.
    Mine,
}

pub struct AssetService {
    gateway: Arc<dyn AssetGateway>,
    orchestrator: UploadOrchestrator,
    scope: AssetScope,
    assets: ListState<Asset>,
}

impl AssetService {
    pub fn new(gateway: Arc<dyn AssetGateway>, uploader: Arc<dyn Uploader>, scope: AssetScope) -> Self {
        Self {
            orchestrator: UploadOrchestrator::new(uploader, gateway.clone()),
            gateway,
            scope,
            assets: ListState::new(),
        }
    }

    pub fn scope(&self) -> AssetScope {
        self.scope
    }

    pub fn assets(&self) -> &ListState<Asset> {
        &self.assets
    }

    pub fn assets_mut(&mut self) -> &mut ListState<Asset> {
        &mut self.assets
    }

    pub fn orchestrator(&self) -> &UploadOrchestrator {
        &self.orchestrator
    }

    pub fn stats(&self) -> AssetStats {
        AssetStats::from_assets(self.assets.items())
    }

    #[instrument(skip(self), fields(scope = ?self.scope))]
    pub async fn refresh(&mut self) -> AppResult<()> {
        let result = match self.scope {
            AssetScope::Project(project_id) => self.gateway.list_project_assets(project_id).await,
            AssetScope::Mine => self.gateway.list_user_assets().await,
        };
        let assets = result.map_err(|e| {
            LogHelper::log_request_failure("list_assets", &e);
            AppError::Request(e)
        })?;
        debug!(count = assets.len(), "Loaded assets");
        self.assets.set_items(assets);
        Ok(())
    }

    /// Resolves one asset, consulting the cross-project listing when it is
    /// not already loaded. `Ok(None)` when no such asset is visible.
    #[instrument(skip(self))]
    pub async fn find(&self, id: AssetId) -> AppResult<Option<Asset>> {
        if let Some(asset) = self.assets.get(id) {
            return Ok(Some(asset.clone()));
        }
        let assets = self.gateway.list_user_assets().await.map_err(|e| {
            LogHelper::log_request_failure("find_asset", &e);
            AppError::Request(e)
        })?;
        Ok(assets.into_iter().find(|a| a.id == id))
    }

    #[instrument(skip(self))]
    pub async fn delete(&mut self, id: AssetId) -> AppResult<()> {
        if let Err(e) = self.gateway.delete_asset(id).await {
            LogHelper::log_request_failure("delete_asset", &e);
            LogHelper::log_mutation("delete_asset", id, false);
            return Err(e.into());
        }
        self.assets.remove(id);
        LogHelper::log_mutation("delete_asset", id, true);
        Ok(())
    }

    /// Uploads into the scoped project and reloads the list on success.
    pub async fn upload(
        &mut self,
        files: Vec<UploadFile>,
        observer: &dyn UploadObserver,
    ) -> AppResult<UploadSummary> {
        let AssetScope::Project(project_id) = self.scope else {
            return Err(AppError::validation(PROJECT_REQUIRED_FOR_UPLOAD));
        };
        self.orchestrator
            .upload_batch(project_id, files, &mut self.assets, observer)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::domain::asset::fixtures::asset;
    use crate::services::gateway::MockAssetGateway;
    use async_trait::async_trait;
    use mockall::predicate::eq;
    use tokio::sync::mpsc;

    struct NoUploads;

    #[async_trait]
    impl Uploader for NoUploads {
        async fn upload(
            &self,
            _project_id: ProjectId,
            _file: &UploadFile,
            _progress: mpsc::UnboundedSender<u8>,
        ) -> Result<(), ApiError> {
            panic!("no upload expected");
        }
    }

    fn service(gateway: MockAssetGateway, scope: AssetScope) -> AssetService {
        AssetService::new(Arc::new(gateway), Arc::new(NoUploads), scope)
    }

    #[tokio::test]
    async fn test_refresh_uses_scope() {
        let mut gateway = MockAssetGateway::new();
        gateway
            .expect_list_project_assets()
            .with(eq(4))
            .times(1)
            .returning(|_| Ok(vec![asset(1, "a.png"), asset(2, "clip.mp4")]));
        gateway.expect_list_user_assets().never();
        let mut assets = service(gateway, AssetScope::Project(4));

        assets.refresh().await.unwrap();
        let stats = assets.stats();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.images, 1);
        assert_eq!(stats.videos, 1);
    }

    #[tokio::test]
    async fn test_refresh_mine() {
        let mut gateway = MockAssetGateway::new();
        gateway
            .expect_list_user_assets()
            .times(1)
            .returning(|| Ok(vec![asset(9, "logo.svg")]));
        let mut assets = service(gateway, AssetScope::Mine);

        assets.refresh().await.unwrap();
        assert_eq!(assets.assets().items()[0].id, 9);
    }

    #[tokio::test]
    async fn test_delete_removes_by_identity() {
        let mut gateway = MockAssetGateway::new();
        gateway
            .expect_delete_asset()
            .with(eq(2))
            .times(1)
            .returning(|_| Ok(()));
        let mut assets = service(gateway, AssetScope::Mine);
        assets
            .assets_mut()
            .set_items(vec![asset(1, "a.png"), asset(2, "b.png")]);

        assets.delete(2).await.unwrap();
        assert!(assets.assets().get(2).is_none());
        assert_eq!(assets.assets().items().len(), 1);
    }

    #[tokio::test]
    async fn test_find_falls_back_to_listing() {
        let mut gateway = MockAssetGateway::new();
        gateway
            .expect_list_user_assets()
            .times(2)
            .returning(|| Ok(vec![asset(7, "hero.webp")]));
        let assets = service(gateway, AssetScope::Mine);

        assert_eq!(assets.find(7).await.unwrap().map(|a| a.id), Some(7));
        assert!(assets.find(8).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upload_requires_project_scope() {
        let mut assets = service(MockAssetGateway::new(), AssetScope::Mine);
        let err = assets
            .upload(vec![UploadFile::new("a.png", vec![1])], &())
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), PROJECT_REQUIRED_FOR_UPLOAD);
    }
}
