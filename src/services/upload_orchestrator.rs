use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{mpsc, watch};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::error_handling::{AppError, AppResult, LogHelper};
use super::gateway::{AssetGateway, Uploader};
use super::list_state::ListState;
use crate::domain::asset::Asset;
use crate::domain::media::UploadFile;
use crate::domain::project::ProjectId;

pub const UNSUPPORTED_FILE_MESSAGE: &str = "Unsupported file type. Upload images or videos only.";
pub const EMPTY_BATCH_MESSAGE: &str = "Select at least one file to upload.";
pub const UPLOAD_BUSY_MESSAGE: &str = "An upload is already in progress.";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UploadState {
    #[default]
    Idle,
    Validating {
        files: usize,
    },
    /// `current` is 1-based.
    Uploading {
        batch_id: Uuid,
        current: usize,
        total: usize,
        file_name: String,
        overall_percent: u8,
    },
    Succeeded {
        uploaded: usize,
        message: String,
    },
    Failed {
        uploaded: usize,
        message: String,
    },
}

/// Outcome of a batch whose files all reached the server.
#[derive(Debug)]
pub struct UploadSummary {
    pub batch_id: Uuid,
    pub uploaded: usize,
    pub message: String,
    /// The post-upload listing failed; the uploads themselves stand.
    pub refresh_error: Option<AppError>,
}

/// Receives every state transition of a batch, progress ticks included.
pub trait UploadObserver: Send + Sync {
    fn on_state(&self, state: &UploadState);
}

impl UploadObserver for () {
    fn on_state(&self, _state: &UploadState) {}
}

impl UploadObserver for mpsc::UnboundedSender<UploadState> {
    fn on_state(&self, state: &UploadState) {
        let _ = self.send(state.clone());
    }
}

/// `round(((completed + percent/100) / total) * 100)`, where `completed` files
/// are done and the in-flight one reports `percent`.
pub fn overall_progress(completed: usize, percent: u8, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let fraction = f64::from(percent.min(100)) / 100.0;
    let overall = ((completed as f64 + fraction) / total as f64) * 100.0;
    overall.round().clamp(0.0, 100.0) as u8
}

pub fn success_message(uploaded: usize) -> String {
    if uploaded == 1 {
        "Asset uploaded successfully.".to_string()
    } else {
        format!("{} assets uploaded successfully.", uploaded)
    }
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Validates a batch, uploads its files one at a time, then refreshes the
/// asset list from the server. At most one batch runs at a time.
pub struct UploadOrchestrator {
    uploader: Arc<dyn Uploader>,
    assets: Arc<dyn AssetGateway>,
    in_flight: AtomicBool,
    state: watch::Sender<UploadState>,
}

impl UploadOrchestrator {
    pub fn new(uploader: Arc<dyn Uploader>, assets: Arc<dyn AssetGateway>) -> Self {
        let (state, _) = watch::channel(UploadState::Idle);
        Self {
            uploader,
            assets,
            in_flight: AtomicBool::new(false),
            state,
        }
    }

    /// Latest state only; use an [`UploadObserver`] to see every tick.
    pub fn subscribe(&self) -> watch::Receiver<UploadState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> UploadState {
        self.state.borrow().clone()
    }

    pub fn is_uploading(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn publish(&self, observer: &dyn UploadObserver, state: UploadState) {
        observer.on_state(&state);
        self.state.send_replace(state);
    }

    fn fail(&self, observer: &dyn UploadObserver, uploaded: usize, error: AppError) -> AppError {
        self.publish(
            observer,
            UploadState::Failed {
                uploaded,
                message: error.user_message(),
            },
        );
        error
    }

    #[instrument(skip(self, files, list, observer), fields(files = files.len()))]
    pub async fn upload_batch(
        &self,
        project_id: ProjectId,
        files: Vec<UploadFile>,
        list: &mut ListState<Asset>,
        observer: &dyn UploadObserver,
    ) -> AppResult<UploadSummary> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!(project_id, "Upload rejected while another batch is running");
            return Err(AppError::Busy(UPLOAD_BUSY_MESSAGE));
        }
        let _guard = InFlight(&self.in_flight);

        let total = files.len();
        self.publish(observer, UploadState::Validating { files: total });

        if files.is_empty() {
            LogHelper::log_validation_failure("files", "empty batch");
            return Err(self.fail(observer, 0, AppError::validation(EMPTY_BATCH_MESSAGE)));
        }
        if let Some(file) = files.iter().find(|f| !f.kind().is_supported()) {
            LogHelper::log_validation_failure("files", &format!("unsupported type: {}", file.name()));
            return Err(self.fail(observer, 0, AppError::validation(UNSUPPORTED_FILE_MESSAGE)));
        }

        let batch_id = Uuid::new_v4();
        info!(%batch_id, project_id, total, "Starting upload batch");

        for (completed, file) in files.iter().enumerate() {
            let uploading = |percent: u8| UploadState::Uploading {
                batch_id,
                current: completed + 1,
                total,
                file_name: file.name().to_string(),
                overall_percent: overall_progress(completed, percent, total),
            };
            self.publish(observer, uploading(0));

            let (tx, mut rx) = mpsc::unbounded_channel();
            let upload = self.uploader.upload(project_id, file, tx);
            tokio::pin!(upload);

            let result = loop {
                tokio::select! {
                    biased;
                    Some(percent) = rx.recv() => {
                        LogHelper::log_upload_progress(&batch_id, completed + 1, total, percent);
                        self.publish(observer, uploading(percent));
                    }
                    result = &mut upload => break result,
                }
            };
            while let Ok(percent) = rx.try_recv() {
                self.publish(observer, uploading(percent));
            }

            if let Err(e) = result {
                LogHelper::log_request_failure("upload_asset", &e);
                return Err(self.fail(observer, completed, AppError::Request(e)));
            }
        }

        let message = success_message(total);
        info!(%batch_id, project_id, uploaded = total, "Upload batch finished");
        self.publish(
            observer,
            UploadState::Succeeded {
                uploaded: total,
                message: message.clone(),
            },
        );

        // Server-computed fields (thumbnails, counts) come from a fresh listing.
        let refresh_error = match self.assets.list_project_assets(project_id).await {
            Ok(items) => {
                list.set_items(items);
                None
            }
            Err(e) => {
                LogHelper::log_request_failure("refresh_assets", &e);
                Some(AppError::Request(e))
            }
        };

        Ok(UploadSummary {
            batch_id,
            uploaded: total,
            message,
            refresh_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, ErrorBody};
    use crate::domain::asset::fixtures::asset;
    use crate::services::gateway::MockAssetGateway;
    use async_trait::async_trait;
    use mockall::predicate::eq;
    use parking_lot::Mutex;
    use rstest::rstest;
    use std::collections::VecDeque;
    use tokio::sync::Semaphore;

    /// Replays a fixed outcome per call and records which files were sent.
    struct ScriptedUploader {
        ticks: Vec<u8>,
        outcomes: Mutex<VecDeque<Option<ErrorBody>>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedUploader {
        fn new(ticks: Vec<u8>, outcomes: Vec<Option<ErrorBody>>) -> Arc<Self> {
            Arc::new(Self {
                ticks,
                outcomes: Mutex::new(outcomes.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl Uploader for ScriptedUploader {
        async fn upload(
            &self,
            project_id: ProjectId,
            file: &UploadFile,
            progress: mpsc::UnboundedSender<u8>,
        ) -> Result<(), ApiError> {
            self.calls.lock().push(file.name().to_string());
            for tick in &self.ticks {
                let _ = progress.send(*tick);
            }
            match self.outcomes.lock().pop_front().flatten() {
                None => Ok(()),
                Some(body) => Err(ApiError::rejected(
                    format!("/projects/{}/assets", project_id),
                    422,
                    Some(body),
                )),
            }
        }
    }

    /// Blocks every upload until a permit is released.
    struct GatedUploader {
        gate: Arc<Semaphore>,
    }

    #[async_trait]
    impl Uploader for GatedUploader {
        async fn upload(
            &self,
            _project_id: ProjectId,
            _file: &UploadFile,
            _progress: mpsc::UnboundedSender<u8>,
        ) -> Result<(), ApiError> {
            let _permit = self.gate.acquire().await.unwrap();
            Ok(())
        }
    }

    fn file(name: &str) -> UploadFile {
        UploadFile::new(name, vec![0u8; 16])
    }

    fn refreshed_assets(project_id: ProjectId, items: Vec<Asset>) -> Arc<MockAssetGateway> {
        let mut assets = MockAssetGateway::new();
        assets
            .expect_list_project_assets()
            .with(eq(project_id))
            .times(1)
            .returning(move |_| Ok(items.clone()));
        Arc::new(assets)
    }

    #[rstest]
    #[case(0, 0, 3, 0)]
    #[case(0, 50, 2, 25)]
    #[case(1, 50, 3, 50)]
    #[case(1, 0, 3, 33)]
    #[case(2, 100, 3, 100)]
    #[case(0, 100, 1, 100)]
    fn test_overall_progress(
        #[case] completed: usize,
        #[case] percent: u8,
        #[case] total: usize,
        #[case] expected: u8,
    ) {
        assert_eq!(overall_progress(completed, percent, total), expected);
    }

    #[test]
    fn test_success_message_plurality() {
        assert_eq!(success_message(1), "Asset uploaded successfully.");
        assert_eq!(success_message(3), "3 assets uploaded successfully.");
    }

    #[tokio::test]
    async fn test_unsupported_file_rejects_whole_batch() {
        let uploader = ScriptedUploader::new(vec![], vec![]);
        let orchestrator = UploadOrchestrator::new(uploader.clone(), Arc::new(MockAssetGateway::new()));
        let mut list = ListState::new();

        let err = orchestrator
            .upload_batch(
                1,
                vec![file("photo.png"), file("notes.pdf"), file("clip.mp4")],
                &mut list,
                &(),
            )
            .await
            .unwrap_err();

        assert!(err.is_validation());
        assert_eq!(err.user_message(), UNSUPPORTED_FILE_MESSAGE);
        assert!(uploader.calls().is_empty());
        assert!(matches!(orchestrator.state(), UploadState::Failed { uploaded: 0, .. }));
        assert!(!orchestrator.is_uploading());
    }

    #[tokio::test]
    async fn test_empty_batch_is_rejected() {
        let uploader = ScriptedUploader::new(vec![], vec![]);
        let orchestrator = UploadOrchestrator::new(uploader.clone(), Arc::new(MockAssetGateway::new()));

        let err = orchestrator
            .upload_batch(1, vec![], &mut ListState::new(), &())
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), EMPTY_BATCH_MESSAGE);
    }

    #[tokio::test]
    async fn test_failure_halts_remaining_files() {
        let uploader = ScriptedUploader::new(
            vec![100],
            vec![
                None,
                Some(ErrorBody::with_field_error("file", "The file may not be greater than 10 MB.")),
                None,
            ],
        );
        let orchestrator = UploadOrchestrator::new(uploader.clone(), Arc::new(MockAssetGateway::new()));
        let mut list = ListState::new();

        let err = orchestrator
            .upload_batch(
                7,
                vec![file("a.png"), file("b.mov"), file("c.webp")],
                &mut list,
                &(),
            )
            .await
            .unwrap_err();

        assert_eq!(uploader.calls(), vec!["a.png", "b.mov"]);
        assert_eq!(err.user_message(), "The file may not be greater than 10 MB.");
        assert_eq!(
            orchestrator.state(),
            UploadState::Failed {
                uploaded: 1,
                message: "The file may not be greater than 10 MB.".to_string(),
            }
        );
        assert!(list.items().is_empty());
    }

    #[tokio::test]
    async fn test_progress_sequence_and_refresh() {
        let uploader = ScriptedUploader::new(vec![50, 100], vec![]);
        let assets = refreshed_assets(3, vec![asset(10, "a.png"), asset(11, "b.jpg")]);
        let orchestrator = UploadOrchestrator::new(uploader.clone(), assets);
        let mut list = ListState::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let summary = orchestrator
            .upload_batch(3, vec![file("a.png"), file("b.jpg")], &mut list, &tx)
            .await
            .unwrap();

        assert_eq!(summary.uploaded, 2);
        assert_eq!(summary.message, "2 assets uploaded successfully.");
        assert!(summary.refresh_error.is_none());
        assert_eq!(list.items().len(), 2);

        let mut percents = Vec::new();
        let mut files = Vec::new();
        while let Ok(state) = rx.try_recv() {
            if let UploadState::Uploading {
                current,
                overall_percent,
                batch_id,
                ..
            } = state
            {
                assert_eq!(batch_id, summary.batch_id);
                files.push(current);
                percents.push(overall_percent);
            }
        }
        assert_eq!(percents, vec![0, 25, 50, 50, 75, 100]);
        assert_eq!(files, vec![1, 1, 1, 2, 2, 2]);
        assert!(matches!(
            orchestrator.subscribe().borrow().clone(),
            UploadState::Succeeded { uploaded: 2, .. }
        ));
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_summary() {
        let uploader = ScriptedUploader::new(vec![], vec![]);
        let mut assets = MockAssetGateway::new();
        assets
            .expect_list_project_assets()
            .times(1)
            .returning(|_| Err(ApiError::rejected("/projects/1/assets", 503, None)));
        let orchestrator = UploadOrchestrator::new(uploader.clone(), Arc::new(assets));
        let mut list = ListState::new();
        list.set_items(vec![asset(1, "old.png")]);

        let summary = orchestrator
            .upload_batch(
                1,
                vec![file("a.png"), file("b.png"), file("c.mp4")],
                &mut list,
                &(),
            )
            .await
            .unwrap();

        assert_eq!(summary.uploaded, 3);
        assert_eq!(summary.message, "3 assets uploaded successfully.");
        assert!(matches!(summary.refresh_error, Some(AppError::Request(_))));
        assert_eq!(uploader.calls().len(), 3);
        assert_eq!(list.items().len(), 1);
        assert!(matches!(orchestrator.state(), UploadState::Succeeded { uploaded: 3, .. }));
    }

    #[tokio::test]
    async fn test_second_batch_is_rejected_while_busy() {
        let gate = Arc::new(Semaphore::new(0));
        let uploader = Arc::new(GatedUploader { gate: gate.clone() });
        let orchestrator = UploadOrchestrator::new(uploader, refreshed_assets(1, vec![asset(1, "a.png")]));
        let mut first_list = ListState::new();
        let mut second_list = ListState::new();

        let first = orchestrator.upload_batch(1, vec![file("a.png")], &mut first_list, &());
        let second = async {
            tokio::task::yield_now().await;
            let result = orchestrator
                .upload_batch(1, vec![file("b.png")], &mut second_list, &())
                .await;
            gate.add_permits(1);
            result
        };
        let (first, second) = tokio::join!(first, second);

        assert_eq!(first.unwrap().message, "Asset uploaded successfully.");
        assert!(matches!(second, Err(AppError::Busy(UPLOAD_BUSY_MESSAGE))));
        assert!(!orchestrator.is_uploading());
    }
}
