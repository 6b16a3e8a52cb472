pub mod asset_service;
pub mod auth_service;
pub mod error_handling;
pub mod gateway;
pub mod list_state;
pub mod notification;
pub mod project_service;
pub mod upload_orchestrator;
pub mod user_search;

pub use asset_service::{AssetScope, AssetService};
pub use auth_service::AuthService;
pub use error_handling::{AppError, AppResult, LogHelper};
pub use list_state::{ListState, PAGE_SIZE, PageRange};
pub use notification::{Notification, NotificationCenter, NotificationKind};
pub use project_service::{ProjectEditForm, ProjectService};
pub use upload_orchestrator::{UploadObserver, UploadOrchestrator, UploadState, UploadSummary};
pub use user_search::UserSearch;
