pub mod activity;
pub mod attachments;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod seed;
pub mod storage;
pub mod store;

// Re-export commonly used types
pub use activity::ActivityLog;
pub use attachments::{AttachmentPolicy, BatchOutcome, FileCandidate, Rejection, RejectionReason};
pub use auth::{
    Authenticator, DemoAuthenticator, FlowStep, Identity, LoginFlow, RegistrationFlow,
    RegistrationForm, Session,
};
pub use config::{get_config_path, PortalConfig};
pub use db::{BackendType, DatabaseConfig, KeyValueBackend};
pub use error::{AuthError, PortalError, PortalResult};
pub use lifecycle::{filter, ReturnController};
pub use models::{
    ActivityLogEntry, Document, DocumentKind, ReturnInput, ReturnPatch, ReturnStats, ReturnStatus,
    ReturnType, TaxReturn, User, UserProfile,
};
pub use storage::{Storage, StorageError};
pub use store::RecordStore;
