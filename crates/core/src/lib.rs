pub mod auth;
pub mod config;
pub mod mapper;
pub mod metrics;
pub mod model;
pub mod queue;
pub mod scheduler;
pub mod state;
pub mod sync;
pub mod target;
pub mod testing;
pub mod upstream;

pub use auth::{
    create_authenticator, AuthError, AuthToken, AuthTokenStorage, Authenticator,
    MemoryTokenStorage, OAuthRefreshAuthenticator,
};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, DatabaseConfig,
    LoggingConfig, OAuthClientConfig, SanitizedConfig, ServerConfig, Settings,
};
pub use mapper::{MapperError, MetadataIdMapper};
pub use model::{
    AssetRecord, BinaryRecord, ContinuationToken, MappedKey, MetadataCategory, MetadataElement,
};
pub use queue::{Admission, ExecutionQueue, JobOutcome, JobRequest, QueueStatus, RunKind};
pub use scheduler::{JobKey, ScheduledJob, Scheduler, SchedulerError, TokioScheduler};
pub use state::{ContinuationStorage, MemoryContinuationStorage, SqliteStateStore, StateError};
pub use sync::{
    ServiceStatus, SyncCollaborators, SyncConfig, SyncError, SyncOrchestrator, SyncOutcome,
    SyncPhase, SyncReport, SyncService,
};
pub use target::{FsTarget, FsTargetConfig, SyncTarget, SyncTargetCapabilities, TargetError};
pub use upstream::{
    AccessLayer, HttpUpstreamClient, RetryPolicy, UpstreamApi, UpstreamConfig, UpstreamError,
};
