pub mod api_key;
pub mod catalog;
pub mod generation;
pub mod health;
pub mod project;
pub mod session;
pub mod stats;
pub mod user;

pub use api_key::{ApiKeySummary, CreatedApiKey, KeyRevocation, KeyStatus, NewApiKey};
pub use catalog::{CuratedModel, DownloadAccepted, DownloadJob, DownloadRequest, DownloadedModel, JobStatus};
pub use generation::{GenerationRequest, GenerationResponse, TokenUsage};
pub use health::{DbHealth, ModelServerHealth, SystemHealth, SystemMetrics};
pub use project::{DeletedProject, NewProject, Project};
pub use session::{Ack, CompanyInfo, LoginRequest, LoginResponse, UserInfo, VerifyResponse};
pub use stats::{
    ApiKeyStatusBreakdown, DayCount, HourPoint, HourlyRequests, KeyTokens, LatencyBucket, LatencyHistogram,
    ProjectStatusBreakdown, StatsSummary, TokensPerKey, WeeklyRequests,
};
pub use user::{CompanyUser, NewUser};
