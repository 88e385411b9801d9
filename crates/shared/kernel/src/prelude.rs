pub use crate::domain::config::ApiConfig;
pub use crate::domain::registry::{FeatureSlice, InitializedSlice};
pub use crate::safe_nanoid;
pub use crate::security::resource::{ResourceGuard, ResourceGuardError};

#[cfg(feature = "server")]
pub use crate::server::{ApiError, ApiJson, ApiResult, ApiState, FieldIssue, Success};
