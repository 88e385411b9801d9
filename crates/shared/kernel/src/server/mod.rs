//! HTTP plumbing shared by every slice: application state, the JSON envelope
//! and the system routes.

mod health;
pub mod response;
pub mod router;
pub mod state;

pub use response::{ApiError, ApiJson, ApiResult, FieldIssue, Success};
pub use state::{ApiState, ApiStateBuilder, ApiStateError};
