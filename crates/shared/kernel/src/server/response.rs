//! The JSON envelope every API route answers with:
//!
//! * `{"status": "success", "payload": ...}` for 2xx,
//! * `{"status": "fail", "payload": [{"field": ..., "message": ...}]}` for client errors,
//! * `{"status": "error", "error": "..."}` for server faults.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use tracing::{debug, error};

/// One reason a request was rejected.
#[fauna_derive::api_model]
#[derive(Clone, PartialEq, Eq)]
pub struct FieldIssue {
    /// Offending input, absent for request-wide problems.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
}

impl FieldIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: Some(field.into()), message: message.into() }
    }

    pub fn general(message: impl Into<String>) -> Self {
        Self { field: None, message: message.into() }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum Envelope<'a, T> {
    Success { payload: T },
    Fail { payload: &'a [FieldIssue] },
    Error { error: &'a str },
}

/// Errors a handler may return; each maps to one status code and envelope kind.
#[fauna_derive::fauna_error]
pub enum ApiError {
    #[error("Invalid request: {}", describe(.issues))]
    Validation { issues: Vec<FieldIssue> },

    #[error("{message}")]
    NotFound { message: Cow<'static, str> },

    #[error("{message}")]
    Conflict { message: Cow<'static, str> },

    #[error("{message}")]
    Unauthorized { message: Cow<'static, str> },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn describe(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(|issue| match &issue.field {
            Some(field) => format!("{field} {}", issue.message),
            None => issue.message.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

impl ApiError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation { issues: vec![FieldIssue::new(field, message)] }
    }

    pub fn not_found(message: impl Into<Cow<'static, str>>) -> Self {
        Self::NotFound { message: message.into() }
    }

    pub fn conflict(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Conflict { message: message.into() }
    }

    pub fn unauthorized(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Unauthorized { message: message.into() }
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let issues = match self {
            Self::Validation { issues } => issues,
            Self::NotFound { message } | Self::Conflict { message } | Self::Unauthorized { message } => {
                vec![FieldIssue::general(message)]
            }
            Self::Internal { ref message, .. } => {
                error!(error = %self, "Request failed");
                let body: Envelope<'_, ()> = Envelope::Error { error: message };
                return (status, Json(body)).into_response();
            }
        };

        debug!(%status, issues = %describe(&issues), "Request rejected");
        let body: Envelope<'_, ()> = Envelope::Fail { payload: &issues };
        (status, Json(body)).into_response()
    }
}

impl From<crate::security::resource::ResourceGuardError> for ApiError {
    fn from(err: crate::security::resource::ResourceGuardError) -> Self {
        let field = err.field().to_owned();
        match err {
            crate::security::resource::ResourceGuardError::Validation { message, .. } => {
                Self::validation(field, message)
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation { issues: vec![FieldIssue::general(rejection.body_text())] }
    }
}

/// Successful payload wrapped in the `success` envelope.
#[derive(Debug)]
pub struct Success<T>(pub T);

impl<T: Serialize> IntoResponse for Success<T> {
    fn into_response(self) -> Response {
        let body: Envelope<'_, T> = Envelope::Success { payload: self.0 };
        (StatusCode::OK, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<Success<T>, ApiError>;

/// `Json` extractor whose rejections use the `fail` envelope.
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::{Value, json};

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("read body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn success_wraps_payload() {
        let response = Success(json!({"id": "abc"})).into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"status": "success", "payload": {"id": "abc"}}));
    }

    #[tokio::test]
    async fn validation_lists_fields() {
        let response = ApiError::validation("player", "must not be empty").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({"status": "fail", "payload": [{"field": "player", "message": "must not be empty"}]})
        );
    }

    #[tokio::test]
    async fn conflict_and_not_found_use_fail_envelope() {
        let response = ApiError::conflict("Spawn already claimed").into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(
            body_json(response).await,
            json!({"status": "fail", "payload": [{"message": "Spawn already claimed"}]})
        );

        let response = ApiError::not_found("Bag entry not found").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn internal_errors_use_error_envelope() {
        let response = ApiError::from("store unavailable").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await, json!({"status": "error", "error": "store unavailable"}));
    }

    #[test]
    fn guard_errors_become_validation() {
        let err = crate::security::resource::ResourceGuard::verify("", "spawnInstanceId")
            .map_err(ApiError::from)
            .expect_err("empty id");
        assert!(matches!(
            err,
            ApiError::Validation { ref issues } if issues[0].field.as_deref() == Some("spawnInstanceId")
        ));
    }
}
