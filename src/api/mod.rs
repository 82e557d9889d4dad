//! JSON-over-HTTP surface.
//!
//! Every route lives under `/api/v1`. The caller is identified by the
//! `X-User-Id` header and resolved against the directory; credentials are
//! checked upstream of this service. Responses use one envelope,
//! `{statusCode, data, message, success}`, and errors drop `data`.
//!
//! Database work is synchronous, so handlers hand it to
//! [`tokio::task::spawn_blocking`] through [`blocking`].

mod appointments;
mod diagnosis;
mod prescriptions;
mod staff;

use crate::access::Caller;
use crate::error::ClinicError;
use crate::Clinic;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

/// Header carrying the id of the directory user making the request.
pub const CALLER_HEADER: &str = "x-user-id";

#[derive(Clone)]
pub struct AppState {
    pub clinic: Arc<Clinic>,
    /// Base for generated document links.
    pub public_base_url: Arc<str>,
}

impl AppState {
    pub fn new(clinic: Clinic, public_base_url: impl Into<Arc<str>>) -> Self {
        Self {
            clinic: Arc::new(clinic),
            public_base_url: public_base_url.into(),
        }
    }
}

/// Builds the service router.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .nest("/appointments", appointments::router())
        .nest("/diagnosis", diagnosis::router())
        .nest("/prescriptions", prescriptions::router())
        .nest("/staff", staff::router());

    Router::new().nest("/api/v1", api).with_state(state)
}

async fn health() -> ApiResponse<serde_json::Value> {
    ApiResponse::ok(serde_json::json!({ "status": "ok" }), "Service is healthy")
}

/// Success envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    status_code: u16,
    data: T,
    message: String,
    success: bool,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(status: StatusCode, data: T, message: impl Into<String>) -> Self {
        Self {
            status_code: status.as_u16(),
            data,
            message: message.into(),
            success: status.is_success(),
        }
    }

    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, data, message)
    }

    pub fn created(data: T, message: impl Into<String>) -> Self {
        Self::new(StatusCode::CREATED, data, message)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}

/// Everything a handler can fail with.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Clinic(#[from] ClinicError),
    #[error("Authentication required")]
    Unauthenticated,
    /// The request could not be parsed.
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Internal(String),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody<'a> {
    status_code: u16,
    message: &'a str,
    success: bool,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Clinic(err) => match err {
                ClinicError::Validation(_) => StatusCode::BAD_REQUEST,
                ClinicError::Conflict(_) => StatusCode::CONFLICT,
                ClinicError::NotFound(_) => StatusCode::NOT_FOUND,
                ClinicError::Forbidden(_) => StatusCode::FORBIDDEN,
                ClinicError::Storage(_) | ClinicError::Encoding(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        let body = ErrorBody {
            status_code: status.as_u16(),
            message: &message,
            success: false,
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// The authenticated caller, resolved from [`CALLER_HEADER`].
///
/// Rejects with 401 when the header is missing, malformed or names no
/// directory user, and with 403 when the account is deactivated.
#[derive(Debug, Clone, Copy)]
pub struct CurrentCaller(pub Caller);

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentCaller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(CALLER_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<i64>().ok())
            .ok_or(ApiError::Unauthenticated)?;

        let clinic = Arc::clone(&state.clinic);
        let user = blocking(move || clinic.user(user_id))
            .await?
            .ok_or(ApiError::Unauthenticated)?;
        if !user.is_active {
            return Err(ClinicError::forbidden("This account has been deactivated").into());
        }
        Ok(Self(Caller::new(user.id, user.role)))
    }
}

/// Runs synchronous clinic work on the blocking pool.
pub(crate) async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> crate::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| ApiError::Internal(format!("blocking task failed: {err}")))?
        .map_err(ApiError::from)
}
