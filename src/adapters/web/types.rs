//! Unified JSON response envelope: `{code, msg, data}`.

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self { code: 0, msg: "ok".to_string(), data: Some(data) }
    }
}

pub type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), (StatusCode, Json<ApiResponse<()>>)>;

#[inline]
pub fn ok<T: Serialize>(data: T) -> ApiResult<T> {
    Ok((StatusCode::OK, Json(ApiResponse::success(data))))
}

pub mod error_codes {
    pub const INVALID_PARAMETER: i32 = 1001;
    pub const NOT_FOUND: i32 = 4001;
    pub const INVALID_MODE: i32 = 4002;
    pub const SERVICE_UNAVAILABLE: i32 = 5001;
    pub const INTERNAL_ERROR: i32 = 5000;
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: i32,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: i32, message: impl Into<String>) -> Self {
        Self { status, code, message: message.into() }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error_codes::INVALID_PARAMETER, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, error_codes::NOT_FOUND, msg)
    }

    pub fn invalid_mode(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error_codes::INVALID_MODE, msg)
    }

    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, error_codes::SERVICE_UNAVAILABLE, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error_codes::INTERNAL_ERROR, msg)
    }

    pub fn into_err<T>(self) -> ApiResult<T> {
        Err((self.status, Json(ApiResponse { code: self.code, msg: self.message, data: None })))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let body = Json(ApiResponse::<()> { code: self.code, msg: self.message, data: None });
        (self.status, body).into_response()
    }
}

/// Lets handlers `?`-propagate an `ApiError` directly into `ApiResult`'s
/// error arm.
impl From<ApiError> for (StatusCode, Json<ApiResponse<()>>) {
    fn from(err: ApiError) -> Self {
        (err.status, Json(ApiResponse { code: err.code, msg: err.message, data: None }))
    }
}

impl From<crate::error::StoreError> for ApiError {
    fn from(err: crate::error::StoreError) -> Self {
        match err {
            crate::error::StoreError::NotFound { exchange, pair } => {
                ApiError::not_found(format!("no stats for {exchange}:{pair}"))
            }
            crate::error::StoreError::Database(e) => ApiError::internal(format!("database error: {e}")),
        }
    }
}

impl From<crate::error::ModeError> for ApiError {
    fn from(err: crate::error::ModeError) -> Self {
        ApiError::invalid_mode(err.to_string())
    }
}
