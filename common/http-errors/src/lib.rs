use axum::{http::{StatusCode, HeaderValue}, response::{IntoResponse, Response}, Json};
use serde::Serialize;

/// Header mirroring the machine-readable `code` so proxies can log it without parsing bodies.
pub const ERROR_CODE_HEADER: &str = "X-Error-Code";

#[derive(Serialize, Debug)]
pub struct ErrorBody {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")] pub description: Option<String>,
}

#[derive(Debug)]
pub enum ApiError {
    Unauthorized { code: &'static str, description: String },
    Forbidden { code: &'static str, description: String },
    BadRequest { code: &'static str, description: Option<String> },
    NotFound { code: &'static str },
}

impl ApiError {
    pub fn bad_request(code: &'static str, description: impl Into<String>) -> Self { Self::BadRequest { code, description: Some(description.into()) } }
    pub fn not_found(code: &'static str) -> Self { Self::NotFound { code } }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized { code, .. }
            | ApiError::Forbidden { code, .. }
            | ApiError::BadRequest { code, .. }
            | ApiError::NotFound { code } => *code,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let description = match self {
            ApiError::Unauthorized { description, .. } | ApiError::Forbidden { description, .. } => Some(description),
            ApiError::BadRequest { description, .. } => description,
            ApiError::NotFound { .. } => None,
        };
        let mut resp = (status, Json(ErrorBody { code: code.into(), description })).into_response();
        if let Ok(val) = HeaderValue::from_str(code) {
            resp.headers_mut().insert(ERROR_CODE_HEADER, val);
        }
        resp
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
