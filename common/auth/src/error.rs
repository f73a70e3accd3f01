use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use common_http_errors::ApiError;
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

/// Every way a request can fail to be authorized. All variants are terminal.
///
/// The `Display` text doubles as the human-readable `description` sent to clients.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Authorization header is expected.")]
    MissingHeader,
    #[error("{0}")]
    MalformedHeader(&'static str),
    #[error("Authorization malformed.")]
    MalformedToken,
    #[error("Unable to fetch signing keys: {0}")]
    KeySetUnavailable(String),
    #[error("Unable to find the appropriate key.")]
    KeyNotFound,
    #[error("Token expired.")]
    TokenExpired,
    #[error("Incorrect claims. Please, check the audience and issuer.")]
    InvalidClaims,
    #[error("Unable to parse authentication token.")]
    InvalidHeader,
    #[error("Permissions not included in token.")]
    PermissionsClaimMissing,
    #[error("Permission '{0}' not found.")]
    PermissionDenied(String),
}

pub const HEADER_MISSING_SCHEME: &str = "Authorization header must start with \"Bearer\".";
pub const HEADER_MISSING_TOKEN: &str = "Token not found.";
pub const HEADER_TOO_MANY_PARTS: &str = "Authorization header must be bearer token.";
pub const HEADER_NOT_TEXT: &str = "Authorization header must be visible ASCII text.";

impl AuthError {
    /// Short machine-readable code exposed in error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingHeader => "authorization_header_missing",
            AuthError::MalformedHeader(_)
            | AuthError::MalformedToken
            | AuthError::KeyNotFound
            | AuthError::InvalidHeader => "invalid_header",
            AuthError::KeySetUnavailable(_) => "key_set_unavailable",
            AuthError::TokenExpired => "token_expired",
            AuthError::InvalidClaims => "invalid_claims",
            AuthError::PermissionsClaimMissing => "permissions_missing",
            AuthError::PermissionDenied(_) => "forbidden",
        }
    }

    /// Anything failing before the permission check is an authentication failure.
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::PermissionsClaimMissing => StatusCode::BAD_REQUEST,
            AuthError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    /// Variant name, used as a structured logging field.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::MissingHeader => "MissingHeader",
            AuthError::MalformedHeader(_) => "MalformedHeader",
            AuthError::MalformedToken => "MalformedToken",
            AuthError::KeySetUnavailable(_) => "KeySetUnavailable",
            AuthError::KeyNotFound => "KeyNotFound",
            AuthError::TokenExpired => "TokenExpired",
            AuthError::InvalidClaims => "InvalidClaims",
            AuthError::InvalidHeader => "InvalidHeader",
            AuthError::PermissionsClaimMissing => "PermissionsClaimMissing",
            AuthError::PermissionDenied(_) => "PermissionDenied",
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(value: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match value.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            ErrorKind::InvalidAudience
            | ErrorKind::InvalidIssuer
            | ErrorKind::ImmatureSignature
            | ErrorKind::MissingRequiredClaim(_) => AuthError::InvalidClaims,
            _ => AuthError::InvalidHeader,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(value: AuthError) -> Self {
        let code = value.code();
        let description = value.to_string();
        match value {
            AuthError::PermissionsClaimMissing => ApiError::BadRequest {
                code,
                description: Some(description),
            },
            AuthError::PermissionDenied(_) => ApiError::Forbidden { code, description },
            _ => ApiError::Unauthorized { code, description },
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
