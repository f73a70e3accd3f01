use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{FromRef, FromRequestParts, Request, State};
use axum::http::{header::AUTHORIZATION, request::Parts, HeaderMap};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::authorizer::Authorizer;
use crate::claims::Claims;
use crate::error::{
    AuthError, AuthResult, HEADER_MISSING_SCHEME, HEADER_MISSING_TOKEN, HEADER_NOT_TEXT,
    HEADER_TOO_MANY_PARTS,
};

/// Pulls the bare token out of an `Authorization` header value.
pub fn extract_bearer(header: Option<&str>) -> AuthResult<&str> {
    let raw = match header.map(str::trim) {
        Some(value) if !value.is_empty() => value,
        _ => return Err(AuthError::MissingHeader),
    };

    let parts: Vec<&str> = raw.split_whitespace().collect();
    if !parts[0].eq_ignore_ascii_case("bearer") {
        return Err(AuthError::MalformedHeader(HEADER_MISSING_SCHEME));
    }
    match parts.len() {
        1 => Err(AuthError::MalformedHeader(HEADER_MISSING_TOKEN)),
        2 => Ok(parts[1]),
        _ => Err(AuthError::MalformedHeader(HEADER_TOO_MANY_PARTS)),
    }
}

/// Reads the `Authorization` header; opaque (non visible-ASCII) values count as malformed.
pub(crate) fn authorization_header(headers: &HeaderMap) -> AuthResult<Option<&str>> {
    headers
        .get(AUTHORIZATION)
        .map(|value| {
            value
                .to_str()
                .map_err(|_| AuthError::MalformedHeader(HEADER_NOT_TEXT))
        })
        .transpose()
}

/// Verified claims for handlers that only need authentication.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub claims: Claims,
}

impl AuthContext {
    pub fn has_permission(&self, permission: &str) -> bool {
        self.claims.has_permission(permission)
    }

    pub fn into_claims(self) -> Claims {
        self.claims
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    Arc<Authorizer>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(claims) = parts.extensions.get::<Claims>() {
            return Ok(Self {
                claims: claims.clone(),
            });
        }

        let authorizer = Arc::<Authorizer>::from_ref(state);
        let claims = authorizer.authenticate_headers(&parts.headers).await?;
        Ok(Self { claims })
    }
}

/// Binds a required permission to a route at registration time.
///
/// ```ignore
/// let guard = PermissionGuard::new(authorizer.clone(), "get:books");
/// Router::new().route(
///     "/books",
///     get(list_books.layer(middleware::from_fn_with_state(guard, enforce_permission))),
/// );
/// ```
#[derive(Clone)]
pub struct PermissionGuard {
    authorizer: Arc<Authorizer>,
    permission: &'static str,
}

impl PermissionGuard {
    pub fn new(authorizer: Arc<Authorizer>, permission: &'static str) -> Self {
        Self {
            authorizer,
            permission,
        }
    }

    pub fn permission(&self) -> &'static str {
        self.permission
    }
}

/// Middleware for `axum::middleware::from_fn_with_state`. The wrapped handler
/// only runs once the request is authorized; verified [`Claims`] are placed in
/// the request extensions.
pub async fn enforce_permission(
    State(guard): State<PermissionGuard>,
    mut request: Request,
    next: Next,
) -> Response {
    let outcome = guard
        .authorizer
        .authorize_headers(request.headers(), guard.permission)
        .await;
    match outcome {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn accepts_valid_token() {
        assert_eq!(extract_bearer(Some("Bearer abc.def.ghi")), Ok("abc.def.ghi"));
    }

    #[test]
    fn scheme_is_case_insensitive() {
        assert_eq!(extract_bearer(Some("bEaReR abc.def.ghi")), Ok("abc.def.ghi"));
    }

    #[test]
    fn missing_or_blank_header() {
        assert_eq!(extract_bearer(None), Err(AuthError::MissingHeader));
        assert_eq!(extract_bearer(Some("")), Err(AuthError::MissingHeader));
        assert_eq!(extract_bearer(Some("   ")), Err(AuthError::MissingHeader));
    }

    #[test]
    fn rejects_wrong_scheme() {
        assert_eq!(
            extract_bearer(Some("Basic credentials")),
            Err(AuthError::MalformedHeader(HEADER_MISSING_SCHEME))
        );
    }

    #[test]
    fn rejects_scheme_without_token() {
        assert_eq!(
            extract_bearer(Some("Bearer")),
            Err(AuthError::MalformedHeader(HEADER_MISSING_TOKEN))
        );
        assert_eq!(
            extract_bearer(Some("Bearer    ")),
            Err(AuthError::MalformedHeader(HEADER_MISSING_TOKEN))
        );
    }

    #[test]
    fn rejects_extra_parts() {
        assert_eq!(
            extract_bearer(Some("Bearer abc def")),
            Err(AuthError::MalformedHeader(HEADER_TOO_MANY_PARTS))
        );
    }

    #[test]
    fn non_utf8_header_is_malformed() {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_bytes(b"Bearer \xff\xfe").expect("opaque bytes"),
        );
        assert_eq!(
            authorization_header(&headers),
            Err(AuthError::MalformedHeader(HEADER_NOT_TEXT))
        );
        assert_eq!(authorization_header(&HeaderMap::new()), Ok(None));
    }
}
