use std::future::Future;
use std::sync::Arc;

use axum::http::HeaderMap;
use tracing::{debug, warn};

use crate::claims::Claims;
use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};
use crate::extractors::{authorization_header, extract_bearer};
use crate::guards::ensure_permission;
use crate::jwks::{CachedKeySet, JwkSet, JwksFetcher, KeySetResolver};
use crate::verifier::TokenVerifier;

/// Runs the full extract → resolve keys → verify → permission pipeline.
///
/// Holds no per-request state; the only shared piece is whatever caching the
/// key set resolver does.
#[derive(Clone)]
pub struct Authorizer {
    verifier: TokenVerifier,
    keys: Arc<dyn KeySetResolver>,
}

impl Authorizer {
    /// Builds an authorizer fetching keys from the configured provider,
    /// cached when `jwks_cache_ttl` is set.
    pub fn new(config: AuthConfig) -> Self {
        let fetcher = JwksFetcher::from_config(&config);
        let keys: Arc<dyn KeySetResolver> = match config.jwks_cache_ttl {
            Some(ttl) => Arc::new(
                CachedKeySet::new(fetcher, ttl)
                    .with_min_refresh_interval(config.jwks_min_refresh_interval),
            ),
            None => Arc::new(fetcher),
        };
        Self::with_resolver(config, keys)
    }

    pub fn with_resolver(config: AuthConfig, keys: Arc<dyn KeySetResolver>) -> Self {
        Self {
            verifier: TokenVerifier::new(config),
            keys,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        self.verifier.config()
    }

    /// Validates the `Authorization` header value and returns verified claims.
    pub async fn authenticate(&self, header: Option<&str>) -> AuthResult<Claims> {
        let result = self.authenticate_inner(header).await;
        if let Err(err) = &result {
            log_rejection(err);
        }
        result
    }

    /// Same as [`Authorizer::authenticate`], reading the header from a request.
    pub async fn authenticate_headers(&self, headers: &HeaderMap) -> AuthResult<Claims> {
        match authorization_header(headers) {
            Ok(header) => self.authenticate(header).await,
            Err(err) => {
                log_rejection(&err);
                Err(err)
            }
        }
    }

    async fn authenticate_inner(&self, header: Option<&str>) -> AuthResult<Claims> {
        let token = extract_bearer(header)?;
        let keys = self.keys.resolve().await?;
        match self.verifier.verify(token, &keys) {
            Err(AuthError::KeyNotFound) => self.verify_after_rotation(token, &keys).await,
            outcome => outcome,
        }
    }

    /// One retry against a newer key set when the token's `kid` was unknown.
    async fn verify_after_rotation(&self, token: &str, stale: &Arc<JwkSet>) -> AuthResult<Claims> {
        match self.keys.refresh_on_miss().await {
            Ok(Some(keys)) if !Arc::ptr_eq(&keys, stale) => self.verifier.verify(token, &keys),
            Ok(_) => Err(AuthError::KeyNotFound),
            Err(err) => {
                warn!(kind = err.kind(), error = %err, "key set refresh after unknown kid failed");
                Err(AuthError::KeyNotFound)
            }
        }
    }

    /// Authenticates and then requires `permission` to be granted.
    pub async fn authorize(&self, header: Option<&str>, permission: &str) -> AuthResult<Claims> {
        let claims = self.authenticate(header).await?;
        check_permission(claims, permission)
    }

    /// Same as [`Authorizer::authorize`], reading the header from a request.
    pub async fn authorize_headers(
        &self,
        headers: &HeaderMap,
        permission: &str,
    ) -> AuthResult<Claims> {
        let claims = self.authenticate_headers(headers).await?;
        check_permission(claims, permission)
    }

    /// Invokes `operation` only after `authorize` succeeds.
    pub async fn guard<F, Fut, T>(
        &self,
        header: Option<&str>,
        permission: &str,
        operation: F,
    ) -> AuthResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.authorize(header, permission).await?;
        Ok(operation().await)
    }
}

fn log_rejection(err: &AuthError) {
    warn!(kind = err.kind(), code = err.code(), error = %err, "authentication failed");
}

fn check_permission(claims: Claims, permission: &str) -> AuthResult<Claims> {
    if let Err(err) = ensure_permission(&claims, permission) {
        warn!(
            kind = err.kind(),
            code = err.code(),
            permission,
            subject = claims.subject.as_deref().unwrap_or("-"),
            "authorization denied"
        );
        return Err(err);
    }
    debug!(permission, "request authorized");
    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HEADER_NOT_TEXT;
    use crate::jwks::StaticKeySet;
    use crate::testing::{
        bearer, fixture_config, issue_token, key_set, primary_key, secondary_key, valid_claims,
    };
    use async_trait::async_trait;
    use axum::http::{header::AUTHORIZATION, HeaderValue};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn authorizer() -> Authorizer {
        Authorizer::with_resolver(fixture_config(), Arc::new(StaticKeySet::new(key_set())))
    }

    /// Serves `before` until asked to refresh, then `after`.
    struct RotatingKeys {
        before: Arc<JwkSet>,
        after: Option<Arc<JwkSet>>,
        refreshes: AtomicUsize,
    }

    impl RotatingKeys {
        fn new(before: JwkSet, after: Option<JwkSet>) -> Arc<Self> {
            Arc::new(Self {
                before: Arc::new(before),
                after: after.map(Arc::new),
                refreshes: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl KeySetResolver for RotatingKeys {
        async fn resolve(&self) -> AuthResult<Arc<JwkSet>> {
            Ok(self.before.clone())
        }

        async fn refresh_on_miss(&self) -> AuthResult<Option<Arc<JwkSet>>> {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            Ok(self.after.clone())
        }
    }

    #[tokio::test]
    async fn guard_runs_operation_once_when_authorized() {
        let header = bearer(&valid_claims(&["get:books"]));
        let calls = AtomicUsize::new(0);

        let result = authorizer()
            .guard(Some(&header), "get:books", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                "books"
            })
            .await;

        assert_eq!(result, Ok("books"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn guard_skips_operation_on_failure() {
        let header = bearer(&valid_claims(&["get:books"]));
        let calls = AtomicUsize::new(0);
        let authorizer = authorizer();

        let denied = authorizer
            .guard(Some(&header), "delete:book", || async {
                calls.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        assert_eq!(denied, Err(AuthError::PermissionDenied("delete:book".into())));

        let missing = authorizer
            .guard(None, "get:books", || async {
                calls.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        assert_eq!(missing, Err(AuthError::MissingHeader));

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn opaque_header_bytes_are_malformed() {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_bytes(b"Bearer \xff\xfe").expect("opaque bytes"),
        );

        let err = authorizer()
            .authorize_headers(&headers, "get:books")
            .await
            .expect_err("not text");
        assert_eq!(err, AuthError::MalformedHeader(HEADER_NOT_TEXT));
        assert_eq!(err.to_string(), HEADER_NOT_TEXT);
    }

    #[tokio::test]
    async fn header_map_entry_points_match_raw_header() {
        let header = bearer(&valid_claims(&["get:books"]));
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&header).expect("ascii"));
        let authorizer = authorizer();

        let from_map = authorizer
            .authorize_headers(&headers, "get:books")
            .await
            .expect("authorized");
        let from_str = authorizer
            .authorize(Some(&header), "get:books")
            .await
            .expect("authorized");
        assert_eq!(from_map, from_str);

        let err = authorizer
            .authenticate_headers(&HeaderMap::new())
            .await
            .expect_err("no header");
        assert_eq!(err, AuthError::MissingHeader);
    }

    #[tokio::test]
    async fn unknown_kid_retries_once_against_rotated_keys() {
        let token = issue_token(secondary_key(), "rotated-in", &valid_claims(&["get:books"]));
        let header = format!("Bearer {token}");
        let keys = RotatingKeys::new(key_set(), Some(secondary_key().key_set("rotated-in")));
        let authorizer = Authorizer::with_resolver(fixture_config(), keys.clone());

        authorizer
            .authorize(Some(&header), "get:books")
            .await
            .expect("new kid accepted after refresh");
        assert_eq!(keys.refreshes.load(Ordering::SeqCst), 1);

        // Tokens for known kids never trigger a refresh.
        authorizer
            .authorize(Some(&bearer(&valid_claims(&["get:books"]))), "get:books")
            .await
            .expect("known kid");
        assert_eq!(keys.refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_kid_stays_rejected_without_newer_keys() {
        let header = format!(
            "Bearer {}",
            issue_token(primary_key(), "never-published", &valid_claims(&[]))
        );

        let unchanged = RotatingKeys::new(key_set(), None);
        let err = Authorizer::with_resolver(fixture_config(), unchanged.clone())
            .authenticate(Some(&header))
            .await
            .expect_err("kid unknown");
        assert_eq!(err, AuthError::KeyNotFound);
        assert_eq!(unchanged.refreshes.load(Ordering::SeqCst), 1);

        let still_missing = RotatingKeys::new(key_set(), Some(secondary_key().key_set("other")));
        let err = Authorizer::with_resolver(fixture_config(), still_missing)
            .authenticate(Some(&header))
            .await
            .expect_err("kid unknown after refresh");
        assert_eq!(err, AuthError::KeyNotFound);

        let err = authorizer()
            .authenticate(Some(&header))
            .await
            .expect_err("static keys");
        assert_eq!(err, AuthError::KeyNotFound);
    }

    #[tokio::test]
    async fn permissions_claim_missing_surfaces_after_verification() {
        let mut payload = valid_claims(&[]);
        payload.as_object_mut().unwrap().remove("permissions");
        let header = bearer(&payload);

        let err = authorizer()
            .authorize(Some(&header), "get:books")
            .await
            .expect_err("no permissions claim");
        assert_eq!(err, AuthError::PermissionsClaimMissing);

        authorizer()
            .authorize(Some(&header), "")
            .await
            .expect("empty requirement only needs a valid token");
    }
}
