use std::sync::Arc;

use common_auth::testing::fixture_config;
use common_auth::{Authorizer, StaticKeySet};
use library_service::app::build_router;
use library_service::app_state::AppState;
use library_service::catalog::BookCatalog;

pub use common_auth::testing::{bearer, jwks_body, key_set, valid_claims as claims, AUDIENCE, DOMAIN};

/// Router backed by a pinned key set, so no JWKS endpoint is needed.
pub fn app() -> axum::Router {
    let keys = StaticKeySet::new(key_set());
    app_with(Authorizer::with_resolver(fixture_config(), Arc::new(keys)))
}

pub fn app_with(authorizer: Authorizer) -> axum::Router {
    build_router(AppState::new(Arc::new(BookCatalog::new()), Arc::new(authorizer)))
}
