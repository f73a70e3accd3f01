use std::sync::Arc;

use axum::extract::FromRef;
use common_auth::Authorizer;

use crate::catalog::BookCatalog;

/// Shared application state used by handlers.
#[derive(Clone)]
pub struct AppState {
    pub(crate) catalog: Arc<BookCatalog>,
    pub(crate) authorizer: Arc<Authorizer>,
}

impl AppState {
    pub fn new(catalog: Arc<BookCatalog>, authorizer: Arc<Authorizer>) -> Self {
        Self { catalog, authorizer }
    }

    pub fn authorizer(&self) -> &Arc<Authorizer> {
        &self.authorizer
    }
}

impl FromRef<AppState> for Arc<Authorizer> {
    fn from_ref(state: &AppState) -> Self { state.authorizer.clone() }
}
