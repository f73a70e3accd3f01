use axum::{
    handler::Handler,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    middleware,
    routing::get,
    Router,
};
use common_auth::{enforce_permission, PermissionGuard};
use tower_http::cors::{Any, CorsLayer};

use crate::app_state::AppState;
use crate::book_handlers::{add_book, delete_book, get_book, list_books};

pub const GET_BOOKS: &str = "get:books";
pub const GET_BOOK: &str = "get:book";
pub const ADD_BOOK: &str = "add:book";
pub const DELETE_BOOK: &str = "delete:book";

async fn health() -> &'static str {
    "ok"
}

/// Builds the routes; every catalog operation is registered with the permission it requires.
pub fn build_router(state: AppState) -> Router {
    let authorizer = state.authorizer().clone();
    let guard = |permission: &'static str| {
        middleware::from_fn_with_state(
            PermissionGuard::new(authorizer.clone(), permission),
            enforce_permission,
        )
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]);

    Router::new()
        .route("/healthz", get(health))
        .route(
            "/books",
            get(list_books.layer(guard(GET_BOOKS))).post(add_book.layer(guard(ADD_BOOK))),
        )
        .route(
            "/books/:book_id",
            get(get_book.layer(guard(GET_BOOK))).delete(delete_book.layer(guard(DELETE_BOOK))),
        )
        .with_state(state)
        .layer(cors)
}
