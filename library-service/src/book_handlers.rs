use crate::app_state::AppState;
use crate::catalog::NewBook;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use common_auth::Claims;
use common_http_errors::{ApiError, ApiResult};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::info;

pub const PER_PAGE: usize = 10;
const MAX_PER_PAGE: usize = 100;

#[derive(Debug, Default, Deserialize)]
pub struct Pagination {
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

pub async fn list_books(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> Json<Value> {
    let page = pagination.page.unwrap_or(1).max(1);
    let per_page = pagination.per_page.unwrap_or(PER_PAGE).clamp(1, MAX_PER_PAGE);
    let books = state.catalog.page(page, per_page);
    Json(json!({
        "books": books,
        "total": state.catalog.len(),
    }))
}

pub async fn get_book(State(state): State<AppState>, Path(book_id): Path<u64>) -> ApiResult<Json<Value>> {
    let book = state.catalog.get(book_id).ok_or(ApiError::not_found("not_found"))?;
    Ok(Json(json!({ "book": book, "success": true })))
}

pub async fn add_book(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(data): Json<Map<String, Value>>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let title = required_str(&data, "title")?;
    let pages = required_field(&data, "pages")?
        .as_u64()
        .and_then(|value| u32::try_from(value).ok())
        .ok_or_else(|| ApiError::bad_request("invalid_field", "Book pages in 'pages' must be a positive integer."))?;
    let about = required_str(&data, "about")?;

    let book = state.catalog.insert(NewBook { title, pages, about });
    info!(book_id = book.id, subject = claims.subject.as_deref().unwrap_or("-"), "book added");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Book has been added successfully.",
            "book": book,
            "total": state.catalog.len(),
        })),
    ))
}

pub async fn delete_book(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(book_id): Path<u64>,
) -> ApiResult<Json<Value>> {
    let removed = state.catalog.remove(book_id).ok_or(ApiError::not_found("not_found"))?;
    info!(book_id = removed.id, subject = claims.subject.as_deref().unwrap_or("-"), "book deleted");
    Ok(Json(json!({
        "success": true,
        "deleted": removed.id,
        "total": state.catalog.len(),
    })))
}

fn required_field<'a>(data: &'a Map<String, Value>, field: &str) -> ApiResult<&'a Value> {
    data.get(field)
        .ok_or_else(|| ApiError::bad_request("missing_field", format!("Must pass the book {field} in '{field}'.")))
}

fn required_str(data: &Map<String, Value>, field: &str) -> ApiResult<String> {
    let value = required_field(data, field)?
        .as_str()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::bad_request("invalid_field", format!("Book {field} in '{field}' must be a non-empty string.")))?;
    Ok(value.to_string())
}
