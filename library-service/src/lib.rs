pub mod app;
pub mod app_state;
pub mod book_handlers;
pub mod catalog;
pub mod config;

pub use common_http_errors::ApiError;
