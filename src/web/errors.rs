use askama::Template;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use tracing::error;

use super::views::{Nav, NotFoundPage};
use crate::client::ApiError;

/// Application error type for web handlers.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    Validation(String),
    Upstream(ApiError),
    Internal(String),
}

impl From<ApiError> for AppError {
    fn from(err: ApiError) -> Self {
        match err.status() {
            Some(404) => AppError::NotFound(err.message().to_string()),
            _ => AppError::Upstream(err),
        }
    }
}

impl From<askama::Error> for AppError {
    fn from(err: askama::Error) -> Self {
        AppError::Internal(format!("template error: {err}"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => {
                let page = NotFoundPage {
                    nav: Nav::for_path(""),
                    message: msg,
                };
                return match page.render() {
                    Ok(html) => (StatusCode::NOT_FOUND, Html(html)).into_response(),
                    Err(e) => (StatusCode::NOT_FOUND, e.to_string()).into_response(),
                };
            }
            AppError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::Upstream(err) => {
                error!("task api failure: {err}");
                (StatusCode::BAD_GATEWAY, err.message().to_string())
            }
            AppError::Internal(msg) => {
                error!("{msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };
        (status, message).into_response()
    }
}
