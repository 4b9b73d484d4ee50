//! Application error type for the request pipeline.
//!
//! Internal errors bubble up unwrapped through handlers with `?` and are
//! classified exactly once here: not-found becomes a 404 page, everything
//! else is logged with full detail and rendered as a generic 500 page. No
//! internal detail ever reaches the response body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::gather::pages;
use crate::store;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The requested record does not exist (or is no longer upcoming).
    #[error("not found")]
    NotFound,

    /// Unexpected internal fault (database, session store, ...).
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<store::Error> for AppError {
    fn from(err: store::Error) -> Self {
        match err {
            store::Error::NotFound => Self::NotFound,
            other => Self::Internal(anyhow::Error::new(other)),
        }
    }
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::Internal(anyhow::Error::new(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::NotFound => (StatusCode::NOT_FOUND, pages::not_found()).into_response(),
            Self::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, pages::server_error()).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_404() {
        let response = AppError::NotFound.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_store_not_found_maps_to_not_found() {
        let err: AppError = store::Error::NotFound.into();
        assert!(matches!(err, AppError::NotFound));
    }

    #[test]
    fn test_store_fault_maps_to_internal() {
        let err: AppError = store::Error::Hash("bad phc string".to_string()).into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
