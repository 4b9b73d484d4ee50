//! Request interceptors: authentication resolution, the authorization gate,
//! and the panic-recovery response.

use axum::{
    extract::Request,
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Extension,
};
use std::any::Any;
use std::sync::Arc;
use tower_sessions::Session;
use tracing::error;

use crate::gather::error::AppError;
use crate::gather::{pages, AppState};
use crate::store;

/// Session key holding the logged-in user's id.
pub const SESSION_AUTH_KEY: &str = "authenticatedUserID";

/// Request extension marking an authenticated request context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
}

/// Resolve the session's user id against the store.
///
/// A session pointing at a removed or deactivated account is treated as an
/// implicit logout: the identifier is cleared and the request proceeds
/// anonymous. Any other store failure aborts with a server error.
pub async fn authenticate(
    Extension(state): Extension<Arc<AppState>>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(id) = session.get::<i64>(SESSION_AUTH_KEY).await? else {
        return Ok(next.run(request).await);
    };

    match state.users.get(id).await {
        Ok(user) if user.active => {
            request.extensions_mut().insert(AuthUser { id: user.id });
        }
        Ok(_) | Err(store::Error::NotFound) => {
            session.remove::<i64>(SESSION_AUTH_KEY).await?;
        }
        Err(err) => return Err(err.into()),
    }

    Ok(next.run(request).await)
}

/// Authorization gate for routes that require a logged-in user.
///
/// Anonymous requests are redirected to the login page and never reach the
/// handler; responses for authenticated requests are marked non-cacheable
/// since the page content is per-user.
pub async fn require_authentication(request: Request, next: Next) -> Response {
    if request.extensions().get::<AuthUser>().is_none() {
        let mut response = Redirect::to("/user/login").into_response();
        response
            .headers_mut()
            .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        return response;
    }

    let mut response = next.run(request).await;
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

/// Convert a handler panic into a generic 500 response.
///
/// The panic detail goes to the error log only, never to the client, and the
/// connection is marked for closure.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");

    error!("panic while handling request: {detail}");

    let mut response = (StatusCode::INTERNAL_SERVER_ERROR, pages::server_error()).into_response();
    response
        .headers_mut()
        .insert(header::CONNECTION, HeaderValue::from_static("close"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_panic_hides_detail_and_closes_connection() {
        let response = handle_panic(Box::new("database exploded".to_string()));

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers().get(header::CONNECTION),
            Some(&HeaderValue::from_static("close"))
        );
    }

    #[test]
    fn test_handle_panic_str_payload() {
        let response = handle_panic(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
