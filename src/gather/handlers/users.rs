//! Signup, login, and logout.

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use std::collections::HashMap;
use std::sync::Arc;
use tower_sessions::Session;

use super::{chrome, flash};
use crate::forms;
use crate::gather::error::AppError;
use crate::gather::middleware::SESSION_AUTH_KEY;
use crate::gather::{pages, AppState};
use crate::store;

/// GET /user/signup - render the signup form.
pub async fn signup_form(session: Session) -> Result<Response, AppError> {
    let chrome = chrome(&session, false).await?;

    Ok(pages::signup(&chrome, &forms::Form::default()).into_response())
}

/// POST /user/signup - validate and create the account.
pub async fn signup(
    Extension(state): Extension<Arc<AppState>>,
    session: Session,
    Form(values): Form<HashMap<String, String>>,
) -> Result<Response, AppError> {
    let mut form = forms::Form::new(values);
    form.required(&["name", "email", "password"]);
    form.matches_pattern("email", forms::email_pattern());
    form.min_length("password", 10);

    if !form.valid() {
        return rerender_signup(&session, form).await;
    }

    match state
        .users
        .insert(form.get("name"), form.get("email"), form.get("password"))
        .await
    {
        Ok(()) => {}
        Err(store::Error::DuplicateEmail) => {
            form.errors.add("email", "Address is already in use");
            return rerender_signup(&session, form).await;
        }
        Err(err) => return Err(err.into()),
    }

    flash(&session, "Your signup was successful. Please log in.").await?;

    Ok(Redirect::to("/user/login").into_response())
}

async fn rerender_signup(session: &Session, form: forms::Form) -> Result<Response, AppError> {
    let chrome = chrome(session, false).await?;
    Ok((StatusCode::UNPROCESSABLE_ENTITY, pages::signup(&chrome, &form)).into_response())
}

/// GET /user/login - render the login form.
pub async fn login_form(session: Session) -> Result<Response, AppError> {
    let chrome = chrome(&session, false).await?;

    Ok(pages::login(&chrome, &forms::Form::default()).into_response())
}

/// POST /user/login - verify credentials and mark the session authenticated.
pub async fn login(
    Extension(state): Extension<Arc<AppState>>,
    session: Session,
    Form(values): Form<HashMap<String, String>>,
) -> Result<Response, AppError> {
    let mut form = forms::Form::new(values);

    let id = match state
        .users
        .authenticate(form.get("email"), form.get("password"))
        .await
    {
        Ok(id) => id,
        Err(store::Error::InvalidCredentials) => {
            form.errors.add("generic", "Email or Password is incorrect");
            let chrome = chrome(&session, false).await?;
            return Ok(
                (StatusCode::UNPROCESSABLE_ENTITY, pages::login(&chrome, &form)).into_response(),
            );
        }
        Err(err) => return Err(err.into()),
    };

    // Fresh session id on privilege change.
    session.cycle_id().await?;
    session.insert(SESSION_AUTH_KEY, id).await?;

    Ok(Redirect::to("/event/create").into_response())
}

/// POST /user/logout - clear the authenticated identifier. Auth-gated.
pub async fn logout(session: Session) -> Result<Response, AppError> {
    session.remove::<i64>(SESSION_AUTH_KEY).await?;

    flash(&session, "You've been logged out successfully!").await?;

    Ok(Redirect::to("/").into_response())
}
