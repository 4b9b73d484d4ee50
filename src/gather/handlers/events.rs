//! Event browsing and creation.

use axum::{
    extract::{Extension, Path},
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
use crate::gather::middleware::AuthUser;
use crate::gather::{pages, AppState};

/// GET / - list upcoming events.
pub async fn home(
    Extension(state): Extension<Arc<AppState>>,
    session: Session,
    auth: Option<Extension<AuthUser>>,
) -> Result<Response, AppError> {
    let events = state.events.upcoming().await?;
    let chrome = chrome(&session, auth.is_some()).await?;

    Ok(pages::home(&chrome, &events).into_response())
}

/// GET /event/:id - show one upcoming event. Past or unknown events are 404.
pub async fn show_event(
    Extension(state): Extension<Arc<AppState>>,
    session: Session,
    auth: Option<Extension<AuthUser>>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let event = state.events.get(id).await?;
    let chrome = chrome(&session, auth.is_some()).await?;

    Ok(pages::event_detail(&chrome, &event).into_response())
}

/// GET /event/create - render the event-creation form. Auth-gated.
pub async fn create_event_form(session: Session) -> Result<Response, AppError> {
    let chrome = chrome(&session, true).await?;

    Ok(pages::create_event(&chrome, &forms::Form::default()).into_response())
}

/// POST /event/create - validate and insert a new event. Auth-gated.
pub async fn create_event(
    Extension(state): Extension<Arc<AppState>>,
    session: Session,
    Form(values): Form<HashMap<String, String>>,
) -> Result<Response, AppError> {
    let mut form = forms::Form::new(values);
    form.required(&["title", "description", "days"]);
    form.max_length("title", 100);
    form.permitted_values("days", &["365", "7", "1"]);

    if !form.valid() {
        let chrome = chrome(&session, true).await?;
        return Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            pages::create_event(&chrome, &form),
        )
            .into_response());
    }

    // permitted_values already pinned this to a numeric literal
    let days: i32 = form
        .get("days")
        .parse()
        .map_err(|err| anyhow::anyhow!("invalid days value: {err}"))?;

    let id = state
        .events
        .insert(form.get("title"), form.get("description"), days)
        .await?;

    flash(&session, "Event successfully created!").await?;

    Ok(Redirect::to(&format!("/event/{id}")).into_response())
}
