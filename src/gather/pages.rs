//! Server-rendered HTML pages.
//!
//! All pages are built with maud, so dynamic values are escaped at render
//! time and a missing template is a compile error rather than a runtime 500.

use chrono::{DateTime, Utc};
use maud::{html, Markup, DOCTYPE};

use crate::forms::Form;
use crate::gather::csrf;
use crate::store::Event;

/// Data common to every page: the CSRF token for forms, the one-shot flash
/// message, the authentication state for the nav, and the footer year.
#[derive(Debug, Clone)]
pub struct Chrome {
    pub csrf_token: String,
    pub flash: Option<String>,
    pub is_authenticated: bool,
    pub current_year: i32,
}

/// Nicely formatted representation of an event time.
#[must_use]
pub fn human_date(time: &DateTime<Utc>) -> String {
    time.format("%d %b %Y at %H:%M").to_string()
}

fn csrf_field(chrome: &Chrome) -> Markup {
    html! {
        input type="hidden" name=(csrf::TOKEN_FIELD) value=(chrome.csrf_token);
    }
}

fn field_error(form: &Form, field: &str) -> Markup {
    html! {
        @if let Some(message) = form.errors.get(field) {
            label class="error" { (message) }
        }
    }
}

fn layout(title: &str, chrome: &Chrome, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) " - Gather" }
                link rel="stylesheet" href="/static/main.css";
            }
            body {
                header {
                    h1 { a href="/" { "Gather" } }
                }
                nav {
                    div {
                        a href="/" { "Home" }
                        @if chrome.is_authenticated {
                            a href="/event/create" { "Create event" }
                        }
                    }
                    div {
                        @if chrome.is_authenticated {
                            form action="/user/logout" method="POST" {
                                (csrf_field(chrome))
                                button { "Logout" }
                            }
                        } @else {
                            a href="/user/signup" { "Signup" }
                            a href="/user/login" { "Login" }
                        }
                    }
                }
                main {
                    @if let Some(flash) = &chrome.flash {
                        div class="flash" { (flash) }
                    }
                    (content)
                }
                footer {
                    "Gather " (chrome.current_year)
                }
            }
        }
    }
}

#[must_use]
pub fn home(chrome: &Chrome, events: &[Event]) -> Markup {
    layout(
        "Home",
        chrome,
        html! {
            h2 { "Upcoming events" }
            @if events.is_empty() {
                p { "There's nothing to see here... yet!" }
            } @else {
                table {
                    tr {
                        th { "Title" }
                        th { "Scheduled" }
                        th { "ID" }
                    }
                    @for event in events {
                        tr {
                            td { a href={ "/event/" (event.id) } { (event.title) } }
                            td { (human_date(&event.time)) }
                            td { "#" (event.id) }
                        }
                    }
                }
            }
        },
    )
}

#[must_use]
pub fn event_detail(chrome: &Chrome, event: &Event) -> Markup {
    layout(
        &event.title,
        chrome,
        html! {
            div class="event" {
                div class="metadata" {
                    strong { (event.title) }
                    span { "#" (event.id) }
                }
                pre { code { (event.description) } }
                div class="metadata" {
                    time { "Scheduled for " (human_date(&event.time)) }
                }
            }
        },
    )
}

#[must_use]
pub fn create_event(chrome: &Chrome, form: &Form) -> Markup {
    layout(
        "Create a new event",
        chrome,
        html! {
            form action="/event/create" method="POST" {
                (csrf_field(chrome))
                div {
                    label { "Title" }
                    (field_error(form, "title"))
                    input type="text" name="title" value=(form.get("title"));
                }
                div {
                    label { "Description" }
                    (field_error(form, "description"))
                    textarea name="description" { (form.get("description")) }
                }
                div {
                    label { "Scheduled in" }
                    (field_error(form, "days"))
                    @for (days, text) in [("365", "One year"), ("7", "One week"), ("1", "One day")] {
                        input type="radio" name="days" value=(days) checked[form.get("days") == days];
                        (text)
                    }
                }
                div {
                    input type="submit" value="Create event";
                }
            }
        },
    )
}

#[must_use]
pub fn signup(chrome: &Chrome, form: &Form) -> Markup {
    layout(
        "Signup",
        chrome,
        html! {
            form action="/user/signup" method="POST" novalidate {
                (csrf_field(chrome))
                div {
                    label { "Name" }
                    (field_error(form, "name"))
                    input type="text" name="name" value=(form.get("name"));
                }
                div {
                    label { "Email" }
                    (field_error(form, "email"))
                    input type="email" name="email" value=(form.get("email"));
                }
                div {
                    label { "Password" }
                    (field_error(form, "password"))
                    input type="password" name="password";
                }
                div {
                    input type="submit" value="Signup";
                }
            }
        },
    )
}

#[must_use]
pub fn login(chrome: &Chrome, form: &Form) -> Markup {
    layout(
        "Login",
        chrome,
        html! {
            form action="/user/login" method="POST" novalidate {
                (csrf_field(chrome))
                @if let Some(message) = form.errors.get("generic") {
                    div class="error" { (message) }
                }
                div {
                    label { "Email" }
                    input type="email" name="email" value=(form.get("email"));
                }
                div {
                    label { "Password" }
                    input type="password" name="password";
                }
                div {
                    input type="submit" value="Login";
                }
            }
        },
    )
}

/// Standalone 404 page, rendered without session-derived chrome.
#[must_use]
pub fn not_found() -> Markup {
    error_page("Not Found", "The page or event you asked for does not exist.")
}

/// Standalone generic 500 page. Carries no internal detail.
#[must_use]
pub fn server_error() -> Markup {
    error_page(
        "Internal Server Error",
        "Something went wrong on our side. Please try again later.",
    )
}

fn error_page(title: &str, message: &str) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                title { (title) " - Gather" }
                link rel="stylesheet" href="/static/main.css";
            }
            body {
                main class="error-page" {
                    h1 { (title) }
                    p { (message) }
                    a href="/" { "Back to Gather" }
                }
            }
        }
    }
}
