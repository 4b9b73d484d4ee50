//! Event and user persistence.
//!
//! The [`EventStore`] and [`UserStore`] traits are the seam between the
//! request handlers and the storage backend: [`postgres::PgStore`] implements
//! both against a `sqlx` connection pool, [`mock::MockEventStore`] and
//! [`mock::MockUserStore`] implement them in memory for tests.

use chrono::{DateTime, Utc};

pub mod mock;
pub mod postgres;

pub use postgres::PgStore;

/// Domain-level storage errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No matching record. Past events are reported as absent too.
    #[error("no matching record found")]
    NotFound,

    /// A user with this email address already exists.
    #[error("duplicate email")]
    DuplicateEmail,

    /// Unknown email, wrong password, and inactive user are deliberately
    /// indistinguishable.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Password hashing or verification fault.
    #[error("password hash error: {0}")]
    Hash(String),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

/// An event with a scheduled time, created via the event-creation form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub time: DateTime<Utc>,
}

/// A registered user account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub hashed_password: String,
    pub active: bool,
    pub created: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait EventStore: Send + Sync {
    /// Insert a new event scheduled `days` days from now (UTC, computed at
    /// insert time) and return its assigned id.
    async fn insert(&self, title: &str, description: &str, days: i32) -> Result<i64, Error>;

    /// Fetch one event by id. Events whose time has passed are treated as
    /// absent and yield [`Error::NotFound`].
    async fn get(&self, id: i64) -> Result<Event, Error>;

    /// Upcoming events, newest scheduled time first, capped at 10.
    async fn upcoming(&self) -> Result<Vec<Event>, Error>;
}

#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    /// Create a new user. The password is hashed before storage; a uniqueness
    /// violation on the email maps to [`Error::DuplicateEmail`].
    async fn insert(&self, name: &str, email: &str, password: &str) -> Result<(), Error>;

    /// Verify credentials against the active user with this email and return
    /// the user id on success.
    async fn authenticate(&self, email: &str, password: &str) -> Result<i64, Error>;

    /// Fetch one user by id.
    async fn get(&self, id: i64) -> Result<User, Error>;
}
