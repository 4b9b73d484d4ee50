//! PostgreSQL-backed store.
//!
//! All queries are parameterized and wrapped in `db.query` spans so they show
//! up in the request trace. Event visibility (future time only) is enforced in
//! SQL, not in application code.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, SaltString},
    Argon2, PasswordHasher, PasswordVerifier,
};
use sqlx::{PgPool, Row};
use tracing::Instrument;

use super::{Error, Event, EventStore, User, UserStore};

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn query_span(operation: &str, statement: &str) -> tracing::Span {
    tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}

/// Hash a password with argon2id and a fresh random salt, producing a PHC
/// string for storage.
pub fn hash_password(password: &str) -> Result<String, Error> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| Error::Hash(err.to_string()))
}

/// Verify a password against a stored PHC string.
///
/// A malformed stored hash is a storage fault, not a credentials failure.
pub fn verify_password(password: &str, hashed: &str) -> Result<bool, Error> {
    let parsed = PasswordHash::new(hashed).map_err(|err| Error::Hash(err.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[async_trait::async_trait]
impl EventStore for PgStore {
    async fn insert(&self, title: &str, description: &str, days: i32) -> Result<i64, Error> {
        let query = r"
            INSERT INTO events (title, description, time)
            VALUES ($1, $2, now() + make_interval(days => $3))
            RETURNING id
        ";
        let row = sqlx::query(query)
            .bind(title)
            .bind(description)
            .bind(days)
            .fetch_one(&self.pool)
            .instrument(query_span("INSERT", query))
            .await?;

        Ok(row.get("id"))
    }

    async fn get(&self, id: i64) -> Result<Event, Error> {
        let query = r"
            SELECT id, title, description, time FROM events
            WHERE time > now() AND id = $1
        ";
        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await?
            .ok_or(Error::NotFound)?;

        Ok(Event {
            id: row.get("id"),
            title: row.get("title"),
            description: row.get("description"),
            time: row.get("time"),
        })
    }

    async fn upcoming(&self) -> Result<Vec<Event>, Error> {
        let query = r"
            SELECT id, title, description, time FROM events
            WHERE time > now() ORDER BY time DESC LIMIT 10
        ";
        let rows = sqlx::query(query)
            .fetch_all(&self.pool)
            .instrument(query_span("SELECT", query))
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| Event {
                id: row.get("id"),
                title: row.get("title"),
                description: row.get("description"),
                time: row.get("time"),
            })
            .collect())
    }
}

#[async_trait::async_trait]
impl UserStore for PgStore {
    async fn insert(&self, name: &str, email: &str, password: &str) -> Result<(), Error> {
        // Hashing is CPU-bound, keep it off the async workers.
        let password = password.to_string();
        let hashed = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|err| Error::Hash(err.to_string()))??;

        let query = r"
            INSERT INTO users (name, email, hashed_password, created)
            VALUES ($1, $2, $3, now())
        ";
        let result = sqlx::query(query)
            .bind(name)
            .bind(email)
            .bind(&hashed)
            .execute(&self.pool)
            .instrument(query_span("INSERT", query))
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Err(Error::DuplicateEmail),
            Err(err) => Err(err.into()),
        }
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<i64, Error> {
        let query = r"
            SELECT id, hashed_password FROM users
            WHERE email = $1 AND active = TRUE
        ";
        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await?
            .ok_or(Error::InvalidCredentials)?;

        let id: i64 = row.get("id");
        let hashed: String = row.get("hashed_password");

        let password = password.to_string();
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hashed))
            .await
            .map_err(|err| Error::Hash(err.to_string()))??;

        if matches {
            Ok(id)
        } else {
            Err(Error::InvalidCredentials)
        }
    }

    async fn get(&self, id: i64) -> Result<User, Error> {
        let query = r"
            SELECT id, name, email, hashed_password, active, created FROM users
            WHERE id = $1
        ";
        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await?
            .ok_or(Error::NotFound)?;

        Ok(User {
            id: row.get("id"),
            name: row.get("name"),
            email: row.get("email"),
            hashed_password: row.get("hashed_password"),
            active: row.get("active"),
            created: row.get("created"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password_round_trip() -> Result<(), Error> {
        let hashed = hash_password("correct horse battery staple")?;
        assert!(hashed.starts_with("$argon2id$"));
        assert!(verify_password("correct horse battery staple", &hashed)?);
        assert!(!verify_password("wrong password", &hashed)?);
        Ok(())
    }

    #[test]
    fn test_hash_password_unique_salts() -> Result<(), Error> {
        let first = hash_password("hunter2hunter2")?;
        let second = hash_password("hunter2hunter2")?;
        assert_ne!(first, second);
        Ok(())
    }

    #[test]
    fn test_verify_password_rejects_malformed_hash() {
        let result = verify_password("anything", "not-a-phc-string");
        assert!(matches!(result, Err(Error::Hash(_))));
    }
}
