//! In-memory store used by the pipeline tests.
//!
//! Satisfies the same contracts as [`super::PgStore`] and additionally counts
//! calls, so tests can assert that rejected requests never reached the store.

use chrono::{Duration, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{Error, Event, EventStore, User, UserStore};

#[derive(Debug, Default)]
pub struct MockEventStore {
    events: Mutex<Vec<Event>>,
    pub insert_calls: AtomicUsize,
}

impl MockEventStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an event directly, bypassing the "days from now" computation.
    pub fn seed(&self, title: &str, description: &str, time: chrono::DateTime<Utc>) -> i64 {
        let mut events = self.events.lock().expect("events lock");
        let id = events.len() as i64 + 1;
        events.push(Event {
            id,
            title: title.to_string(),
            description: description.to_string(),
            time,
        });
        id
    }
}

#[async_trait::async_trait]
impl EventStore for MockEventStore {
    async fn insert(&self, title: &str, description: &str, days: i32) -> Result<i64, Error> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.seed(title, description, Utc::now() + Duration::days(i64::from(days))))
    }

    async fn get(&self, id: i64) -> Result<Event, Error> {
        let events = self.events.lock().expect("events lock");
        events
            .iter()
            .find(|evt| evt.id == id && evt.time > Utc::now())
            .cloned()
            .ok_or(Error::NotFound)
    }

    async fn upcoming(&self) -> Result<Vec<Event>, Error> {
        let events = self.events.lock().expect("events lock");
        let now = Utc::now();
        let mut upcoming: Vec<Event> = events
            .iter()
            .filter(|evt| evt.time > now)
            .cloned()
            .collect();
        upcoming.sort_by(|a, b| b.time.cmp(&a.time));
        upcoming.truncate(10);
        Ok(upcoming)
    }
}

#[derive(Debug, Default)]
pub struct MockUserStore {
    users: Mutex<Vec<(User, String)>>,
    pub insert_calls: AtomicUsize,
}

impl MockUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user with a plain-text password and return its id.
    pub fn seed(&self, name: &str, email: &str, password: &str, active: bool) -> i64 {
        let mut users = self.users.lock().expect("users lock");
        let id = users.len() as i64 + 1;
        users.push((
            User {
                id,
                name: name.to_string(),
                email: email.to_string(),
                hashed_password: format!("mock-hash:{password}"),
                active,
                created: Utc::now(),
            },
            password.to_string(),
        ));
        id
    }

    /// Drop a seeded user, simulating deletion behind an existing session.
    pub fn remove(&self, id: i64) {
        let mut users = self.users.lock().expect("users lock");
        users.retain(|(user, _)| user.id != id);
    }
}

#[async_trait::async_trait]
impl UserStore for MockUserStore {
    async fn insert(&self, name: &str, email: &str, password: &str) -> Result<(), Error> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        {
            let users = self.users.lock().expect("users lock");
            if users.iter().any(|(user, _)| user.email == email) {
                return Err(Error::DuplicateEmail);
            }
        }
        self.seed(name, email, password, true);
        Ok(())
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<i64, Error> {
        let users = self.users.lock().expect("users lock");
        users
            .iter()
            .find(|(user, stored)| user.email == email && user.active && stored == password)
            .map(|(user, _)| user.id)
            .ok_or(Error::InvalidCredentials)
    }

    async fn get(&self, id: i64) -> Result<User, Error> {
        let users = self.users.lock().expect("users lock");
        users
            .iter()
            .find(|(user, _)| user.id == id)
            .map(|(user, _)| user.clone())
            .ok_or(Error::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_round_trip() -> Result<(), Error> {
        let store = MockEventStore::new();
        let before = Utc::now();
        let id = store.insert("Music festival", "Always fun.", 1).await?;

        let event = store.get(id).await?;
        assert_eq!(event.title, "Music festival");
        assert_eq!(event.description, "Always fun.");
        assert!(event.time > before);

        assert!(matches!(store.get(999).await, Err(Error::NotFound)));
        Ok(())
    }

    #[tokio::test]
    async fn test_past_events_are_absent() {
        let store = MockEventStore::new();
        let id = store.seed("Yesterday", "Too late.", Utc::now() - Duration::days(1));

        assert!(matches!(store.get(id).await, Err(Error::NotFound)));
        assert!(store.upcoming().await.expect("upcoming").is_empty());
    }

    #[tokio::test]
    async fn test_upcoming_caps_at_ten_descending() -> Result<(), Error> {
        let store = MockEventStore::new();
        for days in 1..=12 {
            store.insert(&format!("event-{days}"), "d", days).await?;
        }
        store.seed("past", "gone", Utc::now() - Duration::hours(1));

        let upcoming = store.upcoming().await?;
        assert_eq!(upcoming.len(), 10);

        let now = Utc::now();
        for pair in upcoming.windows(2) {
            assert!(pair[0].time >= pair[1].time);
        }
        assert!(upcoming.iter().all(|evt| evt.time > now));
        Ok(())
    }

    #[tokio::test]
    async fn test_authenticate_failures_are_indistinguishable() {
        let store = MockUserStore::new();
        store.seed("Alice", "alice@example.com", "letmein-letmein", true);
        store.seed("Bob", "bob@example.com", "letmein-letmein", false);

        // wrong password
        let wrong = store.authenticate("alice@example.com", "nope").await;
        // unknown email
        let unknown = store.authenticate("carol@example.com", "letmein-letmein").await;
        // inactive user, correct credentials
        let inactive = store.authenticate("bob@example.com", "letmein-letmein").await;

        for outcome in [wrong, unknown, inactive] {
            assert!(matches!(outcome, Err(Error::InvalidCredentials)));
        }

        let id = store
            .authenticate("alice@example.com", "letmein-letmein")
            .await
            .expect("valid credentials");
        assert_eq!(id, 1);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = MockUserStore::new();
        store
            .insert("Alice", "alice@example.com", "letmein-letmein")
            .await
            .expect("first insert");

        let duplicate = store
            .insert("Other Alice", "alice@example.com", "different-pass")
            .await;
        assert!(matches!(duplicate, Err(Error::DuplicateEmail)));
        assert_eq!(store.insert_calls.load(Ordering::SeqCst), 2);
    }
}
