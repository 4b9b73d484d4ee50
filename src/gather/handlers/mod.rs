pub mod events;
pub use self::events::{create_event, create_event_form, home, show_event};

pub mod health;
pub use self::health::ping;

pub mod users;
pub use self::users::{login, login_form, logout, signup, signup_form};

// common helpers for the handlers

use chrono::{Datelike, Utc};
use tower_sessions::Session;

use crate::gather::csrf;
use crate::gather::error::AppError;
use crate::gather::pages::Chrome;

/// Session key holding the one-shot flash message.
pub const SESSION_FLASH_KEY: &str = "flash";

/// Build the default data every page render needs. Pops the flash message,
/// so it is shown exactly once.
pub(crate) async fn chrome(session: &Session, is_authenticated: bool) -> Result<Chrome, AppError> {
    Ok(Chrome {
        csrf_token: csrf::token(session).await?,
        flash: session.remove::<String>(SESSION_FLASH_KEY).await?,
        is_authenticated,
        current_year: Utc::now().year(),
    })
}

/// Queue a flash message for the next page render.
pub(crate) async fn flash(session: &Session, message: &str) -> Result<(), AppError> {
    session
        .insert(SESSION_FLASH_KEY, message.to_string())
        .await?;
    Ok(())
}
