//! Login, registration and the current-session record.
//!
//! Passwords are kept and compared as plain text. Matching is exact, so a
//! password that differs only in letter case is rejected.

use tracing::{debug, info, warn};

use crate::error::StoreResult;
use crate::models::{NewUser, User};
use crate::repository::Repository;
use crate::storage::KvStore;

pub fn verify_password(given: &str, stored: &str) -> bool {
    given == stored
}

impl<S: KvStore> Repository<S> {
    /// Log in as the first user with this exact email, if the password
    /// matches. On success the user becomes the session.
    pub fn login(&self, email: &str, password: &str) -> StoreResult<Option<User>> {
        let Some(user) = self.find_user_by_email(email)? else {
            debug!(email, "login: unknown email");
            return Ok(None);
        };
        if !verify_password(password, &user.password) {
            debug!(email, "login: password mismatch");
            return Ok(None);
        }
        self.write_session(&user)?;
        info!(user_id = %user.id, "user logged in");
        Ok(Some(user))
    }

    /// Create an account and start a session for it.
    ///
    /// An email that is already registered is accepted; only a warning is
    /// logged. Later logins with that email resolve to the older account.
    pub fn register(&self, draft: NewUser) -> StoreResult<User> {
        if self.find_user_by_email(&draft.email)?.is_some() {
            warn!(email = %draft.email, "registering an email that already exists");
        }
        let user = self.create_user(draft)?;
        self.write_session(&user)?;
        info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    pub fn logout(&self) -> StoreResult<()> {
        self.clear_session()?;
        info!("user logged out");
        Ok(())
    }
}
