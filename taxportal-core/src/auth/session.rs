use anyhow::Result;
use log::info;

use crate::error::AuthError;
use crate::models::{User, USER_KEY};
use crate::store::RecordStore;

/// The signed-in user, held explicitly and handed to whatever needs it
///
/// The user is mirrored under `demoUser` so the next process can restore it.
#[derive(Debug, Clone, Default)]
pub struct Session {
    current_user: Option<User>,
}

impl Session {
    /// A session with nobody signed in
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Restores the persisted user; a corrupt record is dropped
    pub fn restore(store: &RecordStore) -> Result<Self> {
        Ok(Self {
            current_user: store.load_optional(USER_KEY)?,
        })
    }

    pub fn current_user(&self) -> Option<&User> {
        self.current_user.as_ref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.current_user.is_some()
    }

    pub fn require_user(&self) -> Result<&User, AuthError> {
        self.current_user.as_ref().ok_or(AuthError::NotLoggedIn)
    }

    /// Replaces the current user wholesale and persists it
    pub fn login(&mut self, store: &RecordStore, user: User) -> Result<()> {
        store.save(USER_KEY, &user)?;
        info!("Logged in as {} ({})", user.display_name, user.uid);
        self.current_user = Some(user);
        Ok(())
    }

    pub fn logout(&mut self, store: &RecordStore) -> Result<()> {
        store.remove(USER_KEY)?;
        if let Some(user) = self.current_user.take() {
            info!("Logged out {}", user.uid);
        }
        Ok(())
    }
}
