//! Explicit session context: who is signed in and with which token
//!
//! The session mirrors its contents to an injected [`KeyValueStore`] and
//! publishes changes on a watch channel so that the telemetry supervisor can
//! start and stop polling as the signed-in device changes.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::store::KeyValueStore;

pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";

/// Profile of the signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub device_id: String,
}

/// Body returned by the login and register endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

/// Current contents of the session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub token: Option<String>,
    pub user: Option<User>,
}

impl SessionSnapshot {
    pub fn device_id(&self) -> Option<&str> {
        if self.token.is_none() {
            return None;
        }
        self.user
            .as_ref()
            .map(|u| u.device_id.as_str())
            .filter(|id| !id.is_empty())
    }
}

#[derive(Debug)]
pub struct Session {
    store: Arc<dyn KeyValueStore>,
    current: watch::Sender<SessionSnapshot>,
}

impl Session {
    /// Rebuild the session from whatever the store holds
    pub fn restore(store: Arc<dyn KeyValueStore>) -> Self {
        let token = store.get(TOKEN_KEY);
        let user = store
            .get(USER_KEY)
            .and_then(|raw| match serde_json::from_str::<User>(&raw) {
                Ok(user) => Some(user),
                Err(e) => {
                    tracing::debug!("Ignoring unreadable stored user: {}", e);
                    None
                }
            });

        tracing::debug!(
            "Restored session: token={}, user={:?}",
            token.is_some(),
            user.as_ref().map(|u| &u.email)
        );

        let (current, _) = watch::channel(SessionSnapshot { token, user });
        Self { store, current }
    }

    /// Adopt the credentials returned by a successful login or registration
    pub fn establish(&self, auth: &AuthResponse) -> crate::Result<()> {
        let previous_user = self.store.get(USER_KEY);
        self.store
            .set(USER_KEY, &serde_json::to_string(&auth.user)?)?;
        if let Err(e) = self.store.set(TOKEN_KEY, &auth.token) {
            let restored = match previous_user {
                Some(raw) => self.store.set(USER_KEY, &raw),
                None => self.store.clear(USER_KEY),
            };
            if let Err(restore_err) = restored {
                tracing::warn!("Failed to restore stored user: {}", restore_err);
            }
            return Err(e);
        }
        tracing::info!(
            "Signed in as {} (device {})",
            auth.user.email,
            auth.user.device_id
        );
        self.current.send_replace(SessionSnapshot {
            token: Some(auth.token.clone()),
            user: Some(auth.user.clone()),
        });
        Ok(())
    }

    /// Forget token and user, both in memory and in the store
    pub fn clear(&self) {
        if let Err(e) = self.store.clear(TOKEN_KEY) {
            tracing::warn!("Failed to clear stored token: {}", e);
        }
        if let Err(e) = self.store.clear(USER_KEY) {
            tracing::warn!("Failed to clear stored user: {}", e);
        }
        let was_signed_in = self.current.borrow().token.is_some();
        self.current.send_replace(SessionSnapshot::default());
        if was_signed_in {
            tracing::info!("Session cleared");
        }
    }

    /// Drop an expired or rejected token
    pub fn expire(&self) {
        tracing::warn!("Backend rejected the session token; signing out");
        self.clear();
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.current.borrow().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.current.borrow().token.clone()
    }

    pub fn user(&self) -> Option<User> {
        self.current.borrow().user.clone()
    }

    pub fn device_id(&self) -> Option<String> {
        self.current.borrow().device_id().map(str::to_string)
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.borrow().token.is_some()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.current.subscribe()
    }
}
