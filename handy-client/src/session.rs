//! Explicit client session.
//!
//! A [`Session`] holds the bearer token every request is signed with. It is
//! cloned into each client; all clones see the same login state.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use handy_core::UserId;
use tracing::debug;

/// What the client knows about the logged-in caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub token: String,
    /// Filled in once the server has confirmed who the token belongs to.
    pub user_id: Option<UserId>,
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    inner: Arc<RwLock<Option<SessionContext>>>,
}

impl Session {
    /// A session that is not logged in.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A session signed with `token`.
    pub fn login(token: impl Into<String>) -> Self {
        let session = Self::default();
        *session.write() = Some(SessionContext {
            token: token.into(),
            user_id: None,
        });
        session
    }

    /// Swap in a fresh token. The known user id is kept.
    pub fn refresh(&self, token: impl Into<String>) {
        let mut guard = self.write();
        let user_id = guard.as_ref().and_then(|ctx| ctx.user_id);
        *guard = Some(SessionContext {
            token: token.into(),
            user_id,
        });
        debug!(?user_id, "Session token refreshed");
    }

    /// Log out. Later requests fail with `NotLoggedIn`.
    pub fn clear(&self) {
        *self.write() = None;
        debug!("Session cleared");
    }

    pub fn current(&self) -> Option<SessionContext> {
        self.read().clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.read().is_some()
    }

    pub(crate) fn bearer(&self) -> Option<String> {
        self.read()
            .as_ref()
            .map(|ctx| format!("Bearer {}", ctx.token))
    }

    pub(crate) fn bind_user(&self, user_id: UserId) {
        if let Some(ctx) = self.write().as_mut() {
            ctx.user_id = Some(user_id);
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<SessionContext>> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<SessionContext>> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
