//! Authenticated caller identity.

use handy_core::{UserId, UserRole};
use serde::{Deserialize, Serialize};

/// Who is making a request.
///
/// Built by the transport layer from a validated token and passed into every
/// service call. There is no ambient "current user".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AuthContext {
    pub user_id: UserId,
    pub email: String,
    pub role: UserRole,
}

impl AuthContext {
    pub fn new(user_id: UserId, email: impl Into<String>, role: UserRole) -> Self {
        Self {
            user_id,
            email: email.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// True for `role` itself and for admins.
    pub fn acts_as(&self, role: UserRole) -> bool {
        self.role == role || self.is_admin()
    }

    /// Display name derived from the email local part.
    pub fn default_display_name(&self) -> String {
        self.email
            .split('@')
            .next()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or("New user")
            .to_string()
    }
}
