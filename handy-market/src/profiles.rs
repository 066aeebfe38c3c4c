//! Profile Service
//!
//! Users are registered by the external identity gateway. The first
//! authenticated request from a user provisions their `User` row and an
//! empty profile; later calls are no-ops.

use std::sync::Arc;

use chrono::Utc;
use handy_core::{
    EntityType, HandyResult, HelperProfile, HelperProfileUpdate, Profile, ProfileUpdate,
    StorageError, TaskCategory, User, UserId, UserRole, UserStatus, WorkflowError,
};
use handy_storage::MarketplaceStore;
use tracing::info;

use crate::{AuthContext, ProfileView};

#[derive(Clone)]
pub struct ProfileService {
    store: Arc<dyn MarketplaceStore>,
}

impl ProfileService {
    pub fn new(store: Arc<dyn MarketplaceStore>) -> Self {
        Self { store }
    }

    /// Make sure the caller has a user row and a profile. Idempotent.
    pub async fn provision(&self, ctx: &AuthContext) -> HandyResult<Profile> {
        let now = Utc::now();
        if self.store.user_get(ctx.user_id).await?.is_none() {
            self.store
                .user_upsert(&User {
                    id: ctx.user_id,
                    email: ctx.email.clone(),
                    phone: None,
                    role: ctx.role,
                    status: UserStatus::Active,
                    created_at: now,
                })
                .await?;
            info!(user_id = %ctx.user_id, role = %ctx.role, "User provisioned");
        }
        self.store
            .profile_insert_if_absent(&Profile::empty(
                ctx.user_id,
                ctx.default_display_name(),
                now,
            ))
            .await
    }

    pub async fn get_profile(&self, user_id: UserId) -> HandyResult<ProfileView> {
        let profile = self
            .store
            .profile_get(user_id)
            .await?
            .ok_or_else(|| StorageError::not_found(EntityType::Profile, user_id))?;
        let helper_profile = self.store.helper_profile_get(user_id).await?;
        Ok(ProfileView {
            profile,
            helper_profile,
        })
    }

    pub async fn update_profile(
        &self,
        ctx: &AuthContext,
        update: ProfileUpdate,
    ) -> HandyResult<Profile> {
        let profile = self
            .store
            .profile_update(ctx.user_id, update, Utc::now())
            .await?;
        info!(user_id = %ctx.user_id, "Profile updated");
        Ok(profile)
    }

    /// Create or refresh the caller's helper profile.
    pub async fn upsert_helper_profile(
        &self,
        ctx: &AuthContext,
        update: HelperProfileUpdate,
    ) -> HandyResult<HelperProfile> {
        if !ctx.acts_as(UserRole::Helper) {
            return Err(WorkflowError::forbidden(
                "edit a helper profile",
                "only helpers have helper profiles",
            )
            .into());
        }
        let profile = self
            .store
            .helper_profile_upsert(ctx.user_id, update, Utc::now())
            .await?;
        info!(user_id = %ctx.user_id, skills = profile.skills.len(), "Helper profile saved");
        Ok(profile)
    }
}

/// Browsable task categories.
#[derive(Clone)]
pub struct CategoryService {
    store: Arc<dyn MarketplaceStore>,
}

impl CategoryService {
    pub fn new(store: Arc<dyn MarketplaceStore>) -> Self {
        Self { store }
    }

    /// Active categories in display order.
    pub async fn list(&self) -> HandyResult<Vec<TaskCategory>> {
        self.store.category_list(false).await
    }
}
