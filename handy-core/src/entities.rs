//! Persisted entities of the marketplace

use crate::{
    ApplicationId, ApplicationStatus, BackgroundCheckStatus, BudgetType, CategoryId,
    ConversationId, MessageId, NotificationId, NotificationType, ReviewId, TaskId, TaskStatus,
    Timestamp, UserId, UserRole, UserStatus, ValidationError,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Maximum length of a task title, in characters.
pub const MAX_TITLE_LENGTH: usize = 200;

// ============================================================================
// VALIDATION HELPERS
// ============================================================================

/// Require a non-blank string, returning it trimmed.
pub fn require_text(field: &str, value: Option<String>) -> Result<String, ValidationError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ValidationError::missing(field)),
    }
}

/// Require a finite, non-negative monetary amount.
pub fn validate_amount(field: &str, amount: f64) -> Result<f64, ValidationError> {
    if !amount.is_finite() {
        return Err(ValidationError::invalid(field, "must be a finite number"));
    }
    if amount < 0.0 {
        return Err(ValidationError::invalid(field, "must not be negative"));
    }
    Ok(amount)
}

/// Require a review rating within 1..=5.
pub fn validate_rating(rating: u8) -> Result<u8, ValidationError> {
    if !(1..=5).contains(&rating) {
        return Err(ValidationError::invalid(
            "rating",
            format!("must be between 1 and 5, got {}", rating),
        ));
    }
    Ok(rating)
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

// ============================================================================
// USERS AND PROFILES
// ============================================================================

/// A registered account. Owned by the identity gateway; role never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub status: UserStatus,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
}

/// Structured postal address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Address {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
}

/// Display and contact data, one per user.
///
/// `rating` and `review_count` are cached aggregates owned by the review
/// workflow; profile updates never touch them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Profile {
    pub user_id: UserId,
    pub name: String,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub zip_code: Option<String>,
    pub address: Option<Address>,
    pub emergency_contact: Option<String>,
    pub rating: Option<f64>,
    pub review_count: u32,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub updated_at: Timestamp,
}

impl Profile {
    /// Blank profile created when a user is first provisioned.
    pub fn empty(user_id: UserId, name: impl Into<String>, now: Timestamp) -> Self {
        Self {
            user_id,
            name: name.into(),
            avatar_url: None,
            bio: None,
            phone: None,
            zip_code: None,
            address: None,
            emergency_contact: None,
            rating: None,
            review_count: 0,
            updated_at: now,
        }
    }

    /// Apply a partial update. Absent fields are left untouched.
    pub fn apply(&mut self, update: ProfileUpdate, now: Timestamp) -> Result<(), ValidationError> {
        if let Some(name) = update.name {
            self.name = require_text("name", Some(name))?;
        }
        if update.avatar_url.is_some() {
            self.avatar_url = blank_to_none(update.avatar_url);
        }
        if update.bio.is_some() {
            self.bio = blank_to_none(update.bio);
        }
        if update.phone.is_some() {
            self.phone = blank_to_none(update.phone);
        }
        if update.zip_code.is_some() {
            self.zip_code = blank_to_none(update.zip_code);
        }
        if let Some(address) = update.address {
            self.address = Some(address);
        }
        if update.emergency_contact.is_some() {
            self.emergency_contact = blank_to_none(update.emergency_contact);
        }
        self.updated_at = now;
        Ok(())
    }
}

/// Partial profile update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub zip_code: Option<String>,
    pub address: Option<Address>,
    pub emergency_contact: Option<String>,
}

/// Extra profile data for helper-role users, created lazily after signup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HelperProfile {
    pub user_id: UserId,
    pub skills: Vec<String>,
    pub hourly_rate: Option<f64>,
    pub service_areas: Vec<String>,
    pub availability: Vec<String>,
    pub background_check_status: BackgroundCheckStatus,
    pub insurance_verified: bool,
    pub license_info: Option<String>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub updated_at: Timestamp,
}

/// Fields a helper may set on their own helper profile.
///
/// Background check and insurance status are set by platform staff.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HelperProfileUpdate {
    #[serde(default)]
    pub skills: Vec<String>,
    pub hourly_rate: Option<f64>,
    #[serde(default)]
    pub service_areas: Vec<String>,
    #[serde(default)]
    pub availability: Vec<String>,
    pub license_info: Option<String>,
}

impl HelperProfile {
    /// Build or refresh a helper profile from an update, keeping staff-owned fields.
    pub fn from_update(
        user_id: UserId,
        existing: Option<&HelperProfile>,
        update: HelperProfileUpdate,
        now: Timestamp,
    ) -> Result<Self, ValidationError> {
        let hourly_rate = update
            .hourly_rate
            .map(|rate| validate_amount("hourly_rate", rate))
            .transpose()?;
        let clean = |items: Vec<String>| -> Vec<String> {
            items
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        };
        Ok(Self {
            user_id,
            skills: clean(update.skills),
            hourly_rate,
            service_areas: clean(update.service_areas),
            availability: clean(update.availability),
            background_check_status: existing
                .map(|p| p.background_check_status)
                .unwrap_or_default(),
            insurance_verified: existing.map(|p| p.insurance_verified).unwrap_or(false),
            license_info: blank_to_none(update.license_info),
            updated_at: now,
        })
    }
}

// ============================================================================
// TASKS
// ============================================================================

/// Canonical budget shape: an optional amount plus how it is charged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Budget {
    pub amount: Option<f64>,
    #[serde(rename = "type")]
    pub budget_type: BudgetType,
}

impl Budget {
    /// Parse a budget from untyped JSON.
    ///
    /// Only the `{amount, type}` object is accepted. A bare number (the legacy
    /// flat shape) is rejected rather than guessed at.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, ValidationError> {
        let object = match value {
            serde_json::Value::Object(map) => map,
            serde_json::Value::Number(_) => {
                return Err(ValidationError::invalid(
                    "budget",
                    "flat amounts are not accepted, send {\"amount\": .., \"type\": \"fixed\"|\"hourly\"}",
                ))
            }
            _ => return Err(ValidationError::invalid("budget", "must be an object")),
        };

        let budget_type = match object.get("type") {
            None | Some(serde_json::Value::Null) => {
                return Err(ValidationError::missing("budget_type"))
            }
            Some(serde_json::Value::String(s)) => BudgetType::from_db_str(s)
                .map_err(|e| ValidationError::invalid("budget_type", e.to_string()))?,
            Some(_) => return Err(ValidationError::invalid("budget_type", "must be a string")),
        };

        let amount = match object.get("amount") {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::Number(n)) => {
                let amount = n
                    .as_f64()
                    .ok_or_else(|| ValidationError::invalid("budget.amount", "not a number"))?;
                Some(validate_amount("budget.amount", amount)?)
            }
            Some(_) => return Err(ValidationError::invalid("budget.amount", "must be a number")),
        };

        Ok(Budget {
            amount,
            budget_type,
        })
    }
}

/// Where the work happens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Location {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zip_code: String,
}

impl Location {
    fn validated(self) -> Result<Self, ValidationError> {
        Ok(Location {
            address: blank_to_none(self.address),
            city: require_text("location.city", Some(self.city))?,
            state: require_text("location.state", Some(self.state))?,
            zip_code: require_text("location.zip_code", Some(self.zip_code))?,
        })
    }
}

/// Unvalidated task input as submitted by a poster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TaskDraft {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    /// `{"amount": number | null, "type": "fixed" | "hourly"}`
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Budget>))]
    pub budget: Option<serde_json::Value>,
    pub location: Option<Location>,
    pub preferred_date: Option<NaiveDate>,
    pub preferred_time: Option<String>,
}

/// Task fields that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskFields {
    pub title: String,
    pub description: String,
    pub category: String,
    pub budget: Budget,
    pub location: Location,
    pub preferred_date: Option<NaiveDate>,
    pub preferred_time: Option<String>,
}

impl TaskDraft {
    /// Check required fields (title, description, category, budget type, location).
    pub fn validate(self) -> Result<TaskFields, ValidationError> {
        let title = require_text("title", self.title)?;
        if title.chars().count() > MAX_TITLE_LENGTH {
            return Err(ValidationError::invalid(
                "title",
                format!("must be at most {} characters", MAX_TITLE_LENGTH),
            ));
        }
        let description = require_text("description", self.description)?;
        let category = require_text("category", self.category)?;
        let budget = match self.budget {
            Some(value) => Budget::from_json(&value)?,
            None => return Err(ValidationError::missing("budget_type")),
        };
        let location = self
            .location
            .ok_or_else(|| ValidationError::missing("location"))?
            .validated()?;

        Ok(TaskFields {
            title,
            description,
            category,
            budget,
            location,
            preferred_date: self.preferred_date,
            preferred_time: blank_to_none(self.preferred_time),
        })
    }
}

/// A unit of requested work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Task {
    pub id: TaskId,
    pub poster_id: UserId,
    pub helper_id: Option<UserId>,
    pub title: String,
    pub description: String,
    pub category: String,
    pub budget: Budget,
    pub location: Location,
    pub preferred_date: Option<NaiveDate>,
    pub preferred_time: Option<String>,
    pub status: TaskStatus,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub updated_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub completed_at: Option<Timestamp>,
}

impl Task {
    /// A freshly posted task: open, unassigned.
    pub fn new(poster_id: UserId, fields: TaskFields, now: Timestamp) -> Self {
        Self {
            id: TaskId::now_v7(),
            poster_id,
            helper_id: None,
            title: fields.title,
            description: fields.description,
            category: fields.category,
            budget: fields.budget,
            location: fields.location,
            preferred_date: fields.preferred_date,
            preferred_time: fields.preferred_time,
            status: TaskStatus::Open,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Whether `user` is the poster or the assigned helper.
    pub fn is_participant(&self, user: UserId) -> bool {
        self.poster_id == user || self.helper_id == Some(user)
    }

    /// The other participant of a task, if `user` is one of them.
    pub fn counterpart_of(&self, user: UserId) -> Option<UserId> {
        if user == self.poster_id {
            self.helper_id
        } else if self.helper_id == Some(user) {
            Some(self.poster_id)
        } else {
            None
        }
    }
}

// ============================================================================
// APPLICATIONS, REVIEWS, MESSAGES, NOTIFICATIONS
// ============================================================================

/// A helper's offer to perform a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Application {
    pub id: ApplicationId,
    pub task_id: TaskId,
    pub helper_id: UserId,
    pub message: Option<String>,
    pub bid_amount: f64,
    pub status: ApplicationStatus,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub updated_at: Timestamp,
}

impl Application {
    /// A new pending application.
    pub fn new(
        task_id: TaskId,
        helper_id: UserId,
        message: Option<String>,
        bid_amount: f64,
        now: Timestamp,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            id: ApplicationId::now_v7(),
            task_id,
            helper_id,
            message: blank_to_none(message),
            bid_amount: validate_amount("bid_amount", bid_amount)?,
            status: ApplicationStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Feedback left by one task participant about the other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Review {
    pub id: ReviewId,
    pub task_id: TaskId,
    pub reviewer_id: UserId,
    pub reviewee_id: UserId,
    pub rating: u8,
    pub comment: Option<String>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
}

impl Review {
    pub fn new(
        task_id: TaskId,
        reviewer_id: UserId,
        reviewee_id: UserId,
        rating: u8,
        comment: Option<String>,
        now: Timestamp,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            id: ReviewId::now_v7(),
            task_id,
            reviewer_id,
            reviewee_id,
            rating: validate_rating(rating)?,
            comment: blank_to_none(comment),
            created_at: now,
        })
    }
}

/// One message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub recipient_id: UserId,
    pub content: String,
    pub task_id: Option<TaskId>,
    pub attachments: Vec<String>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub read_at: Option<Timestamp>,
}

impl Message {
    /// Unread and addressed to `user`.
    pub fn is_unread_for(&self, user: UserId) -> bool {
        self.recipient_id == user && self.read_at.is_none()
    }

    pub fn involves(&self, user: UserId) -> bool {
        self.sender_id == user || self.recipient_id == user
    }

    /// The other party of this message from `user`'s point of view.
    pub fn counterpart_of(&self, user: UserId) -> Option<UserId> {
        if self.sender_id == user {
            Some(self.recipient_id)
        } else if self.recipient_id == user {
            Some(self.sender_id)
        } else {
            None
        }
    }
}

/// An in-app notification. Delivery is best effort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub data: serde_json::Value,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub read_at: Option<Timestamp>,
}

impl Notification {
    pub fn new(
        user_id: UserId,
        notification_type: NotificationType,
        title: impl Into<String>,
        message: impl Into<String>,
        data: serde_json::Value,
        now: Timestamp,
    ) -> Self {
        Self {
            id: NotificationId::now_v7(),
            user_id,
            notification_type,
            title: title.into(),
            message: message.into(),
            data,
            created_at: now,
            read_at: None,
        }
    }
}

// ============================================================================
// CATEGORIES
// ============================================================================

/// A browsable task category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TaskCategory {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub display_order: i32,
    pub is_active: bool,
    pub parent_id: Option<CategoryId>,
}

const DEFAULT_CATEGORY_NAMES: &[&str] = &[
    "AC Check & Maintenance",
    "Dishwasher Installation",
    "Air Filter Replacement",
    "General Troubleshooting",
    "Light Fixture Installation",
    "Plumbing Repair",
    "Furniture Assembly",
    "TV Mounting",
    "Electrical Work",
    "Home Organization",
    "Other",
];

/// URL-safe slug: lowercase alphanumerics separated by single dashes.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

/// The category list seeded into a fresh store.
pub fn default_categories() -> Vec<TaskCategory> {
    DEFAULT_CATEGORY_NAMES
        .iter()
        .enumerate()
        .map(|(i, name)| TaskCategory {
            id: CategoryId::now_v7(),
            name: (*name).to_string(),
            slug: slugify(name),
            description: None,
            icon: None,
            display_order: i as i32,
            is_active: true,
            parent_id: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn draft() -> TaskDraft {
        TaskDraft {
            title: Some("Check my AC".to_string()),
            description: Some("Unit is blowing warm air".to_string()),
            category: Some("AC Check".to_string()),
            budget: Some(json!({"amount": 50, "type": "fixed"})),
            location: Some(Location {
                address: Some("12 Elm St".to_string()),
                city: "Austin".to_string(),
                state: "TX".to_string(),
                zip_code: "78701".to_string(),
            }),
            preferred_date: None,
            preferred_time: Some("morning".to_string()),
        }
    }

    #[test]
    fn test_valid_draft() {
        let fields = draft().validate().unwrap();
        assert_eq!(fields.budget.amount, Some(50.0));
        assert_eq!(fields.budget.budget_type, BudgetType::Fixed);
        assert_eq!(fields.location.zip_code, "78701");
    }

    fn assert_missing(field: &str, mutate: impl Fn(&mut TaskDraft)) {
        let mut d = draft();
        mutate(&mut d);
        assert_eq!(d.validate().unwrap_err(), ValidationError::missing(field));
    }

    #[test]
    fn test_missing_required_fields() {
        assert_missing("title", |d| d.title = None);
        assert_missing("description", |d| d.description = Some("  ".into()));
        assert_missing("category", |d| d.category = None);
        assert_missing("budget_type", |d| d.budget = None);
        assert_missing("budget_type", |d| d.budget = Some(json!({"amount": 10})));
        assert_missing("location", |d| d.location = None);
    }

    #[test]
    fn test_flat_budget_rejected() {
        let mut d = draft();
        d.budget = Some(json!(50));
        assert!(matches!(
            d.validate(),
            Err(ValidationError::InvalidValue { field, .. }) if field == "budget"
        ));
    }

    #[test]
    fn test_budget_without_amount() {
        let budget = Budget::from_json(&json!({"type": "hourly"})).unwrap();
        assert_eq!(budget.amount, None);
        assert_eq!(budget.budget_type, BudgetType::Hourly);
    }

    #[test]
    fn test_negative_budget_rejected() {
        assert!(Budget::from_json(&json!({"amount": -1, "type": "fixed"})).is_err());
    }

    #[test]
    fn test_budget_serializes_with_type_key() {
        let budget = Budget {
            amount: Some(45.0),
            budget_type: BudgetType::Fixed,
        };
        let value = serde_json::to_value(budget).unwrap();
        assert_eq!(value, json!({"amount": 45.0, "type": "fixed"}));
    }

    #[test]
    fn test_location_requires_zip() {
        let mut d = draft();
        if let Some(loc) = d.location.as_mut() {
            loc.zip_code = String::new();
        }
        assert_eq!(
            d.validate().unwrap_err(),
            ValidationError::missing("location.zip_code")
        );
    }

    #[test]
    fn test_new_task_is_open_and_unassigned() {
        let poster = UserId::now_v7();
        let task = Task::new(poster, draft().validate().unwrap(), Utc::now());
        assert_eq!(task.status, TaskStatus::Open);
        assert!(task.helper_id.is_none());
        assert!(task.is_participant(poster));
        assert_eq!(task.counterpart_of(poster), None);
    }

    #[test]
    fn test_rating_bounds() {
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(1).is_ok());
        assert!(validate_rating(5).is_ok());
        assert!(validate_rating(6).is_err());
    }

    #[test]
    fn test_profile_update_ignores_absent_fields() {
        let now = Utc::now();
        let mut profile = Profile::empty(UserId::now_v7(), "Dana", now);
        profile.bio = Some("Handy with tools".to_string());
        profile
            .apply(
                ProfileUpdate {
                    zip_code: Some("78701".to_string()),
                    ..Default::default()
                },
                now,
            )
            .unwrap();
        assert_eq!(profile.bio.as_deref(), Some("Handy with tools"));
        assert_eq!(profile.zip_code.as_deref(), Some("78701"));
        assert!(profile
            .apply(
                ProfileUpdate {
                    name: Some(" ".to_string()),
                    ..Default::default()
                },
                now
            )
            .is_err());
    }

    #[test]
    fn test_helper_profile_keeps_staff_fields() {
        let now = Utc::now();
        let user = UserId::now_v7();
        let mut existing =
            HelperProfile::from_update(user, None, HelperProfileUpdate::default(), now).unwrap();
        existing.insurance_verified = true;
        existing.background_check_status = BackgroundCheckStatus::Approved;

        let updated = HelperProfile::from_update(
            user,
            Some(&existing),
            HelperProfileUpdate {
                skills: vec!["plumbing".into(), " ".into()],
                hourly_rate: Some(35.0),
                ..Default::default()
            },
            now,
        )
        .unwrap();
        assert!(updated.insurance_verified);
        assert_eq!(updated.background_check_status, BackgroundCheckStatus::Approved);
        assert_eq!(updated.skills, vec!["plumbing".to_string()]);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("AC Check & Maintenance"), "ac-check-maintenance");
        assert_eq!(slugify("TV Mounting"), "tv-mounting");
    }

    #[test]
    fn test_default_categories_ordered() {
        let categories = default_categories();
        assert_eq!(categories.first().map(|c| c.name.as_str()), Some("AC Check & Maintenance"));
        assert_eq!(categories.last().map(|c| c.slug.as_str()), Some("other"));
        assert!(categories.windows(2).all(|w| w[0].display_order < w[1].display_order));
    }

    #[cfg(feature = "openapi")]
    #[test]
    fn test_timestamps_documented_as_date_time() {
        use utoipa::PartialSchema;

        let task = serde_json::to_value(Task::schema()).unwrap();
        assert_eq!(task["properties"]["created_at"]["format"], "date-time");
        assert_eq!(task["properties"]["updated_at"]["format"], "date-time");

        let message = serde_json::to_value(Message::schema()).unwrap();
        assert_eq!(message["properties"]["created_at"]["format"], "date-time");
    }
}
