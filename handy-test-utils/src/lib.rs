//! Handy Test Utilities
//!
//! Shared test infrastructure for the Handy workspace:
//! - Proptest generators for domain values
//! - Fixtures that stand up a marketplace with provisioned users
//! - Assertions for marketplace-specific invariants

// Re-export core types for convenience
pub use handy_core::{
    Application, ApplicationStatus, Budget, BudgetType, EntityType, ErrorKind, HandyError,
    HandyResult, Location, MarketConfig, Task, TaskDraft, TaskId, TaskStatus, Timestamp, UserId,
    UserRole,
};
pub use handy_market::{AuthContext, Marketplace, NewApplication, NewMessage, NewReview};
pub use handy_storage::InMemoryStore;

use uuid::Uuid;

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating Handy domain values.

    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;

    // === Identity ===

    pub fn arb_uuid() -> impl Strategy<Value = Uuid> {
        any::<[u8; 16]>().prop_map(Uuid::from_bytes)
    }

    pub fn arb_user_id() -> impl Strategy<Value = UserId> {
        arb_uuid().prop_map(UserId::from_uuid)
    }

    pub fn arb_task_id() -> impl Strategy<Value = TaskId> {
        arb_uuid().prop_map(TaskId::from_uuid)
    }

    /// Timestamps between 2020 and 2030.
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        (1577836800i64..1893456000i64).prop_map(|secs| {
            chrono::DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now)
        })
    }

    // === Enums ===

    pub fn arb_task_status() -> impl Strategy<Value = TaskStatus> {
        prop_oneof![
            Just(TaskStatus::Open),
            Just(TaskStatus::InProgress),
            Just(TaskStatus::Completed),
            Just(TaskStatus::Cancelled),
        ]
    }

    pub fn arb_application_status() -> impl Strategy<Value = ApplicationStatus> {
        prop_oneof![
            Just(ApplicationStatus::Pending),
            Just(ApplicationStatus::Accepted),
            Just(ApplicationStatus::Rejected),
        ]
    }

    pub fn arb_budget_type() -> impl Strategy<Value = BudgetType> {
        prop_oneof![Just(BudgetType::Fixed), Just(BudgetType::Hourly)]
    }

    // === Values ===

    /// A valid budget amount in whole cents.
    pub fn arb_amount() -> impl Strategy<Value = f64> {
        (0u32..1_000_000).prop_map(|cents| f64::from(cents) / 100.0)
    }

    pub fn arb_budget() -> impl Strategy<Value = Budget> {
        (proptest::option::of(arb_amount()), arb_budget_type()).prop_map(
            |(amount, budget_type)| Budget {
                amount,
                budget_type,
            },
        )
    }

    /// Ratings inside the accepted 1..=5 range.
    pub fn arb_rating() -> impl Strategy<Value = u8> {
        1u8..=5
    }

    /// Non-blank message text.
    pub fn arb_message_content() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9][a-zA-Z0-9 .,!?]{0,120}"
    }

    pub fn arb_zip_code() -> impl Strategy<Value = String> {
        "[0-9]{5}"
    }

    /// A draft that passes validation.
    pub fn arb_task_draft() -> impl Strategy<Value = TaskDraft> {
        (
            "[A-Z][a-z]{2,20}( [a-z]{2,10}){0,4}",
            "[A-Za-z][a-z ]{10,200}",
            prop_oneof![
                Just("Plumbing".to_string()),
                Just("Cleaning".to_string()),
                Just("AC Check & Maintenance".to_string()),
                Just("Other".to_string()),
            ],
            arb_budget(),
            arb_zip_code(),
        )
            .prop_map(|(title, description, category, budget, zip_code)| {
                fixtures::draft_with(title, description, category, budget, zip_code)
            })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built marketplaces, users, and tasks.

    use super::*;
    use serde_json::json;

    /// A marketplace over a fresh in-memory store, categories seeded, default config.
    pub fn seeded_marketplace() -> Marketplace {
        marketplace_with(MarketConfig::default())
    }

    pub fn marketplace_with(config: MarketConfig) -> Marketplace {
        Marketplace::in_memory(config).expect("test config must be valid")
    }

    /// A caller identity with a fresh user id. Not provisioned.
    pub fn caller(role: UserRole, name: &str) -> AuthContext {
        let id = UserId::now_v7();
        AuthContext::new(id, format!("{}@example.com", name), role)
    }

    /// Provision a new user of `role` in `market`.
    pub async fn register(market: &Marketplace, role: UserRole, name: &str) -> AuthContext {
        let ctx = caller(role, name);
        market
            .profiles
            .provision(&ctx)
            .await
            .expect("provisioning must succeed");
        ctx
    }

    pub async fn poster(market: &Marketplace) -> AuthContext {
        register(market, UserRole::Poster, "poster").await
    }

    pub async fn helper(market: &Marketplace, name: &str) -> AuthContext {
        register(market, UserRole::Helper, name).await
    }

    pub async fn admin(market: &Marketplace) -> AuthContext {
        register(market, UserRole::Admin, "admin").await
    }

    pub fn location(zip_code: impl Into<String>) -> Location {
        Location {
            address: None,
            city: "Austin".to_string(),
            state: "TX".to_string(),
            zip_code: zip_code.into(),
        }
    }

    pub fn draft_with(
        title: impl Into<String>,
        description: impl Into<String>,
        category: impl Into<String>,
        budget: Budget,
        zip_code: impl Into<String>,
    ) -> TaskDraft {
        TaskDraft {
            title: Some(title.into()),
            description: Some(description.into()),
            category: Some(category.into()),
            budget: Some(json!({
                "amount": budget.amount,
                "type": budget.budget_type.as_db_str(),
            })),
            location: Some(location(zip_code)),
            preferred_date: None,
            preferred_time: None,
        }
    }

    /// The fixed-price "AC Check" job used throughout the scenario tests.
    pub fn ac_check_draft() -> TaskDraft {
        TaskDraft {
            title: Some("AC Check".to_string()),
            description: Some("Annual AC inspection before summer".to_string()),
            category: Some("AC Check & Maintenance".to_string()),
            budget: Some(json!({ "amount": 50, "type": "fixed" })),
            location: Some(location("78701")),
            preferred_date: None,
            preferred_time: Some("morning".to_string()),
        }
    }

    /// An open task posted by `poster`.
    pub async fn open_task(market: &Marketplace, poster: &AuthContext) -> Task {
        market
            .tasks
            .create_task(poster, ac_check_draft())
            .await
            .expect("task creation must succeed")
    }

    pub async fn apply(
        market: &Marketplace,
        helper: &AuthContext,
        task_id: TaskId,
        bid_amount: f64,
    ) -> Application {
        market
            .matching
            .apply(
                helper,
                task_id,
                NewApplication {
                    message: Some("I can do this".to_string()),
                    bid_amount,
                },
            )
            .await
            .expect("application must succeed")
    }

    /// An in-progress task with `helper` assigned.
    pub async fn assigned_task(
        market: &Marketplace,
        poster: &AuthContext,
        helper: &AuthContext,
    ) -> Task {
        let task = open_task(market, poster).await;
        let application = apply(market, helper, task.id, 45.0).await;
        market
            .matching
            .accept(poster, application.id)
            .await
            .expect("accept must succeed")
            .task
    }

    /// A completed task between `poster` and `helper`.
    pub async fn completed_task(
        market: &Marketplace,
        poster: &AuthContext,
        helper: &AuthContext,
    ) -> Task {
        let task = assigned_task(market, poster, helper).await;
        market
            .tasks
            .complete_task(poster, task.id)
            .await
            .expect("completion must succeed")
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for marketplace invariants and error taxonomy.

    use super::*;

    #[track_caller]
    pub fn assert_kind<T: std::fmt::Debug>(result: &HandyResult<T>, expected: ErrorKind) {
        match result {
            Err(e) => assert_eq!(e.kind(), expected, "Wrong error kind for {:?}", e),
            Ok(value) => panic!("Expected {:?} error, got Ok({:?})", expected, value),
        }
    }

    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &HandyResult<T>, entity_type: EntityType) {
        match result {
            Err(HandyError::Storage(handy_core::StorageError::NotFound {
                entity_type: et, ..
            })) => {
                assert_eq!(*et, entity_type, "Wrong entity type in NotFound error");
            }
            other => panic!("Expected NotFound error for {:?}, got: {:?}", entity_type, other),
        }
    }

    /// Status-dependent field rules for a task.
    #[track_caller]
    pub fn assert_task_invariants(task: &Task) {
        match task.status {
            TaskStatus::Open => {
                assert!(task.helper_id.is_none(), "open task has a helper");
                assert!(task.completed_at.is_none(), "open task has completed_at");
            }
            TaskStatus::InProgress => {
                assert!(task.helper_id.is_some(), "in-progress task has no helper");
                assert!(task.completed_at.is_none(), "in-progress task has completed_at");
            }
            TaskStatus::Completed => {
                assert!(task.helper_id.is_some(), "completed task has no helper");
                assert!(task.completed_at.is_some(), "completed task has no completed_at");
            }
            TaskStatus::Cancelled => {
                assert!(task.completed_at.is_none(), "cancelled task has completed_at");
            }
        }
        assert!(task.updated_at >= task.created_at, "updated_at precedes created_at");
    }

    /// At most one accepted application, and it matches the task's helper.
    /// Once the task has left `open`, nothing is pending.
    #[track_caller]
    pub fn assert_single_accepted(task: &Task, applications: &[Application]) {
        if task.status != TaskStatus::Open {
            if let Some(pending) = applications
                .iter()
                .find(|a| a.status == ApplicationStatus::Pending)
            {
                panic!(
                    "pending application {} on {} task {}",
                    pending.id, task.status, task.id
                );
            }
        }
        let accepted: Vec<&Application> = applications
            .iter()
            .filter(|a| a.status == ApplicationStatus::Accepted)
            .collect();
        assert!(
            accepted.len() <= 1,
            "task {} has {} accepted applications",
            task.id,
            accepted.len()
        );
        if let Some(app) = accepted.first() {
            assert_eq!(Some(app.helper_id), task.helper_id, "accepted helper mismatch");
            assert_ne!(task.status, TaskStatus::Open, "open task has an accepted application");
        }
        if matches!(task.status, TaskStatus::InProgress | TaskStatus::Completed) {
            assert_eq!(accepted.len(), 1, "assigned task has no accepted application");
        }
    }
}
