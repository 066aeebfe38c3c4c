//! Property-Based Tests for Atomic Accept
//!
//! **Property: Single Winner**
//!
//! For any number of pending applications on one open task, accepting them
//! concurrently SHALL succeed for exactly one. Afterwards the task is in
//! progress with that helper, the winner is accepted, and every other
//! application is rejected.

use chrono::Utc;
use handy_core::{
    Application, ApplicationStatus, Budget, BudgetType, ErrorKind, Location, Task, TaskId,
    TaskStatus, UserId,
};
use handy_storage::{InMemoryStore, MarketplaceStore};
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;

fn open_task() -> Task {
    let now = Utc::now();
    Task {
        id: TaskId::now_v7(),
        poster_id: UserId::now_v7(),
        helper_id: None,
        title: "Move couch".to_string(),
        description: "Third floor walk-up".to_string(),
        category: "Moving".to_string(),
        budget: Budget {
            amount: Some(100.0),
            budget_type: BudgetType::Fixed,
        },
        location: Location {
            address: None,
            city: "Denver".to_string(),
            state: "CO".to_string(),
            zip_code: "80202".to_string(),
        },
        preferred_date: None,
        preferred_time: None,
        status: TaskStatus::Open,
        created_at: now,
        updated_at: now,
        completed_at: None,
    }
}

async fn seed(store: &InMemoryStore, applicants: usize) -> Result<(Task, Vec<Application>), TestCaseError> {
    let task = open_task();
    store
        .task_insert(&task)
        .await
        .map_err(|e| TestCaseError::fail(e.to_string()))?;
    let mut apps = Vec::with_capacity(applicants);
    for i in 0..applicants {
        let app = Application::new(task.id, UserId::now_v7(), None, 50.0 + i as f64, Utc::now())
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        store
            .application_insert(&app)
            .await
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        apps.push(app);
    }
    Ok((task, apps))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_concurrent_accept_has_single_winner(applicants in 2usize..8) {
        let rt = tokio::runtime::Runtime::new()
            .map_err(|e| TestCaseError::fail(format!("Failed to create runtime: {}", e)))?;
        rt.block_on(async {
            let store = InMemoryStore::new();
            let (task, apps) = seed(&store, applicants).await?;

            let handles: Vec<_> = apps
                .iter()
                .map(|app| {
                    let store = store.clone();
                    let id = app.id;
                    tokio::spawn(async move { store.application_accept(id, Utc::now()).await })
                })
                .collect();

            let mut winners = Vec::new();
            for handle in handles {
                match handle.await.map_err(|e| TestCaseError::fail(e.to_string()))? {
                    Ok(outcome) => winners.push(outcome),
                    Err(err) => prop_assert_eq!(err.kind(), ErrorKind::InvalidState),
                }
            }
            prop_assert_eq!(winners.len(), 1);
            let winner = &winners[0];
            prop_assert_eq!(winner.rejected.len(), applicants - 1);

            let stored = store
                .task_get(task.id)
                .await
                .map_err(|e| TestCaseError::fail(e.to_string()))?
                .ok_or_else(|| TestCaseError::fail("task missing"))?;
            prop_assert_eq!(stored.status, TaskStatus::InProgress);
            prop_assert_eq!(stored.helper_id, Some(winner.accepted.helper_id));

            let all = store
                .application_list_by_task(task.id)
                .await
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            let accepted = all
                .iter()
                .filter(|a| a.status == ApplicationStatus::Accepted)
                .count();
            prop_assert_eq!(accepted, 1);
            prop_assert!(all
                .iter()
                .all(|a| a.status != ApplicationStatus::Pending));
            Ok(())
        })?;
    }

    #[test]
    fn prop_concurrent_duplicate_apply_inserts_once(attempts in 2usize..8) {
        let rt = tokio::runtime::Runtime::new()
            .map_err(|e| TestCaseError::fail(format!("Failed to create runtime: {}", e)))?;
        rt.block_on(async {
            let store = InMemoryStore::new();
            let (task, _) = seed(&store, 0).await?;
            let helper = UserId::now_v7();

            let handles: Vec<_> = (0..attempts)
                .map(|_| {
                    let store = store.clone();
                    tokio::spawn(async move {
                        let app = Application::new(task.id, helper, None, 25.0, Utc::now())?;
                        store.application_insert(&app).await
                    })
                })
                .collect();

            let mut inserted = 0;
            for handle in handles {
                match handle.await.map_err(|e| TestCaseError::fail(e.to_string()))? {
                    Ok(()) => inserted += 1,
                    Err(err) => prop_assert_eq!(err.kind(), ErrorKind::DuplicateApplication),
                }
            }
            prop_assert_eq!(inserted, 1);
            Ok(())
        })?;
    }
}

#[tokio::test]
async fn test_accept_after_cancel_has_no_effect() {
    let store = InMemoryStore::new();
    let (task, apps) = seed(&store, 2).await.unwrap();
    store
        .task_transition(task.id, TaskStatus::Open, TaskStatus::Cancelled, Utc::now())
        .await
        .unwrap();

    let err = store.application_accept(apps[0].id, Utc::now()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(err.user_message(), "This task is no longer open");

    let all = store.application_list_by_task(task.id).await.unwrap();
    assert!(all.iter().all(|a| a.status == ApplicationStatus::Rejected));
    let stored = store.task_get(task.id).await.unwrap().unwrap();
    assert_eq!(stored.helper_id, None);
}

#[tokio::test]
async fn test_reject_then_accept_sibling() {
    let store = InMemoryStore::new();
    let (task, apps) = seed(&store, 3).await.unwrap();

    let rejected = store.application_reject(apps[0].id, Utc::now()).await.unwrap();
    assert_eq!(rejected.status, ApplicationStatus::Rejected);
    let err = store.application_reject(apps[0].id, Utc::now()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    let outcome = store.application_accept(apps[1].id, Utc::now()).await.unwrap();
    assert_eq!(outcome.task.id, task.id);
    // Only the still-pending sibling is reported.
    assert_eq!(outcome.rejected.len(), 1);
    assert_eq!(outcome.rejected[0].id, apps[2].id);
}
