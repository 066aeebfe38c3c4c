//! Property-Based Tests for the Task Lifecycle
//!
//! **Property: Status Invariants**
//!
//! For any sequence of status requests against one task, every successful
//! request follows the transition table, every failed request leaves the task
//! unchanged, and the status-dependent field rules hold after each step.
//!
//! **Property: Rating Aggregation**
//!
//! A reviewee's cached rating is the mean of every rating they received.
//!
//! **Property: No Pending Applications Off Open**
//!
//! Once a task leaves `open`, none of its applications is still pending.

use std::time::Duration;

use handy_core::{ApplicationStatus, ErrorKind, NotificationType, TaskStatus, UserRole};
use handy_events::{MarketEvent, Topic};
use handy_market::NewReview;
use handy_test_utils::assertions::{assert_single_accepted, assert_task_invariants};
use handy_test_utils::fixtures::{apply, completed_task, helper, seeded_marketplace, open_task, poster, register};
use handy_test_utils::generators::{arb_rating, arb_task_draft, arb_task_status};
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;

fn runtime() -> Result<tokio::runtime::Runtime, TestCaseError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| TestCaseError::fail(format!("Failed to create runtime: {}", e)))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_status_requests_preserve_invariants(
        requests in prop::collection::vec(arb_task_status(), 1..8),
    ) {
        let rt = runtime()?;
        rt.block_on(async {
            let market = seeded_marketplace();
            let p = poster(&market).await;
            let h1 = helper(&market, "h1").await;
            let h2 = helper(&market, "h2").await;
            let task = open_task(&market, &p).await;
            let a1 = apply(&market, &h1, task.id, 45.0).await;
            apply(&market, &h2, task.id, 40.0).await;

            for next in requests {
                let before = market
                    .tasks
                    .get_task(&p, task.id)
                    .await
                    .map_err(|e| TestCaseError::fail(e.to_string()))?
                    .task;

                // In-progress is reachable only by accepting an application.
                let result = if next == TaskStatus::InProgress {
                    market.matching.accept(&p, a1.id).await.map(|o| o.task)
                } else {
                    market.tasks.update_status(&p, task.id, next).await
                };

                let details = market
                    .tasks
                    .get_task(&p, task.id)
                    .await
                    .map_err(|e| TestCaseError::fail(e.to_string()))?;
                match result {
                    Ok(updated) => {
                        prop_assert!(before.status.can_transition_to(updated.status));
                        prop_assert_eq!(updated.status, next);
                        prop_assert_eq!(&details.task, &updated);
                    }
                    Err(_) => prop_assert_eq!(&details.task, &before),
                }
                assert_task_invariants(&details.task);
                assert_single_accepted(&details.task, &details.applications);
            }
            Ok(())
        })?;
    }

    #[test]
    fn prop_rating_is_mean_of_received_reviews(
        ratings in prop::collection::vec(arb_rating(), 1..6),
    ) {
        let rt = runtime()?;
        rt.block_on(async {
            let market = seeded_marketplace();
            let h = helper(&market, "h").await;

            for (i, rating) in ratings.iter().enumerate() {
                let p = register(&market, UserRole::Poster, &format!("poster{}", i)).await;
                let task = completed_task(&market, &p, &h).await;
                market
                    .reviews
                    .add_review(
                        &p,
                        task.id,
                        NewReview {
                            reviewee_id: h.user_id,
                            rating: *rating,
                            comment: None,
                        },
                    )
                    .await
                    .map_err(|e| TestCaseError::fail(e.to_string()))?;
            }

            let view = market
                .profiles
                .get_profile(h.user_id)
                .await
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            let expected =
                ratings.iter().map(|r| f64::from(*r)).sum::<f64>() / ratings.len() as f64;
            prop_assert_eq!(view.profile.review_count as usize, ratings.len());
            let actual = view
                .profile
                .rating
                .ok_or_else(|| TestCaseError::fail("rating not set"))?;
            prop_assert!((actual - expected).abs() < 1e-9);
            Ok(())
        })?;
    }

    #[test]
    fn prop_valid_drafts_create_open_tasks(draft in arb_task_draft()) {
        let rt = runtime()?;
        rt.block_on(async {
            let market = seeded_marketplace();
            let p = poster(&market).await;
            let expected_budget = draft.budget.clone();
            let task = market
                .tasks
                .create_task(&p, draft)
                .await
                .map_err(|e| TestCaseError::fail(e.to_string()))?;

            prop_assert_eq!(task.status, TaskStatus::Open);
            prop_assert_eq!(task.poster_id, p.user_id);
            let budget = expected_budget
                .as_ref()
                .and_then(|b| b.get("type"))
                .and_then(|t| t.as_str());
            prop_assert_eq!(budget, Some(task.budget.budget_type.as_db_str()));
            assert_task_invariants(&task);
            Ok(())
        })?;
    }
}

#[tokio::test]
async fn test_cancel_rejects_pending_applications() -> Result<(), String> {
    let market = seeded_marketplace();
    let p = poster(&market).await;
    let h = helper(&market, "h").await;
    let task = open_task(&market, &p).await;
    let application = apply(&market, &h, task.id, 45.0).await;
    let mut feed = market.events().subscribe(Topic::TaskApplications(task.id));

    let cancelled = market
        .tasks
        .cancel_task(&p, task.id)
        .await
        .map_err(|e| e.to_string())?;
    assert_eq!(cancelled.status, TaskStatus::Cancelled);

    let details = market
        .tasks
        .get_task(&p, task.id)
        .await
        .map_err(|e| e.to_string())?;
    assert_eq!(details.applications.len(), 1);
    assert_eq!(details.applications[0].status, ApplicationStatus::Rejected);
    assert_single_accepted(&details.task, &details.applications);

    let event = tokio::time::timeout(Duration::from_secs(1), feed.recv())
        .await
        .map_err(|_| "no application event after cancel".to_string())?;
    match event {
        Some(MarketEvent::ApplicationUpdated { application: updated, .. }) => {
            assert_eq!(updated.id, application.id);
            assert_eq!(updated.status, ApplicationStatus::Rejected);
        }
        other => return Err(format!("unexpected event: {:?}", other)),
    }

    let notifications = market
        .notifications
        .list(&h, false)
        .await
        .map_err(|e| e.to_string())?;
    assert!(notifications
        .iter()
        .any(|n| n.notification_type == NotificationType::ApplicationRejected));

    let err = market
        .matching
        .reject(&p, application.id)
        .await
        .err()
        .ok_or("reject after cancel succeeded")?;
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    Ok(())
}
