//! Open-task search.
//!
//! Search is a read-only projection over tasks with poster info and
//! application counts attached. Distance filtering goes through
//! [`ZipDistance`] so a geocoding backend can be swapped in.

use std::sync::Arc;

use ::async_trait::async_trait;
use handy_core::{slugify, HandyResult, Task, TaskQuery, TaskSearchHit};
use tracing::debug;

use crate::memory::InMemoryStore;

/// Task search over the marketplace.
#[async_trait]
pub trait TaskSearch: Send + Sync {
    /// Matching tasks, best match first. Applies `query.limit` and `query.offset` as given.
    async fn search(&self, query: &TaskQuery) -> HandyResult<Vec<TaskSearchHit>>;
}

/// Distance between two zip codes, in miles.
pub trait ZipDistance: Send + Sync {
    /// `None` when either zip code is unknown.
    fn distance_miles(&self, from: &str, to: &str) -> Option<f64>;
}

/// Knows only that a zip code is zero miles from itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactZipDistance;

impl ZipDistance for ExactZipDistance {
    fn distance_miles(&self, from: &str, to: &str) -> Option<f64> {
        (from.trim() == to.trim()).then_some(0.0)
    }
}

/// [`TaskSearch`] backed by an [`InMemoryStore`].
#[derive(Clone)]
pub struct InMemoryTaskSearch {
    store: InMemoryStore,
    distance: Arc<dyn ZipDistance>,
}

impl std::fmt::Debug for InMemoryTaskSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryTaskSearch").finish_non_exhaustive()
    }
}

impl InMemoryTaskSearch {
    pub fn new(store: InMemoryStore, distance: Arc<dyn ZipDistance>) -> Self {
        Self { store, distance }
    }

    /// Search with exact zip matching only.
    pub fn exact(store: InMemoryStore) -> Self {
        Self::new(store, Arc::new(ExactZipDistance))
    }
}

fn category_matches(task: &Task, wanted: &str) -> bool {
    let wanted = wanted.trim();
    task.category.eq_ignore_ascii_case(wanted) || slugify(&task.category) == slugify(wanted)
}

fn budget_matches(task: &Task, min: Option<f64>, max: Option<f64>) -> bool {
    if min.is_none() && max.is_none() {
        return true;
    }
    // Tasks with no stated amount never satisfy a budget filter.
    let Some(amount) = task.budget.amount else {
        return false;
    };
    min.map_or(true, |m| amount >= m) && max.map_or(true, |m| amount <= m)
}

/// Relevance of a task to free-text terms. Title hits weigh double.
fn relevance(task: &Task, terms: &[String]) -> usize {
    let title = task.title.to_lowercase();
    let description = task.description.to_lowercase();
    terms
        .iter()
        .map(|term| 2 * title.matches(term.as_str()).count() + description.matches(term.as_str()).count())
        .sum()
}

#[async_trait]
impl TaskSearch for InMemoryTaskSearch {
    async fn search(&self, query: &TaskQuery) -> HandyResult<Vec<TaskSearchHit>> {
        query.validate()?;
        let status = query.effective_status();
        let terms: Vec<String> = query
            .search_term
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_lowercase)
            .collect();
        let origin = query
            .zip_code
            .as_deref()
            .map(str::trim)
            .filter(|z| !z.is_empty());

        let tables = self.store.read()?;
        let mut scored: Vec<(usize, TaskSearchHit)> = Vec::new();
        for task in tables.tasks.values() {
            if task.status != status {
                continue;
            }
            if let Some(category) = query.category.as_deref() {
                if !category_matches(task, category) {
                    continue;
                }
            }
            if !budget_matches(task, query.min_budget, query.max_budget) {
                continue;
            }

            let distance_miles = match origin {
                Some(zip) => {
                    let distance = self.distance.distance_miles(zip, &task.location.zip_code);
                    let radius = query.radius_miles.unwrap_or(0.0);
                    match distance {
                        Some(d) if d <= radius => Some(d),
                        _ => continue,
                    }
                }
                None => None,
            };

            let score = relevance(task, &terms);
            if !terms.is_empty() && score == 0 {
                continue;
            }

            let poster = tables.profiles.get(&task.poster_id);
            scored.push((
                score,
                TaskSearchHit {
                    task: task.clone(),
                    poster_name: poster
                        .map(|p| p.name.clone())
                        .unwrap_or_else(|| "Unknown user".to_string()),
                    poster_rating: poster.and_then(|p| p.rating),
                    application_count: tables.application_count(task.id),
                    distance_miles,
                },
            ));
        }
        drop(tables);

        scored.sort_by(|(sa, a), (sb, b)| {
            sb.cmp(sa)
                .then_with(|| b.task.created_at.cmp(&a.task.created_at))
                .then_with(|| b.task.id.cmp(&a.task.id))
        });

        let total = scored.len();
        let hits: Vec<TaskSearchHit> = scored
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .map(|(_, hit)| hit)
            .collect();
        debug!(total, returned = hits.len(), "Task search");
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MarketplaceStore;
    use chrono::{Duration, Utc};
    use handy_core::{Budget, BudgetType, Location, TaskStatus, UserId};

    fn task(title: &str, category: &str, amount: Option<f64>, zip: &str) -> Task {
        let now = Utc::now();
        Task {
            id: handy_core::TaskId::now_v7(),
            poster_id: UserId::now_v7(),
            helper_id: None,
            title: title.to_string(),
            description: format!("{} needed soon", title),
            category: category.to_string(),
            budget: Budget {
                amount,
                budget_type: BudgetType::Fixed,
            },
            location: Location {
                address: None,
                city: "Austin".to_string(),
                state: "TX".to_string(),
                zip_code: zip.to_string(),
            },
            preferred_date: None,
            preferred_time: None,
            status: TaskStatus::Open,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    fn query() -> TaskQuery {
        TaskQuery {
            limit: 20,
            ..Default::default()
        }
    }

    async fn seeded(tasks: &[Task]) -> InMemoryTaskSearch {
        let store = InMemoryStore::new();
        for t in tasks {
            store.task_insert(t).await.unwrap();
        }
        InMemoryTaskSearch::exact(store)
    }

    #[tokio::test]
    async fn test_title_match_ranks_first() {
        let mut a = task("Paint fence", "Painting", Some(80.0), "78701");
        a.description = "Need someone to mow and then paint".to_string();
        let mut b = task("Mow lawn", "Yard Work", Some(40.0), "78701");
        b.created_at = a.created_at - Duration::minutes(1);
        let search = seeded(&[a.clone(), b.clone()]).await;

        let hits = search
            .search(&TaskQuery {
                search_term: Some("mow".to_string()),
                ..query()
            })
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].task.id, b.id);
        assert_eq!(hits[0].poster_name, "Unknown user");
    }

    #[tokio::test]
    async fn test_budget_filter_excludes_unpriced() {
        let priced = task("Assemble desk", "Furniture Assembly", Some(50.0), "78701");
        let unpriced = task("Assemble bed", "Furniture Assembly", None, "78701");
        let search = seeded(&[priced.clone(), unpriced]).await;

        let hits = search
            .search(&TaskQuery {
                min_budget: Some(10.0),
                ..query()
            })
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].task.id, priced.id);
    }

    #[tokio::test]
    async fn test_category_matches_slug_and_name() {
        let t = task("Fix sink", "Plumbing Repair", Some(60.0), "78701");
        let search = seeded(&[t]).await;
        for category in ["plumbing repair", "plumbing-repair", "Plumbing Repair"] {
            let hits = search
                .search(&TaskQuery {
                    category: Some(category.to_string()),
                    ..query()
                })
                .await
                .unwrap();
            assert_eq!(hits.len(), 1, "category {}", category);
        }
    }

    #[tokio::test]
    async fn test_zip_filter_and_distance() {
        let near = task("Walk dog", "Pet Care", Some(20.0), "78701");
        let far = task("Walk cat", "Pet Care", Some(20.0), "10001");
        let search = seeded(&[near.clone(), far]).await;

        let hits = search
            .search(&TaskQuery {
                zip_code: Some("78701".to_string()),
                radius_miles: Some(10.0),
                ..query()
            })
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].distance_miles, Some(0.0));
    }

    #[tokio::test]
    async fn test_only_requested_status() {
        let open = task("Clean gutters", "Cleaning", Some(90.0), "78701");
        let mut done = task("Clean windows", "Cleaning", Some(90.0), "78701");
        done.status = TaskStatus::Completed;
        done.helper_id = Some(UserId::now_v7());
        let search = seeded(&[open.clone(), done.clone()]).await;

        let hits = search.search(&query()).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].task.id, open.id);

        let hits = search
            .search(&TaskQuery {
                status: Some(TaskStatus::Completed),
                ..query()
            })
            .await
            .unwrap();
        assert_eq!(hits[0].task.id, done.id);
    }

    #[tokio::test]
    async fn test_pagination() {
        let tasks: Vec<Task> = (0..5)
            .map(|i| task(&format!("Job {}", i), "Moving", Some(10.0), "78701"))
            .collect();
        let search = seeded(&tasks).await;
        let page = search
            .search(&TaskQuery {
                limit: 2,
                offset: 4,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
    }
}
