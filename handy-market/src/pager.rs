//! Offset-based pagination over task search.

use std::sync::Arc;

use futures_util::{stream, Stream, TryStreamExt};
use handy_core::{HandyResult, TaskQuery, TaskSearchHit};
use handy_storage::TaskSearch;

/// Lazy, finite, restartable walk over search results.
///
/// Each page re-runs the search with the current offset, so results reflect
/// the store at the time the page is fetched.
pub struct TaskPager {
    search: Arc<dyn TaskSearch>,
    query: TaskQuery,
    page_size: usize,
    offset: usize,
    exhausted: bool,
}

impl std::fmt::Debug for TaskPager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskPager")
            .field("query", &self.query)
            .field("page_size", &self.page_size)
            .field("offset", &self.offset)
            .field("exhausted", &self.exhausted)
            .finish()
    }
}

impl TaskPager {
    /// `page_size` must already be clamped; zero yields no pages.
    pub(crate) fn new(search: Arc<dyn TaskSearch>, query: TaskQuery, page_size: usize) -> Self {
        let offset = query.offset;
        Self {
            search,
            query,
            page_size,
            offset,
            exhausted: page_size == 0,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Fetch the page at the current offset and advance past it.
    ///
    /// Returns an empty page once a short page has been seen.
    pub async fn next_page(&mut self) -> HandyResult<Vec<TaskSearchHit>> {
        if self.exhausted {
            return Ok(Vec::new());
        }
        let query = TaskQuery {
            limit: self.page_size,
            offset: self.offset,
            ..self.query.clone()
        };
        let page = self.search.search(&query).await?;
        self.offset += page.len();
        if page.len() < self.page_size {
            self.exhausted = true;
        }
        Ok(page)
    }

    /// Continue from `offset` on the next call.
    pub fn restart_at(&mut self, offset: usize) {
        self.offset = offset;
        self.exhausted = self.page_size == 0;
    }

    /// Every remaining hit as a stream. Ends after the first short page.
    pub fn into_stream(self) -> impl Stream<Item = HandyResult<TaskSearchHit>> + Send {
        stream::try_unfold(self, Self::advance)
            .map_ok(|page| stream::iter(page.into_iter().map(Ok)))
            .try_flatten()
    }

    async fn advance(mut self) -> HandyResult<Option<(Vec<TaskSearchHit>, Self)>> {
        if self.exhausted {
            return Ok(None);
        }
        let page = self.next_page().await?;
        if page.is_empty() {
            return Ok(None);
        }
        Ok(Some((page, self)))
    }
}
