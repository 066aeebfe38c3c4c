//! Profile rating aggregate.
//!
//! The cached `rating`/`review_count` on a profile is always recomputed from
//! the full set of received reviews, never incremented in place.

use crate::Review;

/// Mean rating and count over a set of reviews.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RatingAggregate {
    pub total: u64,
    pub count: u32,
}

impl RatingAggregate {
    pub fn from_ratings(ratings: impl IntoIterator<Item = u8>) -> Self {
        ratings.into_iter().fold(Self::default(), |mut acc, r| {
            acc.total += u64::from(r);
            acc.count += 1;
            acc
        })
    }

    /// Aggregate over the reviews whose reviewee is `user`.
    pub fn for_reviewee<'a>(
        reviews: impl IntoIterator<Item = &'a Review>,
        user: crate::UserId,
    ) -> Self {
        Self::from_ratings(
            reviews
                .into_iter()
                .filter(|r| r.reviewee_id == user)
                .map(|r| r.rating),
        )
    }

    /// Arithmetic mean, or `None` with no reviews.
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.total as f64 / f64::from(self.count))
    }
}
