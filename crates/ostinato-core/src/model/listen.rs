use serde::{Deserialize, Serialize};

/// A user's cumulative play count for one artist.
///
/// Identity is the `(user_id, artist_id)` pair; at most one row exists
/// per pair. `weight` is a non-negative total play count, a proxy for
/// listening intensity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenEvent {
    pub user_id: i64,
    pub artist_id: i64,
    pub weight: i64,
}

impl ListenEvent {
    #[must_use]
    pub const fn new(user_id: i64, artist_id: i64, weight: i64) -> Self {
        Self {
            user_id,
            artist_id,
            weight,
        }
    }
}
