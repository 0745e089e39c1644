use serde::{Deserialize, Serialize};

/// A directed friendship edge as stored.
///
/// The source declares directed pairs but the relation is semantically
/// symmetric; only the direction present in the source is stored, and
/// the query layer unions both directions when resolving a friend
/// circle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Friendship {
    pub user_id: i64,
    pub friend_id: i64,
}

impl Friendship {
    #[must_use]
    pub const fn new(user_id: i64, friend_id: i64) -> Self {
        Self { user_id, friend_id }
    }
}
