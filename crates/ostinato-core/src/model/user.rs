use serde::{Deserialize, Serialize};

/// A listener.
///
/// Users are never declared explicitly in the source files; a row is
/// synthesized the first time an id appears as a listener, a tagger,
/// or a friendship participant. The only attribute is the id itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    pub user_id: i64,
}

impl User {
    #[must_use]
    pub const fn new(user_id: i64) -> Self {
        Self { user_id }
    }
}
