pub mod artist;
pub mod friendship;
pub mod listen;
pub mod tag;
pub mod tagging;
pub mod user;

pub use artist::Artist;
pub use friendship::Friendship;
pub use listen::ListenEvent;
pub use tag::Tag;
pub use tagging::{TagDate, TaggingEvent, TimestampOutcome};
pub use user::User;
