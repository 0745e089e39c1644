use serde::{Deserialize, Serialize};

/// A free-text community label.
///
/// `tag_value` is unique across the table; two tags must never share a
/// textual value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub tag_id: i64,
    pub tag_value: String,
}

impl Tag {
    #[must_use]
    pub fn new(tag_id: i64, tag_value: impl Into<String>) -> Self {
        Self {
            tag_id,
            tag_value: tag_value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_new() {
        let tag = Tag::new(13, "chillout");
        assert_eq!(tag.tag_id, 13);
        assert_eq!(tag.tag_value, "chillout");
    }
}
