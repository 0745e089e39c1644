use serde::{Deserialize, Serialize};

/// A musical artist as described by the source catalog.
///
/// Identifiers are the stable integers carried by the source data, not
/// generated locally. Artists are created only by the importer and
/// never mutated afterwards; deletion is an administrative operation
/// that cascades to dependent listens and tag applications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub id: i64,
    pub name: String,
    pub url: Option<String>,
    pub picture_url: Option<String>,
}

impl Artist {
    #[must_use]
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            url: None,
            picture_url: None,
        }
    }

    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_picture_url(mut self, picture_url: impl Into<String>) -> Self {
        self.picture_url = Some(picture_url.into());
        self
    }
}
