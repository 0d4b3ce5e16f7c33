use serde::{Deserialize, Serialize};

/// One catalog record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaDescriptor {
    /// Decoded text that triggers this entry.
    pub id: String,
    pub label: String,
    pub role: String,
    /// Key passed to the media cache.
    pub media_key: String,
}

impl MediaDescriptor {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        role: impl Into<String>,
        media_key: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            role: role.into(),
            media_key: media_key.into(),
        }
    }
}
