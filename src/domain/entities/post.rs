use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A feed post as cached locally.
///
/// Confirmed entries carry the server-assigned (positive) id. A pending
/// placeholder created by an optimistic save carries a locally allocated
/// negative id until the server confirms it, so the two can never collide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedEntry {
    pub id: i64,
    pub author: String,
    pub author_id: i64,
    pub author_avatar: Option<String>,
    pub content: String,
    pub published: DateTime<Utc>,
    pub likes: i64,
    pub liked_by_me: bool,
    pub owned_by_me: bool,
    pub attachment: Option<Attachment>,
    /// True until the server confirms this exact entry.
    pub pending: bool,
    /// False for entries fetched speculatively (newer-count probes) until
    /// the user explicitly reveals them.
    pub visible: bool,
}

impl FeedEntry {
    pub fn new(author: String, author_id: i64, content: String) -> Self {
        Self {
            id: 0,
            author,
            author_id,
            author_avatar: None,
            content,
            published: Utc::now(),
            likes: 0,
            liked_by_me: false,
            owned_by_me: false,
            attachment: None,
            pending: false,
            visible: true,
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }

    /// A confirmed server copy always replaces local state as visible and
    /// not pending.
    pub fn into_confirmed(mut self) -> Self {
        self.pending = false;
        self.visible = true;
        self
    }

    pub fn into_hidden(mut self) -> Self {
        self.pending = false;
        self.visible = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
    pub kind: AttachmentKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttachmentKind {
    Image,
}

impl AttachmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttachmentKind::Image => "image",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "image" => Some(AttachmentKind::Image),
            _ => None,
        }
    }
}

/// Server-side reference returned by a media upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    pub id: String,
}

/// Binary payload handed to the media upload endpoint.
#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}
