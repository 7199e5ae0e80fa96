use chrono::DateTime;
use sqlx::FromRow;

use crate::domain::entities::post::{Attachment, AttachmentKind, FeedEntry};
use crate::shared::error::{FeedError, Result};

#[derive(Debug, Clone, FromRow)]
pub struct FeedEntryRow {
    pub id: i64,
    pub author: String,
    pub author_id: i64,
    pub author_avatar: Option<String>,
    pub content: String,
    pub published: i64,
    pub likes: i64,
    pub liked_by_me: bool,
    pub pending: bool,
    pub visible: bool,
    pub attachment_url: Option<String>,
    pub attachment_kind: Option<String>,
}

pub fn entry_from_row(row: FeedEntryRow) -> Result<FeedEntry> {
    let published = DateTime::from_timestamp(row.published, 0)
        .ok_or_else(|| FeedError::Unknown(format!("invalid published timestamp {}", row.published)))?;

    let attachment = match (row.attachment_url, row.attachment_kind) {
        (Some(url), Some(kind)) => {
            let kind = AttachmentKind::parse(&kind)
                .ok_or_else(|| FeedError::Unknown(format!("unknown attachment kind {kind}")))?;
            Some(Attachment { url, kind })
        }
        _ => None,
    };

    Ok(FeedEntry {
        id: row.id,
        author: row.author,
        author_id: row.author_id,
        author_avatar: row.author_avatar,
        content: row.content,
        published,
        likes: row.likes,
        liked_by_me: row.liked_by_me,
        // Ownership is relative to the current identity; the read model tags
        // it against the active session, never the row.
        owned_by_me: false,
        attachment,
        pending: row.pending,
        visible: row.visible,
    })
}

pub fn entries_from_rows(rows: Vec<FeedEntryRow>) -> Result<Vec<FeedEntry>> {
    rows.into_iter().map(entry_from_row).collect()
}
