use async_trait::async_trait;

use crate::domain::entities::auth::AuthState;
use crate::domain::entities::post::{FeedEntry, Media, MediaUpload};
use crate::shared::error::Result;

/// Abstract remote feed source. Implementations classify every transport
/// failure into [`crate::shared::error::FeedError`] before returning; a raw
/// transport error never crosses this boundary.
#[async_trait]
pub trait FeedApi: Send + Sync {
    /// Latest `limit` entries from the remote head, newest first.
    async fn latest(&self, limit: u32) -> Result<Vec<FeedEntry>>;

    /// Up to `limit` entries strictly older than `anchor`.
    async fn before(&self, anchor: i64, limit: u32) -> Result<Vec<FeedEntry>>;

    /// All entries strictly newer than `anchor`.
    async fn after(&self, anchor: i64) -> Result<Vec<FeedEntry>>;

    async fn like(&self, id: i64) -> Result<FeedEntry>;

    async fn dislike(&self, id: i64) -> Result<FeedEntry>;

    /// Creates an entry; the id on the argument is ignored, the server
    /// assigns one.
    async fn create(&self, entry: &FeedEntry) -> Result<FeedEntry>;

    async fn delete(&self, id: i64) -> Result<()>;

    async fn upload_media(&self, upload: MediaUpload) -> Result<Media>;

    async fn sign_in(&self, login: &str, pass: &str) -> Result<AuthState>;

    async fn register(&self, login: &str, pass: &str, name: &str) -> Result<AuthState>;

    async fn register_with_avatar(
        &self,
        login: &str,
        pass: &str,
        name: &str,
        avatar: MediaUpload,
    ) -> Result<AuthState>;
}
