use std::sync::Arc;

use sqlx::{Sqlite, Transaction};
use tokio::sync::watch;
use tracing::debug;

use super::connection_pool::ConnectionPool;
use super::queries::{
    COUNT_REMOTE_KEYS, DELETE_ALL_ENTRIES, DELETE_ENTRY_BY_ID, DELETE_REMOTE_KEYS,
    MARK_ALL_VISIBLE, SELECT_ENTRY_BY_ID, SELECT_NEWEST_VISIBLE_ID, SELECT_REMOTE_KEY,
    SELECT_VISIBLE_PAGE, UPSERT_FEED_ENTRY, UPSERT_REMOTE_KEY,
};
use super::remote_keys::KeyKind;
use super::rows::{entries_from_rows, entry_from_row, FeedEntryRow};
use crate::domain::entities::post::FeedEntry;
use crate::shared::error::Result;

fn upsert_query(
    entry: &FeedEntry,
) -> sqlx::query::Query<'_, Sqlite, sqlx::sqlite::SqliteArguments<'_>> {
    sqlx::query(UPSERT_FEED_ENTRY)
        .bind(entry.id)
        .bind(&entry.author)
        .bind(entry.author_id)
        .bind(entry.author_avatar.as_deref())
        .bind(&entry.content)
        .bind(entry.published.timestamp())
        .bind(entry.likes)
        .bind(entry.liked_by_me)
        .bind(entry.pending)
        .bind(entry.visible)
        .bind(entry.attachment.as_ref().map(|a| a.url.clone()))
        .bind(entry.attachment.as_ref().map(|a| a.kind.as_str()))
}

/// Durable keyed cache of feed entries. Multi-entity writes go through
/// [`FeedTransaction`]; concurrent readers observe either the pre- or
/// post-transaction state, never an intermediate one.
#[derive(Clone)]
pub struct FeedStore {
    pool: ConnectionPool,
    changed: Arc<watch::Sender<u64>>,
}

impl FeedStore {
    pub fn new(pool: ConnectionPool) -> Self {
        let (changed, _) = watch::channel(0);
        Self {
            pool,
            changed: Arc::new(changed),
        }
    }

    /// Generation channel bumped after every committed write. The read
    /// model re-queries on each change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changed.subscribe()
    }

    fn notify(changed: &watch::Sender<u64>) {
        changed.send_modify(|generation| *generation = generation.wrapping_add(1));
    }

    /// Visible entries ordered by id descending, with an optional keyset
    /// cursor for the next page.
    pub async fn visible_page(&self, limit: u32, before: Option<i64>) -> Result<Vec<FeedEntry>> {
        let rows = sqlx::query_as::<_, FeedEntryRow>(SELECT_VISIBLE_PAGE)
            .bind(i64::from(limit))
            .bind(before)
            .fetch_all(self.pool.pool())
            .await?;
        entries_from_rows(rows)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<FeedEntry>> {
        let row = sqlx::query_as::<_, FeedEntryRow>(SELECT_ENTRY_BY_ID)
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await?;
        row.map(entry_from_row).transpose()
    }

    pub async fn newest_visible_id(&self) -> Result<Option<i64>> {
        let id = sqlx::query_scalar::<_, Option<i64>>(SELECT_NEWEST_VISIBLE_ID)
            .fetch_one(self.pool.pool())
            .await?;
        Ok(id)
    }

    /// Insert-or-replace by id. Applying the same entry twice leaves one row
    /// with the latest field values.
    pub async fn upsert(&self, entries: &[FeedEntry]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut tx = self.begin().await?;
        tx.upsert_all(entries).await?;
        tx.commit().await
    }

    /// Speculative ingest for newer-count probes. Entries land hidden until
    /// the user reveals them.
    pub async fn upsert_hidden(&self, entries: &[FeedEntry]) -> Result<()> {
        let hidden: Vec<FeedEntry> = entries
            .iter()
            .cloned()
            .map(FeedEntry::into_hidden)
            .collect();
        self.upsert(&hidden).await
    }

    pub async fn delete_by_id(&self, id: i64) -> Result<()> {
        sqlx::query(DELETE_ENTRY_BY_ID)
            .bind(id)
            .execute(self.pool.pool())
            .await?;
        Self::notify(&self.changed);
        Ok(())
    }

    /// Flips every hidden entry visible; returns how many were revealed.
    pub async fn mark_all_visible(&self) -> Result<u64> {
        let result = sqlx::query(MARK_ALL_VISIBLE)
            .execute(self.pool.pool())
            .await?;
        let revealed = result.rows_affected();
        if revealed > 0 {
            debug!(revealed, "revealed hidden feed entries");
            Self::notify(&self.changed);
        }
        Ok(revealed)
    }

    pub async fn delete_all(&self) -> Result<()> {
        sqlx::query(DELETE_ALL_ENTRIES)
            .execute(self.pool.pool())
            .await?;
        Self::notify(&self.changed);
        Ok(())
    }

    /// Opens an explicit unit of work covering entries and remote keys.
    /// Dropping the transaction without committing rolls everything back.
    pub async fn begin(&self) -> Result<FeedTransaction> {
        let tx = self.pool.pool().begin().await?;
        Ok(FeedTransaction {
            tx,
            changed: self.changed.clone(),
        })
    }
}

pub struct FeedTransaction {
    tx: Transaction<'static, Sqlite>,
    changed: Arc<watch::Sender<u64>>,
}

impl FeedTransaction {
    pub async fn upsert_all(&mut self, entries: &[FeedEntry]) -> Result<()> {
        for entry in entries {
            upsert_query(entry).execute(&mut *self.tx).await?;
        }
        Ok(())
    }

    pub async fn delete_by_id(&mut self, id: i64) -> Result<()> {
        sqlx::query(DELETE_ENTRY_BY_ID)
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    pub async fn delete_all(&mut self) -> Result<()> {
        sqlx::query(DELETE_ALL_ENTRIES)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn key(&mut self, kind: KeyKind) -> Result<Option<i64>> {
        let id = sqlx::query_scalar::<_, i64>(SELECT_REMOTE_KEY)
            .bind(kind.as_str())
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(id)
    }

    /// Oldest id of the cached window (the BEFORE key).
    pub async fn min_key(&mut self) -> Result<Option<i64>> {
        self.key(KeyKind::Before).await
    }

    /// Newest id of the cached window (the AFTER key).
    pub async fn max_key(&mut self) -> Result<Option<i64>> {
        self.key(KeyKind::After).await
    }

    pub async fn keys_empty(&mut self) -> Result<bool> {
        let count = sqlx::query_scalar::<_, i64>(COUNT_REMOTE_KEYS)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(count == 0)
    }

    async fn set_key(&mut self, kind: KeyKind, id: i64) -> Result<()> {
        sqlx::query(UPSERT_REMOTE_KEY)
            .bind(kind.as_str())
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    pub async fn set_before(&mut self, id: i64) -> Result<()> {
        self.set_key(KeyKind::Before, id).await
    }

    pub async fn set_after(&mut self, id: i64) -> Result<()> {
        self.set_key(KeyKind::After, id).await
    }

    pub async fn clear_keys(&mut self) -> Result<()> {
        sqlx::query(DELETE_REMOTE_KEYS)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        FeedStore::notify(&self.changed);
        Ok(())
    }
}
