use super::connection_pool::ConnectionPool;
use super::queries::{COUNT_REMOTE_KEYS, DELETE_REMOTE_KEYS, SELECT_REMOTE_KEY, UPSERT_REMOTE_KEY};
use crate::shared::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// Oldest id at the tail of the cached window; anchor for append fetches.
    Before,
    /// Newest id at the head; anchor for prepend fetches and newer-count probes.
    After,
}

impl KeyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyKind::Before => "before",
            KeyKind::After => "after",
        }
    }
}

/// Tracks the two cursors bounding the cached contiguous window. The remote
/// mediator reads and writes these inside its own transaction; this store
/// serves standalone reads (newer-count polling) and tests.
#[derive(Clone)]
pub struct RemoteKeyStore {
    pool: ConnectionPool,
}

impl RemoteKeyStore {
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    async fn key(&self, kind: KeyKind) -> Result<Option<i64>> {
        let id = sqlx::query_scalar::<_, i64>(SELECT_REMOTE_KEY)
            .bind(kind.as_str())
            .fetch_optional(self.pool.pool())
            .await?;
        Ok(id)
    }

    pub async fn min_id(&self) -> Result<Option<i64>> {
        self.key(KeyKind::Before).await
    }

    pub async fn max_id(&self) -> Result<Option<i64>> {
        self.key(KeyKind::After).await
    }

    pub async fn is_empty(&self) -> Result<bool> {
        let count = sqlx::query_scalar::<_, i64>(COUNT_REMOTE_KEYS)
            .fetch_one(self.pool.pool())
            .await?;
        Ok(count == 0)
    }

    async fn set(&self, kind: KeyKind, id: i64) -> Result<()> {
        sqlx::query(UPSERT_REMOTE_KEY)
            .bind(kind.as_str())
            .bind(id)
            .execute(self.pool.pool())
            .await?;
        Ok(())
    }

    pub async fn set_before(&self, id: i64) -> Result<()> {
        self.set(KeyKind::Before, id).await
    }

    pub async fn set_after(&self, id: i64) -> Result<()> {
        self.set(KeyKind::After, id).await
    }

    pub async fn clear(&self) -> Result<()> {
        sqlx::query(DELETE_REMOTE_KEYS)
            .execute(self.pool.pool())
            .await?;
        Ok(())
    }
}
