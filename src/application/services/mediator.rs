use std::sync::Arc;

use tracing::{debug, info};

use crate::application::ports::remote::FeedApi;
use crate::domain::entities::post::FeedEntry;
use crate::infrastructure::database::FeedStore;
use crate::shared::config::PagingConfig;
use crate::shared::error::Result;

/// The three load intents of the paging consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadIntent {
    /// Fetch the latest entries from the remote head.
    Refresh,
    /// Scroll toward older entries, anchored on the BEFORE key.
    Append,
    /// Catch up toward newer entries, anchored on the AFTER key.
    Prepend,
}

/// Terminal result of a successful load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSuccess {
    /// True when this direction returned no more data; the consumer stops
    /// requesting further pages that way.
    pub end_of_pagination: bool,
}

impl LoadSuccess {
    fn done() -> Self {
        Self {
            end_of_pagination: true,
        }
    }

    fn more() -> Self {
        Self {
            end_of_pagination: false,
        }
    }
}

/// Stitches cursor-based forward/backward pagination against the local
/// cache. Every successful fetch lands its entries and the boundary-key
/// update in one transaction; a failed fetch rolls the whole load back, so
/// partial application is never observable. The mediator does not retry;
/// the consumer re-invokes the same intent.
pub struct RemoteMediator {
    api: Arc<dyn FeedApi>,
    store: FeedStore,
    paging: PagingConfig,
}

impl RemoteMediator {
    pub fn new(api: Arc<dyn FeedApi>, store: FeedStore, paging: PagingConfig) -> Self {
        Self { api, store, paging }
    }

    pub async fn load(&self, intent: LoadIntent) -> Result<LoadSuccess> {
        debug!(?intent, "remote mediator load");
        // The anchor read, entry writes and key writes share one
        // transaction, held across the fetch so two concurrent loads cannot
        // both read a stale boundary.
        let mut tx = self.store.begin().await?;

        let result = match intent {
            LoadIntent::Refresh => {
                let cold_start = tx.keys_empty().await?;
                let batch = self.api.latest(self.paging.initial_load_size).await?;
                let Some((oldest, newest)) = id_bounds(&batch) else {
                    return Ok(LoadSuccess::done());
                };
                tx.upsert_all(&confirm(batch)).await?;
                if cold_start {
                    tx.set_after(newest).await?;
                }
                // A warm refresh rewrites only the tail cursor; the head
                // anchor stays where the last prepend left it.
                tx.set_before(oldest).await?;
                tx.commit().await?;
                info!(oldest, newest, cold_start, "refresh window committed");
                LoadSuccess::more()
            }
            LoadIntent::Append => {
                let Some(anchor) = tx.min_key().await? else {
                    // Window not established yet; defer to refresh.
                    return Ok(LoadSuccess::done());
                };
                let batch = self.api.before(anchor, self.paging.page_size).await?;
                let Some((oldest, _)) = id_bounds(&batch) else {
                    return Ok(LoadSuccess::done());
                };
                tx.upsert_all(&confirm(batch)).await?;
                tx.set_before(oldest).await?;
                tx.commit().await?;
                info!(anchor, oldest, "append window committed");
                LoadSuccess::more()
            }
            LoadIntent::Prepend => {
                let Some(anchor) = tx.max_key().await? else {
                    return Ok(LoadSuccess::done());
                };
                let batch = self.api.after(anchor).await?;
                let Some((_, newest)) = id_bounds(&batch) else {
                    return Ok(LoadSuccess::done());
                };
                tx.upsert_all(&confirm(batch)).await?;
                tx.set_after(newest).await?;
                tx.commit().await?;
                info!(anchor, newest, "prepend window committed");
                LoadSuccess::more()
            }
        };

        Ok(result)
    }
}

/// Oldest and newest ids of a fetched batch, independent of server ordering.
fn id_bounds(batch: &[FeedEntry]) -> Option<(i64, i64)> {
    let oldest = batch.iter().map(|entry| entry.id).min()?;
    let newest = batch.iter().map(|entry| entry.id).max()?;
    Some((oldest, newest))
}

/// Remote pages are authoritative: everything ingested by the mediator is
/// confirmed and user-visible.
fn confirm(batch: Vec<FeedEntry>) -> Vec<FeedEntry> {
    batch.into_iter().map(FeedEntry::into_confirmed).collect()
}
