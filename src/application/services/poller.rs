use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use tracing::debug;

use crate::application::ports::remote::FeedApi;
use crate::infrastructure::database::{FeedStore, RemoteKeyStore};
use crate::shared::error::Result;

/// Periodic probe for items beyond the newest cached id. Fetched items are
/// ingested hidden, so the feed can show a "N newer posts" affordance
/// without folding them in; the count is what each tick yields.
///
/// The stream terminates on the first classified failure; polling never
/// swallows errors. The consumer resubscribes to resume.
pub struct NewerCountPoller {
    api: Arc<dyn FeedApi>,
    store: FeedStore,
    keys: RemoteKeyStore,
    interval: Duration,
}

impl NewerCountPoller {
    pub fn new(
        api: Arc<dyn FeedApi>,
        store: FeedStore,
        keys: RemoteKeyStore,
        interval: Duration,
    ) -> Self {
        Self {
            api,
            store,
            keys,
            interval,
        }
    }

    pub fn stream(&self) -> impl Stream<Item = Result<usize>> + Send + 'static {
        let api = self.api.clone();
        let store = self.store.clone();
        let keys = self.keys.clone();
        let interval = self.interval;

        async_stream::stream! {
            loop {
                // Dropping the stream cancels here, between ticks.
                tokio::time::sleep(interval).await;

                let anchor = match newest_cached_id(&keys, &store).await {
                    Ok(anchor) => anchor,
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                };

                match api.after(anchor).await {
                    Ok(newer) => {
                        let count = newer.len();
                        if let Err(e) = store.upsert_hidden(&newer).await {
                            yield Err(e);
                            break;
                        }
                        debug!(anchor, count, "newer-count poll tick");
                        yield Ok(count);
                    }
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                }
            }
        }
    }
}

/// The AFTER key is the authoritative head anchor; fall back to the newest
/// visible row before the first successful refresh establishes the window.
async fn newest_cached_id(keys: &RemoteKeyStore, store: &FeedStore) -> Result<i64> {
    if let Some(id) = keys.max_id().await? {
        return Ok(id);
    }
    Ok(store.newest_visible_id().await?.unwrap_or(0))
}
