use std::sync::Arc;

use tracing::info;

use crate::application::ports::remote::FeedApi;
use crate::application::services::{
    AuthSession, FeedRepository, NewerCountPoller, RemoteMediator,
};
use crate::domain::entities::auth::AuthState;
use crate::infrastructure::database::{ConnectionPool, FeedStore, RemoteKeyStore};
use crate::infrastructure::remote::HttpFeedApi;
use crate::shared::config::AppConfig;
use crate::shared::error::{FeedError, Result};

/// The fully constructed object graph for an embedding client. Everything is
/// dependency-injected from here; nothing in the crate reaches for global
/// state.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub session: Arc<AuthSession>,
    pub store: FeedStore,
    pub keys: RemoteKeyStore,
    pub repository: Arc<FeedRepository>,
    pub mediator: Arc<RemoteMediator>,
    pub poller: Arc<NewerCountPoller>,
}

impl AppState {
    /// Wires the default HTTP-backed graph. `initial_auth` comes from
    /// whatever credential storage the embedder uses; pass
    /// [`AuthState::anonymous`] on first launch.
    pub async fn initialize(config: AppConfig, initial_auth: AuthState) -> Result<Self> {
        config.validate().map_err(FeedError::Unknown)?;

        let pool = ConnectionPool::new(&config.database)
            .await
            .map_err(FeedError::from)?;
        pool.migrate().await?;

        let session = Arc::new(AuthSession::new(initial_auth));
        let api: Arc<dyn FeedApi> = Arc::new(HttpFeedApi::new(&config.remote, session.clone())?);

        let state = Self::with_api(config, session, api, pool);
        info!("feedsync state initialized");
        Ok(state)
    }

    /// Same graph over an arbitrary [`FeedApi`] and pool; used by tests and
    /// by embedders that bring their own transport.
    pub fn with_api(
        config: AppConfig,
        session: Arc<AuthSession>,
        api: Arc<dyn FeedApi>,
        pool: ConnectionPool,
    ) -> Self {
        let store = FeedStore::new(pool.clone());
        let keys = RemoteKeyStore::new(pool);

        let mediator = Arc::new(RemoteMediator::new(
            api.clone(),
            store.clone(),
            config.paging.clone(),
        ));
        let repository = Arc::new(FeedRepository::new(
            api.clone(),
            store.clone(),
            session.clone(),
            config.paging.clone(),
        ));
        let poller = Arc::new(NewerCountPoller::new(
            api,
            store.clone(),
            keys.clone(),
            config.polling.interval(),
        ));

        Self {
            config,
            session,
            store,
            keys,
            repository,
            mediator,
            poller,
        }
    }
}
