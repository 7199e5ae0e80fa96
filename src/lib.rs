pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;
pub mod state;

pub use application::ports::remote::FeedApi;
pub use application::services::{
    AuthSession, FeedRepository, LikeOutcome, LoadIntent, LoadSuccess, NewerCountPoller,
    RemoteMediator,
};
pub use domain::entities::{ActionKind, AuthState, FailurePolicy, FeedEntry, PendingAction};
pub use domain::feed_item::{DayBucket, DaySeparator, FeedItem};
pub use shared::config::AppConfig;
pub use shared::error::{ActionError, FeedError};
pub use state::AppState;

/// Installs the default tracing subscriber. Embedders that manage their own
/// subscriber skip this.
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "feedsync=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
