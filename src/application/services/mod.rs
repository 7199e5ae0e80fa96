pub mod mediator;
pub mod poller;
pub mod repository;
pub mod session;

#[cfg(test)]
mod tests;

pub use mediator::{LoadIntent, LoadSuccess, RemoteMediator};
pub use poller::NewerCountPoller;
pub use repository::{FeedRepository, LikeOutcome};
pub use session::AuthSession;
