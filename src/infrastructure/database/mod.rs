pub mod connection_pool;
pub mod feed_store;
mod queries;
pub mod remote_keys;
pub mod rows;


pub use connection_pool::ConnectionPool;
pub use feed_store::{FeedStore, FeedTransaction};
pub use remote_keys::RemoteKeyStore;
