pub mod entities;
pub mod feed_item;
