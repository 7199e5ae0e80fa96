pub mod action;
pub mod auth;
pub mod post;

pub use action::{ActionKind, FailurePolicy, PendingAction};
pub use auth::AuthState;
pub use post::{Attachment, AttachmentKind, FeedEntry, Media, MediaUpload};
