//! Core bulletin library: REST client, live update channel, view store.

pub mod api;
pub mod config;
pub mod error;
pub mod feed;
pub mod live;
pub mod logging;
pub mod model;
pub mod render;
pub mod router;
pub mod store;

pub use api::{ApiClient, Credentials, NewsletterApi};
pub use error::{ApiError, ApiErrorKind, ApiResult, Operation};
pub use feed::Feed;
pub use model::{Action, Newsletter, NewsletterDraft, StreamEvent};
pub use store::{ViewEntry, ViewStore};
