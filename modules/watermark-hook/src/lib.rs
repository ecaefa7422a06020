pub mod compositor;
pub mod config;
pub mod error;
pub mod guard;
pub mod handler;
pub mod payload;
pub mod publisher;
pub mod response;

pub use compositor::{Compositor, HttpImageFetcher, ImageFetcher, WatermarkedImage};
pub use config::HookConfig;
pub use error::{HookError, Result};
pub use handler::{Outcome, WebhookHandler};
pub use payload::{decode_event_body, IncomingRequest, WebhookEvent};
pub use publisher::{AssetHandle, AssetPublisher, ContentfulPublisher, NewAsset};
pub use response::OutcomeResponse;
