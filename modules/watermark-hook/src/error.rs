//! Errors surfaced by the webhook pipeline. Every variant ends up as a 500
//! response carrying only its `Display` text.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, HookError>;

#[derive(Debug, Error)]
pub enum HookError {
    /// Body was absent, empty, or not base64-encoded JSON.
    #[error("event body is missing or could not be decoded")]
    MissingBody,

    #[error("malformed event body: {0}")]
    MalformedBody(String),

    #[error("event body is missing required field `{0}`")]
    MissingField(&'static str),

    #[error("failed to fetch image {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("contentful error: {0}")]
    Contentful(#[from] contentful_client::ContentfulError),
}

impl From<serde_json::Error> for HookError {
    fn from(err: serde_json::Error) -> Self {
        HookError::MalformedBody(err.to_string())
    }
}
