//! The webhook pipeline: decode, guard, composite, publish, respond.

use serde_json::Value;
use tracing::{error, info};

use crate::compositor::{Compositor, HttpImageFetcher, ImageFetcher};
use crate::config::HookConfig;
use crate::error::{HookError, Result};
use crate::guard;
use crate::payload::{self, IncomingRequest, WebhookEvent};
use crate::publisher::{AssetHandle, AssetPublisher, ContentfulPublisher, NewAsset};
use crate::response::OutcomeResponse;

/// How a run that did not fail ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Skipped,
    Processed {
        title: String,
        input: Value,
        asset: AssetHandle,
    },
}

pub struct WebhookHandler<F, P> {
    compositor: Compositor<F>,
    publisher: P,
}

impl WebhookHandler<HttpImageFetcher, ContentfulPublisher> {
    /// The production wiring: images over HTTPS, assets into Contentful.
    pub fn from_config(config: HookConfig) -> Self {
        let publisher = ContentfulPublisher::from_config(&config);
        Self::new(config.watermark_image_url, HttpImageFetcher::new(), publisher)
    }
}

impl<F: ImageFetcher, P: AssetPublisher> WebhookHandler<F, P> {
    pub fn new(watermark_image_url: impl Into<String>, fetcher: F, publisher: P) -> Self {
        Self {
            compositor: Compositor::new(fetcher, watermark_image_url),
            publisher,
        }
    }

    /// Run the pipeline and turn its result into a response. Never fails.
    pub async fn handle(&self, event: WebhookEvent) -> OutcomeResponse {
        match self.run(event.body.as_deref()).await {
            Ok(Outcome::Skipped) => OutcomeResponse::skipped(),
            Ok(Outcome::Processed { title, input, .. }) => {
                OutcomeResponse::processed(&title, &input)
            }
            Err(e) => {
                error!(error = %e, "Watermark hook failed");
                OutcomeResponse::failed(&e)
            }
        }
    }

    pub async fn run(&self, body: Option<&str>) -> Result<Outcome> {
        let record = payload::decode_event_body(body).ok_or(HookError::MissingBody)?;

        let file_name = payload::file_name_of(&record);
        if guard::is_marked(file_name) {
            info!(file_name, "Skipped this hook, asset is already marked");
            return Ok(Outcome::Skipped);
        }

        let request = IncomingRequest::from_record(&record)?;
        let file_name = request
            .file_name
            .as_deref()
            .ok_or(HookError::MissingField("fileName"))?;

        info!(title = %request.title, file_name, url = %request.url, "Watermarking asset");

        let image = self.compositor.watermark(&request.url).await?;

        let new_asset = NewAsset {
            title: guard::mark(&request.title),
            description: request.description.clone(),
            file_name: guard::mark(file_name),
            content_type: request.content_type.clone(),
            bytes: image.bytes,
        };

        let handle = self.publisher.create_asset(new_asset).await?;
        let handle = self.publisher.process(handle).await?;
        let handle = self.publisher.publish(handle).await?;

        info!(
            asset_id = %handle.asset_id,
            version = handle.version,
            "Watermarked asset published"
        );

        Ok(Outcome::Processed {
            title: request.title,
            input: record,
            asset: handle,
        })
    }
}
