use std::sync::Arc;

use anyhow::Result;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

use watermark_hook::{HookConfig, OutcomeResponse, WebhookEvent, WebhookHandler};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("watermark_hook=info".parse()?),
        )
        .with_target(false)
        .without_time()
        .init();

    info!("Watermark hook starting...");

    let config = HookConfig::from_env();
    let handler = Arc::new(WebhookHandler::from_config(config));

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let handler = Arc::clone(&handler);
        async move {
            let request_id = event.context.request_id.clone();
            let response = handler
                .handle(WebhookEvent::from_payload(&event.payload))
                .await;
            info!(request_id, status = response.status_code, "Invocation finished");
            Ok::<OutcomeResponse, Error>(response)
        }
    }))
    .await
    .map_err(|e| anyhow::anyhow!("{e}"))
}
