//! End-to-end tests for the webhook pipeline with in-memory image and asset backends.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Mutex;

use async_trait::async_trait;
use base64::Engine;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use serde_json::{json, Value};

use watermark_hook::{
    AssetHandle, AssetPublisher, HookError, ImageFetcher, NewAsset, Outcome, WebhookEvent,
    WebhookHandler,
};

const WATERMARK_URL: &str = "https://cdn.example.com/watermark.png";
const SOURCE_REF: &str = "//images.ctfassets.net/space123/a1/cat.png";
const SOURCE_URL: &str = "https://images.ctfassets.net/space123/a1/cat.png";

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn png(w: u32, h: u32, px: [u8; 4]) -> Vec<u8> {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba(px)));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

fn jpeg(w: u32, h: u32, px: [u8; 3]) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb(px)));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Jpeg).unwrap();
    buf.into_inner()
}

fn record(file_name: &str) -> Value {
    json!({
        "url": SOURCE_REF,
        "title": "Cat",
        "description": "A sleepy cat",
        "fileName": file_name,
        "contentType": "image/png",
        "width": 200,
        "height": 150
    })
}

fn event(record: &Value) -> WebhookEvent {
    let body = base64::engine::general_purpose::STANDARD.encode(record.to_string());
    WebhookEvent { body: Some(body) }
}

// ---------------------------------------------------------------------------
// In-memory image fetcher
// ---------------------------------------------------------------------------

#[derive(Default)]
struct StubFetcher {
    images: HashMap<String, Vec<u8>>,
    calls: Mutex<Vec<String>>,
}

impl StubFetcher {
    fn with(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.images.insert(url.to_string(), bytes);
        self
    }

    fn standard() -> Self {
        Self::default()
            .with(SOURCE_URL, png(200, 150, [0, 0, 0, 255]))
            .with(WATERMARK_URL, png(40, 20, [255, 255, 255, 255]))
    }
}

#[async_trait]
impl<'a> ImageFetcher for &'a StubFetcher {
    async fn fetch(&self, url: &str) -> watermark_hook::Result<Vec<u8>> {
        self.calls.lock().unwrap().push(url.to_string());
        self.images.get(url).cloned().ok_or_else(|| HookError::Fetch {
            url: url.to_string(),
            reason: "HTTP 404 Not Found".to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Recording asset publisher
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
enum Stage {
    Create,
    Process,
    Publish,
}

#[derive(Default)]
struct RecordingPublisher {
    fail_at: Option<Stage>,
    created: Mutex<Vec<NewAsset>>,
    stages: Mutex<Vec<Stage>>,
    /// asset id -> published?
    assets: Mutex<HashMap<String, bool>>,
}

impl RecordingPublisher {
    fn failing_at(stage: Stage) -> Self {
        Self {
            fail_at: Some(stage),
            ..Self::default()
        }
    }

    fn enter(&self, stage: Stage) -> watermark_hook::Result<()> {
        self.stages.lock().unwrap().push(stage);
        if self.fail_at == Some(stage) {
            return Err(HookError::Contentful(
                contentful_client::ContentfulError::Api {
                    status: 422,
                    message: format!("{stage:?} rejected"),
                },
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl<'a> AssetPublisher for &'a RecordingPublisher {
    async fn create_asset(&self, asset: NewAsset) -> watermark_hook::Result<AssetHandle> {
        self.enter(Stage::Create)?;
        let id = format!("asset-{}", self.created.lock().unwrap().len() + 1);
        self.created.lock().unwrap().push(asset);
        self.assets.lock().unwrap().insert(id.clone(), false);
        Ok(AssetHandle {
            space_id: "space123".into(),
            environment_id: "master".into(),
            asset_id: id,
            version: 1,
            published: false,
        })
    }

    async fn process(&self, handle: AssetHandle) -> watermark_hook::Result<AssetHandle> {
        self.enter(Stage::Process)?;
        Ok(AssetHandle {
            version: handle.version + 1,
            ..handle
        })
    }

    async fn publish(&self, handle: AssetHandle) -> watermark_hook::Result<AssetHandle> {
        self.enter(Stage::Publish)?;
        self.assets
            .lock()
            .unwrap()
            .insert(handle.asset_id.clone(), true);
        Ok(AssetHandle {
            version: handle.version + 1,
            published: true,
            ..handle
        })
    }
}

fn handler<'a>(
    fetcher: &'a StubFetcher,
    publisher: &'a RecordingPublisher,
) -> WebhookHandler<&'a StubFetcher, &'a RecordingPublisher> {
    WebhookHandler::new(WATERMARK_URL, fetcher, publisher)
}

// ---------------------------------------------------------------------------
// Skip guard
// ---------------------------------------------------------------------------

#[tokio::test]
async fn marked_assets_are_skipped_without_io() {
    for name in ["[WATERMARKED] cat.png", "[WATERMARKED]cat.png", "[WATERMARKED] "] {
        let fetcher = StubFetcher::standard();
        let publisher = RecordingPublisher::default();

        let resp = handler(&fetcher, &publisher).handle(event(&record(name))).await;

        assert_eq!(resp.status_code, 200, "{name}");
        assert_eq!(resp.message.as_deref(), Some("Skipped - marked already"));
        assert!(resp.body.is_none());
        assert!(fetcher.calls.lock().unwrap().is_empty(), "{name}");
        assert!(publisher.stages.lock().unwrap().is_empty(), "{name}");
    }
}

#[tokio::test]
async fn marked_asset_is_skipped_even_if_other_fields_are_missing() {
    let fetcher = StubFetcher::standard();
    let publisher = RecordingPublisher::default();
    let partial = json!({ "fileName": "[WATERMARKED] cat.png" });

    let outcome = handler(&fetcher, &publisher)
        .run(event(&partial).body.as_deref())
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Skipped);
}

// ---------------------------------------------------------------------------
// Success path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fresh_asset_is_watermarked_and_published() {
    let fetcher = StubFetcher::standard();
    let publisher = RecordingPublisher::default();
    let input = record("cat.png");

    let resp = handler(&fetcher, &publisher).handle(event(&input)).await;

    assert_eq!(resp.status_code, 200);
    assert!(resp.error.is_none());
    let body = resp.body_json().expect("success carries a JSON body");
    assert_eq!(body["message"], "Image Cat watermarked successfully");
    assert_eq!(body["input"], input);

    assert_eq!(
        *fetcher.calls.lock().unwrap(),
        vec![SOURCE_URL.to_string(), WATERMARK_URL.to_string()]
    );
    assert_eq!(
        *publisher.stages.lock().unwrap(),
        vec![Stage::Create, Stage::Process, Stage::Publish]
    );
    assert_eq!(publisher.assets.lock().unwrap().get("asset-1"), Some(&true));
}

#[tokio::test]
async fn uploaded_asset_is_marked() {
    let fetcher = StubFetcher::standard();
    let publisher = RecordingPublisher::default();

    handler(&fetcher, &publisher)
        .handle(event(&record("cat.png")))
        .await;

    let created = publisher.created.lock().unwrap();
    assert_eq!(created.len(), 1);
    let asset = &created[0];
    assert_eq!(asset.title, "[WATERMARKED] Cat");
    assert_eq!(asset.file_name, "[WATERMARKED] cat.png");
    assert_eq!(asset.description.as_deref(), Some("A sleepy cat"));
    assert_eq!(asset.content_type, "image/png");

    let uploaded = image::load_from_memory(&asset.bytes).unwrap();
    assert_eq!((uploaded.width(), uploaded.height()), (200, 150));
    assert_eq!(image::guess_format(&asset.bytes).unwrap(), ImageFormat::Png);

    let rgba = uploaded.to_rgba8();
    assert_eq!(rgba.get_pixel(10, 10).0, [0, 0, 0, 255]);
    let stamped = rgba.get_pixel(60, 55).0;
    assert!(stamped[0] > 100 && stamped[0] < 160, "{stamped:?}");
}

#[tokio::test]
async fn jpeg_sources_are_reencoded_as_jpeg() {
    let fetcher = StubFetcher::default()
        .with(SOURCE_URL, jpeg(120, 120, [20, 40, 60]))
        .with(WATERMARK_URL, png(30, 30, [255, 255, 255, 255]));
    let publisher = RecordingPublisher::default();
    let mut input = record("cat.jpg");
    input["contentType"] = json!("image/jpeg");

    let resp = handler(&fetcher, &publisher).handle(event(&input)).await;

    assert_eq!(resp.status_code, 200, "{:?}", resp.error);
    let created = publisher.created.lock().unwrap();
    assert_eq!(image::guess_format(&created[0].bytes).unwrap(), ImageFormat::Jpeg);
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn absent_body_is_a_500() {
    let fetcher = StubFetcher::standard();
    let publisher = RecordingPublisher::default();

    let resp = handler(&fetcher, &publisher)
        .handle(WebhookEvent { body: None })
        .await;

    assert_eq!(resp.status_code, 500);
    assert_eq!(
        resp.error.as_deref(),
        Some("event body is missing or could not be decoded")
    );
    assert!(fetcher.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn undecodable_body_is_a_500() {
    let fetcher = StubFetcher::standard();
    let publisher = RecordingPublisher::default();
    let not_json = base64::engine::general_purpose::STANDARD.encode("not json at all");

    for body in ["%%% not base64 %%%".to_string(), not_json] {
        let resp = handler(&fetcher, &publisher)
            .handle(WebhookEvent { body: Some(body) })
            .await;
        assert_eq!(resp.status_code, 500);
        assert!(resp.error.is_some());
    }
    assert!(publisher.created.lock().unwrap().is_empty());
}

#[tokio::test]
async fn missing_file_name_is_rejected_before_any_fetch() {
    let fetcher = StubFetcher::standard();
    let publisher = RecordingPublisher::default();
    let mut input = record("cat.png");
    input.as_object_mut().unwrap().remove("fileName");

    let resp = handler(&fetcher, &publisher).handle(event(&input)).await;

    assert_eq!(resp.status_code, 500);
    assert_eq!(
        resp.error.as_deref(),
        Some("event body is missing required field `fileName`")
    );
    assert!(fetcher.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn missing_required_field_is_a_500() {
    let fetcher = StubFetcher::standard();
    let publisher = RecordingPublisher::default();
    let mut input = record("cat.png");
    input.as_object_mut().unwrap().remove("url");

    let resp = handler(&fetcher, &publisher).handle(event(&input)).await;

    assert_eq!(resp.status_code, 500);
    let error = resp.error.unwrap();
    assert!(error.contains("url"), "{error}");
}

#[tokio::test]
async fn source_fetch_failure_creates_no_asset() {
    let fetcher = StubFetcher::default().with(WATERMARK_URL, png(10, 10, [255, 255, 255, 255]));
    let publisher = RecordingPublisher::default();

    let resp = handler(&fetcher, &publisher)
        .handle(event(&record("cat.png")))
        .await;

    assert_eq!(resp.status_code, 500);
    assert_eq!(
        resp.error.as_deref(),
        Some("failed to fetch image https://images.ctfassets.net/space123/a1/cat.png: HTTP 404 Not Found")
    );
    assert!(publisher.stages.lock().unwrap().is_empty());
}

#[tokio::test]
async fn watermark_fetch_failure_creates_no_asset() {
    let fetcher = StubFetcher::default().with(SOURCE_URL, png(100, 100, [0, 0, 0, 255]));
    let publisher = RecordingPublisher::default();

    let resp = handler(&fetcher, &publisher)
        .handle(event(&record("cat.png")))
        .await;

    assert_eq!(resp.status_code, 500);
    assert!(resp.error.unwrap().contains(WATERMARK_URL));
    assert!(publisher.created.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unreadable_source_image_is_a_500() {
    let fetcher = StubFetcher::default()
        .with(SOURCE_URL, b"definitely not an image".to_vec())
        .with(WATERMARK_URL, png(10, 10, [255, 255, 255, 255]));
    let publisher = RecordingPublisher::default();

    let resp = handler(&fetcher, &publisher)
        .handle(event(&record("cat.png")))
        .await;

    assert_eq!(resp.status_code, 500);
    assert!(resp.error.unwrap().starts_with("image error"));
    assert!(publisher.created.lock().unwrap().is_empty());
}

#[tokio::test]
async fn publish_failure_leaves_draft_asset() {
    let fetcher = StubFetcher::standard();
    let publisher = RecordingPublisher::failing_at(Stage::Publish);

    let resp = handler(&fetcher, &publisher)
        .handle(event(&record("cat.png")))
        .await;

    assert_eq!(resp.status_code, 500);
    assert_eq!(
        resp.error.as_deref(),
        Some("contentful error: API error (status 422): Publish rejected")
    );
    assert_eq!(
        *publisher.stages.lock().unwrap(),
        vec![Stage::Create, Stage::Process, Stage::Publish]
    );
    // No rollback: the draft stays behind, unpublished.
    assert_eq!(publisher.assets.lock().unwrap().get("asset-1"), Some(&false));
}

#[tokio::test]
async fn process_failure_skips_publish() {
    let fetcher = StubFetcher::standard();
    let publisher = RecordingPublisher::failing_at(Stage::Process);

    let resp = handler(&fetcher, &publisher)
        .handle(event(&record("cat.png")))
        .await;

    assert_eq!(resp.status_code, 500);
    assert_eq!(
        *publisher.stages.lock().unwrap(),
        vec![Stage::Create, Stage::Process]
    );
    assert_eq!(publisher.assets.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn non_numeric_dimensions_do_not_block_processing() {
    let fetcher = StubFetcher::standard();
    let publisher = RecordingPublisher::default();
    let mut input = record("cat.png");
    input["width"] = json!("640");
    input["height"] = json!({ "px": 480 });

    let resp = handler(&fetcher, &publisher).handle(event(&input)).await;

    assert_eq!(resp.status_code, 200, "{:?}", resp.error);
    assert_eq!(resp.body_json().unwrap()["input"], input);
    assert_eq!(publisher.created.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn non_object_payload_is_a_500() {
    let fetcher = StubFetcher::standard();
    let publisher = RecordingPublisher::default();

    for payload in [Value::Null, json!("body"), json!({ "body": 7 })] {
        let resp = handler(&fetcher, &publisher)
            .handle(WebhookEvent::from_payload(&payload))
            .await;

        assert_eq!(resp.status_code, 500, "{payload}");
        assert_eq!(
            resp.error.as_deref(),
            Some("event body is missing or could not be decoded")
        );
    }
    assert!(fetcher.calls.lock().unwrap().is_empty());
}
