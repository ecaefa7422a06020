//! Fetch the source and watermark images and blend one onto the other.
//!
//! Decoding, alpha blending and encoding are done by the `image` crate; this
//! module only fixes the parameters and wires the fetches in.

use std::io::Cursor;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, RgbaImage};
use tracing::info;

use crate::error::{HookError, Result};

/// Alpha multiplier applied to every watermark pixel.
pub const WATERMARK_OPACITY: f32 = 0.5;

/// Top-left position of the watermark on the source image, in pixels.
pub const WATERMARK_OFFSET: (i64, i64) = (50, 50);

/// Source of raw image bytes.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Fetches images over HTTP(S).
#[derive(Debug, Clone, Default)]
pub struct HttpImageFetcher {
    http: reqwest::Client,
}

impl HttpImageFetcher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let fail = |reason: String| HookError::Fetch {
            url: url.to_string(),
            reason,
        };

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| fail(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(fail(format!("HTTP {status}")));
        }

        let bytes = resp.bytes().await.map_err(|e| fail(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Contentful hands out scheme-relative URLs (`//images.ctfassets.net/...`).
pub fn source_url(reference: &str) -> String {
    if reference.contains("://") {
        reference.to_string()
    } else {
        format!("https:{reference}")
    }
}

/// Scale the alpha channel of every pixel by `opacity`.
pub fn with_opacity(image: &DynamicImage, opacity: f32) -> RgbaImage {
    let opacity = opacity.clamp(0.0, 1.0);
    let mut rgba = image.to_rgba8();
    for pixel in rgba.pixels_mut() {
        pixel.0[3] = (f32::from(pixel.0[3]) * opacity).round() as u8;
    }
    rgba
}

/// Draw `overlay` on top of `base` at (x, y) with the given opacity.
///
/// Parts of the overlay falling outside the base are clipped. The result keeps
/// the base's alpha-ness so opaque sources can be re-encoded as JPEG.
pub fn composite(
    base: &DynamicImage,
    overlay: &DynamicImage,
    opacity: f32,
    x: i64,
    y: i64,
) -> DynamicImage {
    let mark = with_opacity(overlay, opacity);
    let mut canvas = base.to_rgba8();
    image::imageops::overlay(&mut canvas, &mark, x, y);

    let blended = DynamicImage::ImageRgba8(canvas);
    if base.color().has_alpha() {
        blended
    } else {
        DynamicImage::ImageRgb8(blended.into_rgb8())
    }
}

pub fn encode(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, format)?;
    Ok(buf.into_inner())
}

/// An encoded, watermarked image ready for upload.
#[derive(Debug, Clone)]
pub struct WatermarkedImage {
    pub bytes: Vec<u8>,
    /// Same as the source image's format.
    pub format: ImageFormat,
}

pub struct Compositor<F> {
    fetcher: F,
    watermark_url: String,
}

impl<F: ImageFetcher> Compositor<F> {
    pub fn new(fetcher: F, watermark_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            watermark_url: watermark_url.into(),
        }
    }

    /// Fetch the source by its stored reference, stamp the watermark on it and
    /// re-encode it in the source's own format.
    pub async fn watermark(&self, reference: &str) -> Result<WatermarkedImage> {
        let url = source_url(reference);

        let source_bytes = self.fetcher.fetch(&url).await?;
        let format = image::guess_format(&source_bytes)?;
        let base = image::load_from_memory_with_format(&source_bytes, format)?;

        let mark_bytes = self.fetcher.fetch(&self.watermark_url).await?;
        let mark = image::load_from_memory(&mark_bytes)?;

        let (x, y) = WATERMARK_OFFSET;
        let output = composite(&base, &mark, WATERMARK_OPACITY, x, y);
        let bytes = encode(&output, format)?;

        info!(
            url = %url,
            format = ?format,
            width = output.width(),
            height = output.height(),
            size = bytes.len(),
            "Watermark applied"
        );

        Ok(WatermarkedImage { bytes, format })
    }
}
