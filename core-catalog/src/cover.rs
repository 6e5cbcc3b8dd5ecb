//! Cover art download and scaling.

use crate::error::{CatalogError, Result};
use bridge_traits::http::{HttpClient, HttpRequest};
use bytes::Bytes;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Decoded cover art, scaled to fit a square box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverImage {
    pub width: u32,
    pub height: u32,
    /// Row-major RGBA8 pixels.
    pub rgba: Vec<u8>,
}

impl CoverImage {
    /// Re-encodes the pixels as PNG.
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let buffer = image::RgbaImage::from_raw(self.width, self.height, self.rgba.clone())
            .ok_or_else(|| CatalogError::Image("Pixel buffer does not match size".to_string()))?;

        let mut out = Vec::new();
        DynamicImage::ImageRgba8(buffer)
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .map_err(|e| CatalogError::Image(format!("Failed to encode PNG: {}", e)))?;
        Ok(out)
    }
}

pub struct CoverArtFetcher {
    http_client: Arc<dyn HttpClient>,
    box_px: u32,
    timeout: Duration,
}

impl CoverArtFetcher {
    pub fn new(http_client: Arc<dyn HttpClient>, box_px: u32, timeout: Duration) -> Self {
        Self {
            http_client,
            box_px: box_px.max(1),
            timeout,
        }
    }

    /// Downloads the image at `url` and scales it into the configured box,
    /// keeping its aspect ratio. A single attempt.
    pub async fn fetch(&self, url: &str) -> Result<CoverImage> {
        if url.trim().is_empty() {
            return Err(CatalogError::InvalidInput("Cover URL is empty".to_string()));
        }

        debug!(url, "Fetching cover art");
        let request = HttpRequest::get(url).timeout(self.timeout);
        let response = self.http_client.execute(request).await?;

        if !response.is_success() {
            return Err(CatalogError::Http {
                status: response.status,
            });
        }

        let box_px = self.box_px;
        let body = response.body;
        core_async::task::spawn_blocking(move || scale_to_box(&body, box_px))
            .await
            .map_err(|e| CatalogError::Internal(format!("Cover decoding task failed: {}", e)))?
    }
}

fn scale_to_box(data: &Bytes, box_px: u32) -> Result<CoverImage> {
    let img = image::load_from_memory(data)
        .map_err(|e| CatalogError::Image(format!("Failed to decode cover: {}", e)))?;

    let scaled = img.resize(box_px, box_px, FilterType::Lanczos3).to_rgba8();
    Ok(CoverImage {
        width: scaled.width(),
        height: scaled.height(),
        rgba: scaled.into_raw(),
    })
}
