//! Image processor - validation, dimensions and thumbnail rendering

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::Path;
use stockyard_core::models::AssetMime;

use crate::traits::ImageAnalyzer;
use crate::ProcessingError;

/// `image`-crate backed analyzer. Decoding runs on the blocking thread pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageProcessor;

fn expected_format(mime: AssetMime) -> ImageFormat {
    match mime {
        AssetMime::Jpeg => ImageFormat::Jpeg,
        AssetMime::Png => ImageFormat::Png,
        AssetMime::Webp => ImageFormat::WebP,
    }
}

impl ImageProcessor {
    /// Decode and check that the sniffed format matches the declared type.
    pub fn validate_bytes(data: &[u8], declared: AssetMime) -> Result<(), ProcessingError> {
        let reader = ImageReader::new(Cursor::new(data)).with_guessed_format()?;
        let detected = reader
            .format()
            .ok_or_else(|| ProcessingError::Decode("unrecognised image format".to_string()))?;

        if detected != expected_format(declared) {
            tracing::debug!(
                detected = ?detected,
                declared = %declared,
                "Image content does not match declared type"
            );
            return Err(ProcessingError::FormatMismatch {
                detected: format!("{:?}", detected),
                declared: declared.to_string(),
            });
        }

        reader.decode().map_err(|e| {
            tracing::debug!(error = %e, format = ?detected, "Image failed to decode");
            ProcessingError::from(e)
        })?;
        Ok(())
    }

    pub fn thumbnail_bytes(data: &[u8], max_edge: u32) -> Result<Vec<u8>, ProcessingError> {
        let img = ImageReader::new(Cursor::new(data))
            .with_guessed_format()?
            .decode()?;

        // JPEG has no alpha channel
        let thumb = DynamicImage::ImageRgb8(img.thumbnail(max_edge, max_edge).to_rgb8());

        let mut buffer = Vec::new();
        thumb
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Jpeg)
            .map_err(|e| ProcessingError::Encode(e.to_string()))?;

        tracing::debug!(
            source_width = img.width(),
            source_height = img.height(),
            max_edge = max_edge,
            thumbnail_bytes = buffer.len(),
            "Thumbnail rendered"
        );
        Ok(buffer)
    }
}

#[async_trait]
impl ImageAnalyzer for ImageProcessor {
    async fn validate(&self, path: &Path, declared: AssetMime) -> Result<(), ProcessingError> {
        let data = tokio::fs::read(path).await?;
        tokio::task::spawn_blocking(move || Self::validate_bytes(&data, declared)).await?
    }

    async fn dimensions(&self, path: &Path) -> Result<(u32, u32), ProcessingError> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || -> Result<(u32, u32), ProcessingError> {
            let dims = ImageReader::open(&path)?
                .with_guessed_format()?
                .into_dimensions()?;
            Ok(dims)
        })
        .await?
    }

    async fn render_thumbnail(
        &self,
        data: &[u8],
        max_edge: u32,
    ) -> Result<Vec<u8>, ProcessingError> {
        let data = data.to_vec();
        tokio::task::spawn_blocking(move || Self::thumbnail_bytes(&data, max_edge)).await?
    }
}
