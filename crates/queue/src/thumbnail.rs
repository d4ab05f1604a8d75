//! Preview images for queued image files.
//!
//! Decoding and encoding are CPU-bound, so they run on the blocking pool.
//! Failures are reported to the caller, which logs them and moves on; a
//! missing thumbnail never stops a file from being queued or uploaded.

use std::io::Cursor;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::ImageFormat;
use image::imageops::FilterType;

use fileflow_transfer::ByteSource;

/// Longest edge of a generated thumbnail.
pub const THUMBNAIL_MAX_EDGE: u32 = 100;

#[derive(Debug, thiserror::Error)]
pub enum ThumbnailError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("thumbnail task failed: {0}")]
    Task(String),
}

/// Whether a MIME type gets a thumbnail at all.
pub fn wants_thumbnail(mime_type: &str) -> bool {
    mime_type.starts_with("image/")
}

/// Scales `(width, height)` so the longer edge is at most
/// [`THUMBNAIL_MAX_EDGE`], keeping the aspect ratio.
///
/// Images that already fit are left alone. Fractional results are truncated,
/// but neither edge drops below 1.
pub fn scaled_dimensions(width: u32, height: u32) -> (u32, u32) {
    let max = u64::from(THUMBNAIL_MAX_EDGE);
    let (w, h) = (u64::from(width), u64::from(height));

    let (w, h) = if w > h {
        if w > max { (max, h * max / w) } else { (w, h) }
    } else if h > max {
        (w * max / h, max)
    } else {
        (w, h)
    };

    (w.max(1) as u32, h.max(1) as u32)
}

/// Decodes `bytes`, shrinks the image and returns it as a PNG `data:` URL.
pub fn render_thumbnail(bytes: &[u8]) -> Result<String, ThumbnailError> {
    let img = image::load_from_memory(bytes)?;
    let (w, h) = scaled_dimensions(img.width(), img.height());
    let thumb = img.resize_exact(w, h, FilterType::Triangle);

    let mut png = Cursor::new(Vec::new());
    thumb.write_to(&mut png, ImageFormat::Png)?;

    Ok(format!(
        "data:image/png;base64,{}",
        STANDARD.encode(png.into_inner())
    ))
}

/// Reads the source and renders its thumbnail off the async threads.
pub async fn generate_thumbnail(source: &ByteSource) -> Result<String, ThumbnailError> {
    let bytes = source.read_all().await?;
    tokio::task::spawn_blocking(move || render_thumbnail(&bytes))
        .await
        .map_err(|e| ThumbnailError::Task(e.to_string()))?
}
