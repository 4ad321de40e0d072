pub mod jpeg;
pub mod png;

use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

use super::WatermarkError;
pub use jpeg::JpegMetadata;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Jpeg,
    Png,
    /// Anything else the image crate can encode, written without metadata
    Other(ImageFormat),
}

impl OutputFormat {
    /// Output keeps the format of the file it is written to.
    pub fn from_path(path: &Path) -> Result<Self, WatermarkError> {
        match ImageFormat::from_path(path) {
            Ok(ImageFormat::Jpeg) => Ok(OutputFormat::Jpeg),
            Ok(ImageFormat::Png) => Ok(OutputFormat::Png),
            Ok(format) if format.writing_enabled() => Ok(OutputFormat::Other(format)),
            _ => Err(WatermarkError::UnsupportedFormat(
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .unwrap_or("")
                    .to_string(),
            )),
        }
    }
}

/// Encode `image` for `path` and write it atomically.
///
/// JPEG output carries over the source's EXIF block and ICC profile.
pub fn save_output(
    image: &DynamicImage,
    path: &Path,
    jpeg_quality: u8,
    metadata: &JpegMetadata,
) -> Result<(), WatermarkError> {
    let encoded = match OutputFormat::from_path(path)? {
        OutputFormat::Jpeg => jpeg::encode_with_metadata(image, jpeg_quality, metadata)?,
        OutputFormat::Png => png::encode(image)?,
        OutputFormat::Other(format) => {
            let mut buffer = Cursor::new(Vec::new());
            image.write_to(&mut buffer, format)?;
            buffer.into_inner()
        }
    };

    write_atomically(path, &encoded)?;
    debug!("Wrote {} bytes to {:?}", encoded.len(), path);
    Ok(())
}

/// Write to a temporary sibling and rename it over the destination.
pub fn write_atomically(path: &Path, contents: &[u8]) -> Result<(), WatermarkError> {
    let parent = path.parent().ok_or(WatermarkError::InvalidPath)?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or(WatermarkError::InvalidPath)?;
    let temp_path = parent.join(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));

    if let Err(e) = std::fs::write(&temp_path, contents) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(e.into());
    }
    if let Err(e) = std::fs::rename(&temp_path, path) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(e.into());
    }
    Ok(())
}
