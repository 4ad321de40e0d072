use image::ImageReader;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

use super::compositor::{WatermarkOutcome, WatermarkSpec, apply_watermark};
use super::exif::{apply_orientation, read_orientation, reset_orientation_tag};
use super::formats::{self, jpeg};
use super::WatermarkError;

/// Watermark one photo from `source` into `destination`.
///
/// Pixels are turned upright before compositing so the logo lands on the
/// bottom edge as the photo is viewed; the preserved EXIF block is then
/// marked upright to match.
pub fn process_image(
    source: &Path,
    destination: &Path,
    spec: &WatermarkSpec,
    jpeg_quality: u8,
) -> Result<WatermarkOutcome, WatermarkError> {
    let buffer = std::fs::read(source)?;

    let reader = ImageReader::new(Cursor::new(&buffer)).with_guessed_format()?;
    let mut photo = reader.decode()?;

    let mut metadata = jpeg::extract_metadata(&buffer);
    if let Some(orientation) = read_orientation(&buffer)
        && orientation != 1
    {
        debug!(
            "Applying EXIF orientation {} to {}",
            orientation,
            source.display()
        );
        photo = apply_orientation(photo, orientation);
        if let Some(segment) = metadata.exif_segment.as_mut() {
            reset_orientation_tag(segment);
        }
    }

    let (watermarked, outcome) = apply_watermark(&photo, spec);

    formats::save_output(&watermarked, destination, jpeg_quality, &metadata)?;
    Ok(outcome)
}
