use image::{DynamicImage, codecs::png::PngEncoder};

use crate::watermark::WatermarkError;

/// Encode as PNG, keeping the alpha channel when there is one.
pub fn encode(image: &DynamicImage) -> Result<Vec<u8>, WatermarkError> {
    let mut encoded = Vec::new();
    let encoder = PngEncoder::new(&mut encoded);
    image.write_with_encoder(encoder)?;
    Ok(encoded)
}
