use image::{DynamicImage, ImageEncoder, codecs::jpeg::JpegEncoder};
use tracing::debug;

use crate::watermark::WatermarkError;

const SOI: [u8; 2] = [0xFF, 0xD8];
const APP1: u8 = 0xE1;
const APP2: u8 = 0xE2;
const SOS: u8 = 0xDA;
const EOI: u8 = 0xD9;

/// Metadata segments carried over from a source JPEG.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JpegMetadata {
    /// Complete APP1 segment including marker and length
    pub exif_segment: Option<Vec<u8>>,
    /// ICC profile reassembled from its APP2 chunks
    pub icc_profile: Option<Vec<u8>>,
}

/// Walk the marker segments before the scan data and pick out EXIF and ICC.
pub fn extract_metadata(buffer: &[u8]) -> JpegMetadata {
    let mut metadata = JpegMetadata::default();
    if !buffer.starts_with(&SOI) {
        return metadata;
    }

    let mut icc_chunks: Vec<(u8, Vec<u8>)> = Vec::new();
    let mut pos = 2;

    while pos + 4 <= buffer.len() {
        if buffer[pos] != 0xFF {
            break;
        }
        let marker = buffer[pos + 1];
        // Fill bytes
        if marker == 0xFF {
            pos += 1;
            continue;
        }
        if marker == SOS || marker == EOI {
            break;
        }
        // Standalone markers carry no length
        if (0xD0..=0xD7).contains(&marker) || marker == 0x01 {
            pos += 2;
            continue;
        }

        let segment_length = u16::from_be_bytes([buffer[pos + 2], buffer[pos + 3]]) as usize;
        let segment_end = pos + 2 + segment_length;
        if segment_length < 2 || segment_end > buffer.len() {
            break;
        }
        let payload = &buffer[pos + 4..segment_end];

        if marker == APP1 && metadata.exif_segment.is_none() && payload.starts_with(b"Exif\0\0") {
            debug!("Found EXIF segment in JPEG: {} bytes", segment_length);
            metadata.exif_segment = Some(buffer[pos..segment_end].to_vec());
        } else if marker == APP2 && payload.len() > 14 && payload.starts_with(b"ICC_PROFILE\0") {
            // Sequence number, chunk count, then profile data
            icc_chunks.push((payload[12], payload[14..].to_vec()));
        }

        pos = segment_end;
    }

    if !icc_chunks.is_empty() {
        icc_chunks.sort_by_key(|(sequence, _)| *sequence);
        let profile: Vec<u8> = icc_chunks.into_iter().flat_map(|(_, data)| data).collect();
        debug!("Found ICC profile in JPEG: {} bytes", profile.len());
        metadata.icc_profile = Some(profile);
    }

    metadata
}

/// Insert a complete APP1 segment directly after the SOI marker.
pub fn splice_exif_segment(encoded: &[u8], exif_segment: &[u8]) -> Vec<u8> {
    if !encoded.starts_with(&SOI) {
        return encoded.to_vec();
    }
    let mut output = Vec::with_capacity(encoded.len() + exif_segment.len());
    output.extend_from_slice(&SOI);
    output.extend_from_slice(exif_segment);
    output.extend_from_slice(&encoded[2..]);
    output
}

/// Encode as JPEG, keeping the source's ICC profile and EXIF block.
pub fn encode_with_metadata(
    image: &DynamicImage,
    quality: u8,
    metadata: &JpegMetadata,
) -> Result<Vec<u8>, WatermarkError> {
    // JPEG doesn't support alpha channel, so convert to RGB
    let rgb_image = image.to_rgb8();
    let mut encoded = Vec::new();

    let mut encoder = JpegEncoder::new_with_quality(&mut encoded, quality);
    if let Some(profile_data) = &metadata.icc_profile
        && let Err(e) = encoder.set_icc_profile(profile_data.clone())
    {
        debug!(
            "Failed to set ICC profile on JPEG encoder ({}), writing without it",
            e
        );
    }
    encoder.write_image(
        &rgb_image,
        rgb_image.width(),
        rgb_image.height(),
        image::ExtendedColorType::Rgb8,
    )?;

    match &metadata.exif_segment {
        Some(segment) => {
            debug!("Carrying EXIF segment over: {} bytes", segment.len());
            Ok(splice_exif_segment(&encoded, segment))
        }
        None => Ok(encoded),
    }
}
