use image::DynamicImage;
use std::path::Path;
use tracing::{debug, trace};

const ORIENTATION_TAG: u16 = 0x0112;
/// Marker, length and "Exif\0\0" precede the TIFF header in an APP1 segment
const TIFF_OFFSET_IN_SEGMENT: usize = 10;

/// EXIF orientation (1-8) of an encoded image, if it declares one.
pub fn read_orientation(buffer: &[u8]) -> Option<u16> {
    let exif = match rexif::parse_buffer(buffer) {
        Ok(exif) => exif,
        Err(e) => {
            trace!("No EXIF data: {}", e);
            return None;
        }
    };

    exif.entries
        .iter()
        .find(|entry| entry.tag == rexif::ExifTag::Orientation)
        .and_then(|entry| match &entry.value {
            rexif::TagValue::U16(values) => values.first().copied(),
            _ => None,
        })
}

/// Rotate/flip pixels so the image displays upright without an orientation tag.
pub fn apply_orientation(image: DynamicImage, orientation: u16) -> DynamicImage {
    match orientation {
        2 => image.fliph(),
        3 => image.rotate180(),
        4 => image.flipv(),
        5 => image.rotate90().fliph(),
        6 => image.rotate90(),
        7 => image.rotate270().fliph(),
        8 => image.rotate270(),
        _ => image,
    }
}

/// Rewrite the orientation entry of IFD0 inside an APP1 segment to 1 (upright).
///
/// Returns whether an entry was changed. Malformed segments are left alone.
pub fn reset_orientation_tag(segment: &mut [u8]) -> bool {
    if segment.len() < TIFF_OFFSET_IN_SEGMENT + 8 {
        return false;
    }
    let tiff = &mut segment[TIFF_OFFSET_IN_SEGMENT..];
    let Some((value_at, little_endian)) = find_orientation_value(tiff) else {
        return false;
    };

    let upright = if little_endian {
        1u16.to_le_bytes()
    } else {
        1u16.to_be_bytes()
    };
    tiff[value_at..value_at + 2].copy_from_slice(&upright);
    debug!("Reset EXIF orientation to upright");
    true
}

/// Offset of the orientation value within a TIFF block, and its byte order.
fn find_orientation_value(tiff: &[u8]) -> Option<(usize, bool)> {
    let little_endian = match tiff.get(0..2)? {
        b"II" => true,
        b"MM" => false,
        _ => return None,
    };

    let read_u16 = |at: usize| -> Option<u16> {
        let raw = [*tiff.get(at)?, *tiff.get(at + 1)?];
        Some(if little_endian {
            u16::from_le_bytes(raw)
        } else {
            u16::from_be_bytes(raw)
        })
    };
    let read_u32 = |at: usize| -> Option<u32> {
        let raw = [
            *tiff.get(at)?,
            *tiff.get(at + 1)?,
            *tiff.get(at + 2)?,
            *tiff.get(at + 3)?,
        ];
        Some(if little_endian {
            u32::from_le_bytes(raw)
        } else {
            u32::from_be_bytes(raw)
        })
    };

    let ifd_offset = read_u32(4)? as usize;
    let entry_count = read_u16(ifd_offset)? as usize;

    for index in 0..entry_count {
        let entry = ifd_offset + 2 + index * 12;
        if read_u16(entry)? != ORIENTATION_TAG {
            continue;
        }
        let value_at = entry + 8;
        if value_at + 2 > tiff.len() {
            return None;
        }
        return Some((value_at, little_endian));
    }

    None
}

/// "Make Model" from the file's EXIF block, for display.
pub fn camera_description(path: &Path) -> Option<String> {
    let exif = match rexif::parse_file(path) {
        Ok(exif) => exif,
        Err(e) => {
            trace!("No EXIF data for {}: {}", path.display(), e);
            return None;
        }
    };

    let mut make: Option<String> = None;
    let mut model: Option<String> = None;
    for entry in &exif.entries {
        match entry.tag {
            rexif::ExifTag::Make => make = Some(entry.value_more_readable.trim().to_string()),
            rexif::ExifTag::Model => model = Some(entry.value_more_readable.trim().to_string()),
            _ => {}
        }
    }

    match (make, model) {
        // Many cameras repeat the make inside the model string
        (Some(make), Some(model)) if model.starts_with(&make) => Some(model),
        (Some(make), Some(model)) => Some(format!("{} {}", make, model)),
        (Some(only), None) | (None, Some(only)) => Some(only),
        (None, None) => None,
    }
}
