use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Horizontal anchoring of the logo along the bottom edge of the photo.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Center,
    /// Left (or top, for vertical layouts)
    #[serde(alias = "top")]
    Left,
    /// Right (or bottom, for vertical layouts)
    #[serde(alias = "bottom")]
    Right,
}

impl FromStr for Alignment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "center" | "centre" => Ok(Alignment::Center),
            "left" | "top" => Ok(Alignment::Left),
            "right" | "bottom" => Ok(Alignment::Right),
            other => Err(format!(
                "unknown alignment '{}', expected center, left or right",
                other
            )),
        }
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alignment::Center => write!(f, "center"),
            Alignment::Left => write!(f, "left"),
            Alignment::Right => write!(f, "right"),
        }
    }
}

/// Convert a percentage of the photo height into pixels.
pub fn margin_pixels(image_height: u32, bottom_margin_percent: f32) -> u32 {
    let percent = bottom_margin_percent.max(0.0) as f64;
    (image_height as f64 * percent / 100.0).round() as u32
}

/// Top-left corner of the logo inside the photo.
///
/// The logo sits `margin` pixels above the bottom edge. Left and right
/// alignment use the same margin as a horizontal inset. Coordinates saturate
/// at zero when the logo is larger than the space it is given.
pub fn compute_position(
    image_dimensions: (u32, u32),
    logo_dimensions: (u32, u32),
    alignment: Alignment,
    bottom_margin_percent: f32,
) -> (u32, u32) {
    let (image_width, image_height) = image_dimensions;
    let (logo_width, logo_height) = logo_dimensions;
    let margin = margin_pixels(image_height, bottom_margin_percent);

    let max_x = image_width.saturating_sub(logo_width);
    let x = match alignment {
        Alignment::Center => max_x / 2,
        Alignment::Left => margin.min(max_x),
        Alignment::Right => max_x.saturating_sub(margin),
    };
    let y = image_height
        .saturating_sub(logo_height)
        .saturating_sub(margin);

    (x, y)
}

/// Size the logo so its width is `size_percent` of the photo width.
///
/// Aspect ratio is preserved and the result never exceeds the photo in
/// either dimension. Both sides are at least one pixel.
pub fn target_logo_dimensions(
    image_dimensions: (u32, u32),
    logo_dimensions: (u32, u32),
    size_percent: f32,
) -> (u32, u32) {
    let (image_width, image_height) = image_dimensions;
    let (logo_width, logo_height) = logo_dimensions;
    if logo_width == 0 || logo_height == 0 || image_width == 0 || image_height == 0 {
        return (1, 1);
    }

    let aspect = logo_height as f64 / logo_width as f64;
    let mut width = image_width as f64 * size_percent.clamp(0.0, 100.0) as f64 / 100.0;
    let mut height = width * aspect;

    if height > image_height as f64 {
        height = image_height as f64;
        width = height / aspect;
    }

    let width = (width.round() as u32).clamp(1, image_width);
    let height = (height.round() as u32).clamp(1, image_height);
    (width, height)
}
