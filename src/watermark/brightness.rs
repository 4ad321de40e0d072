use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which backgrounds a logo was drawn for.
///
/// A light logo (white text, pale mark) reads on dark photos and needs a
/// swap on bright ones; a dark logo is the opposite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogoTone {
    #[default]
    Light,
    Dark,
}

impl FromStr for LogoTone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "light" => Ok(LogoTone::Light),
            "dark" => Ok(LogoTone::Dark),
            other => Err(format!("unknown logo tone '{}', expected light or dark", other)),
        }
    }
}

impl fmt::Display for LogoTone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogoTone::Light => write!(f, "light"),
            LogoTone::Dark => write!(f, "dark"),
        }
    }
}

/// Pixel rectangle used for sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// BT.601 luma of one pixel, the same weights as an 8-bit grayscale conversion.
fn luma(pixel: &image::Rgba<u8>) -> u32 {
    (pixel[0] as u32 * 299 + pixel[1] as u32 * 587 + pixel[2] as u32 * 114) / 1000
}

/// Mean luma of `region`, clipped to the image bounds.
///
/// Returns `None` when nothing of the region lies inside the image.
pub fn mean_luma(image: &RgbaImage, region: Region) -> Option<f32> {
    let x_end = region.x.saturating_add(region.width).min(image.width());
    let y_end = region.y.saturating_add(region.height).min(image.height());
    if region.x >= x_end || region.y >= y_end {
        return None;
    }

    let mut total: u64 = 0;
    let mut count: u64 = 0;
    for py in region.y..y_end {
        for px in region.x..x_end {
            total += luma(image.get_pixel(px, py)) as u64;
            count += 1;
        }
    }

    Some(total as f32 / count as f32)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrightnessRule {
    pub threshold: u8,
    pub tone: LogoTone,
}

impl Default for BrightnessRule {
    fn default() -> Self {
        Self {
            threshold: 128,
            tone: LogoTone::Light,
        }
    }
}

impl BrightnessRule {
    /// Whether the background under the logo is too close to the logo's own tone.
    pub fn needs_contrast_swap(&self, mean_luma: f32) -> bool {
        let threshold = self.threshold as f32;
        match self.tone {
            LogoTone::Light => mean_luma >= threshold,
            LogoTone::Dark => mean_luma < threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_mean_luma_of_uniform_regions() {
        let white = RgbaImage::from_pixel(50, 50, Rgba([255, 255, 255, 255]));
        assert_eq!(mean_luma(&white, Region::new(0, 0, 10, 10)), Some(255.0));

        let black = RgbaImage::from_pixel(50, 50, Rgba([0, 0, 0, 255]));
        assert_eq!(mean_luma(&black, Region::new(10, 10, 10, 10)), Some(0.0));
    }

    #[test]
    fn test_mean_luma_uses_bt601_weights() {
        let green = RgbaImage::from_pixel(4, 4, Rgba([0, 255, 0, 255]));
        // 255 * 587 / 1000 = 149.685, truncated
        assert_eq!(mean_luma(&green, Region::new(0, 0, 4, 4)), Some(149.0));
    }

    #[test]
    fn test_mean_luma_only_samples_region() {
        let mut img = RgbaImage::from_pixel(20, 20, Rgba([0, 0, 0, 255]));
        for y in 10..20 {
            for x in 0..20 {
                img.put_pixel(x, y, Rgba([255, 255, 255, 255]));
            }
        }
        assert_eq!(mean_luma(&img, Region::new(0, 10, 20, 10)), Some(255.0));
        assert_eq!(mean_luma(&img, Region::new(0, 5, 20, 10)), Some(127.5));
    }

    #[test]
    fn test_mean_luma_clips_to_image() {
        let img = RgbaImage::from_pixel(10, 10, Rgba([100, 100, 100, 255]));
        assert_eq!(mean_luma(&img, Region::new(5, 5, 100, 100)), Some(100.0));
        assert_eq!(mean_luma(&img, Region::new(10, 0, 5, 5)), None);
        assert_eq!(mean_luma(&img, Region::new(0, 0, 0, 5)), None);
    }

    #[test]
    fn test_light_logo_swaps_on_bright_background() {
        let rule = BrightnessRule::default();
        assert!(rule.needs_contrast_swap(200.0));
        assert!(rule.needs_contrast_swap(128.0));
        assert!(!rule.needs_contrast_swap(127.9));
        assert!(!rule.needs_contrast_swap(10.0));
    }

    #[test]
    fn test_dark_logo_swaps_on_dark_background() {
        let rule = BrightnessRule {
            threshold: 100,
            tone: LogoTone::Dark,
        };
        assert!(rule.needs_contrast_swap(20.0));
        assert!(!rule.needs_contrast_swap(100.0));
        assert!(!rule.needs_contrast_swap(220.0));
    }
}
