use super::brightness::{BrightnessRule, Region, mean_luma};
use super::placement::{Alignment, compute_position, target_logo_dimensions};
use image::{DynamicImage, RgbaImage, imageops::FilterType};
use tracing::{debug, trace};

/// Placement and contrast settings for one batch.
#[derive(Debug, Clone)]
pub struct WatermarkSettings {
    /// Logo width as a percentage of the photo width
    pub logo_size: f32,
    pub alignment: Alignment,
    /// Percentage of the photo height
    pub bottom_margin: f32,
    pub auto_invert: bool,
    pub brightness: BrightnessRule,
}

impl Default for WatermarkSettings {
    fn default() -> Self {
        Self {
            logo_size: 20.0,
            alignment: Alignment::Center,
            bottom_margin: 5.0,
            auto_invert: false,
            brightness: BrightnessRule::default(),
        }
    }
}

/// The decoded logo assets together with the settings that place them.
#[derive(Debug, Clone)]
pub struct WatermarkSpec {
    pub logo: RgbaImage,
    /// Pre-supplied variant for backgrounds that clash with the primary logo
    pub alternate: Option<RgbaImage>,
    pub settings: WatermarkSettings,
}

impl WatermarkSpec {
    pub fn new(logo: DynamicImage, settings: WatermarkSettings) -> Self {
        Self {
            logo: logo.to_rgba8(),
            alternate: None,
            settings,
        }
    }

    pub fn with_alternate(mut self, alternate: DynamicImage) -> Self {
        self.alternate = Some(alternate.to_rgba8());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoVariant {
    Primary,
    Alternate,
    Inverted,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatermarkOutcome {
    pub position: (u32, u32),
    pub logo_dimensions: (u32, u32),
    /// Mean luma under the logo; only sampled when auto-invert is on
    pub background_luma: Option<f32>,
    pub variant: LogoVariant,
}

/// Invert the colour channels of a logo, keeping its alpha.
pub fn invert_colors(logo: &RgbaImage) -> RgbaImage {
    let mut inverted = logo.clone();
    for pixel in inverted.pixels_mut() {
        pixel[0] = 255 - pixel[0];
        pixel[1] = 255 - pixel[1];
        pixel[2] = 255 - pixel[2];
    }
    inverted
}

/// Composite the logo onto the photo.
///
/// The returned image keeps an alpha channel only when the source had one.
pub fn apply_watermark(
    photo: &DynamicImage,
    spec: &WatermarkSpec,
) -> (DynamicImage, WatermarkOutcome) {
    let settings = &spec.settings;
    let mut canvas = photo.to_rgba8();
    let image_dimensions = canvas.dimensions();

    let logo_dimensions = target_logo_dimensions(
        image_dimensions,
        spec.logo.dimensions(),
        settings.logo_size,
    );
    let position = compute_position(
        image_dimensions,
        logo_dimensions,
        settings.alignment,
        settings.bottom_margin,
    );
    trace!(
        "Logo {:?} placed at {:?} on {:?}",
        logo_dimensions, position, image_dimensions
    );

    let (background_luma, variant) = if settings.auto_invert {
        let region = Region::new(position.0, position.1, logo_dimensions.0, logo_dimensions.1);
        let luma = mean_luma(&canvas, region);
        let swap = luma
            .map(|l| settings.brightness.needs_contrast_swap(l))
            .unwrap_or(false);
        let variant = match (swap, spec.alternate.is_some()) {
            (false, _) => LogoVariant::Primary,
            (true, true) => LogoVariant::Alternate,
            (true, false) => LogoVariant::Inverted,
        };
        debug!("Background luma {:?}, using {:?} logo", luma, variant);
        (luma, variant)
    } else {
        (None, LogoVariant::Primary)
    };

    let source = match (variant, &spec.alternate) {
        (LogoVariant::Alternate, Some(alternate)) => alternate.clone(),
        (LogoVariant::Inverted, _) => invert_colors(&spec.logo),
        _ => spec.logo.clone(),
    };

    // The alternate may have a different shape; size and place it on its own
    let (logo_dimensions, position) = if variant == LogoVariant::Alternate {
        let dimensions =
            target_logo_dimensions(image_dimensions, source.dimensions(), settings.logo_size);
        let position = compute_position(
            image_dimensions,
            dimensions,
            settings.alignment,
            settings.bottom_margin,
        );
        (dimensions, position)
    } else {
        (logo_dimensions, position)
    };

    let resized = if source.dimensions() == logo_dimensions {
        source
    } else {
        image::imageops::resize(
            &source,
            logo_dimensions.0,
            logo_dimensions.1,
            FilterType::Lanczos3,
        )
    };

    image::imageops::overlay(&mut canvas, &resized, position.0 as i64, position.1 as i64);

    let output = if photo.color().has_alpha() {
        DynamicImage::ImageRgba8(canvas)
    } else {
        DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas).to_rgb8())
    };

    (
        output,
        WatermarkOutcome {
            position,
            logo_dimensions,
            background_luma,
            variant,
        },
    )
}
