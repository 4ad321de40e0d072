// Watermark module - compositing and encoding
mod brightness;
mod compositor;
mod error;
pub mod exif;
pub mod formats;
mod placement;
mod process;

#[cfg(test)]
mod tests;

pub use brightness::{BrightnessRule, LogoTone, Region, mean_luma};
pub use compositor::{
    LogoVariant, WatermarkOutcome, WatermarkSettings, WatermarkSpec, apply_watermark,
    invert_colors,
};
pub use error::WatermarkError;
pub use placement::{Alignment, compute_position, margin_pixels, target_logo_dimensions};
pub use process::process_image;

use crate::MarkflowConfig;
use std::path::Path;
use tracing::{debug, warn};

impl From<&MarkflowConfig> for WatermarkSettings {
    fn from(config: &MarkflowConfig) -> Self {
        Self {
            logo_size: config.logo_size,
            alignment: config.alignment,
            bottom_margin: config.bottom_margin,
            auto_invert: config.auto_invert,
            brightness: BrightnessRule {
                threshold: config.brightness_threshold,
                tone: config.logo_tone,
            },
        }
    }
}

impl WatermarkSpec {
    /// Decode the configured logo (and alternate) from the watermark directory.
    ///
    /// A missing alternate is not fatal: auto-invert falls back to inverting
    /// the primary logo.
    pub fn from_config(
        config: &MarkflowConfig,
        watermark_directory: &Path,
    ) -> Result<Self, WatermarkError> {
        let logo_name = config
            .use_logo
            .as_deref()
            .ok_or(WatermarkError::NoLogoSelected)?;
        let logo_path = watermark_directory.join(logo_name);
        if !logo_path.is_file() {
            return Err(WatermarkError::LogoNotFound(logo_name.to_string()));
        }
        let logo = image::open(&logo_path)?;
        debug!(
            "Loaded logo {} ({}x{})",
            logo_name,
            logo.width(),
            logo.height()
        );

        let mut spec = WatermarkSpec::new(logo, WatermarkSettings::from(config));

        if let Some(alternate_name) = config.alternate_logo.as_deref() {
            let alternate_path = watermark_directory.join(alternate_name);
            match image::open(&alternate_path) {
                Ok(alternate) => spec = spec.with_alternate(alternate),
                Err(e) => warn!(
                    "Alternate logo {} could not be loaded, inverting instead: {}",
                    alternate_name, e
                ),
            }
        }

        Ok(spec)
    }
}
