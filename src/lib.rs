use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod batch;
pub mod config;
pub mod library;
pub mod startup_checks;
pub mod tray;
pub mod watermark;

pub use watermark::{Alignment, LogoTone};

/// Persisted user configuration, stored as JSON in the data directory.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct MarkflowConfig {
    /// File name of the selected logo inside the watermark library
    #[serde(rename = "Use_logo", alias = "use_logo", default)]
    pub use_logo: Option<String>,
    /// Logo width as a percentage of the photo width
    #[serde(default = "default_logo_size")]
    pub logo_size: f32,
    #[serde(default)]
    pub alignment: Alignment,
    /// Distance from the bottom edge as a percentage of the photo height
    #[serde(default = "default_bottom_margin")]
    pub bottom_margin: f32,
    #[serde(default)]
    pub auto_invert: bool,
    /// Logo used instead of the primary one when the background calls for it
    #[serde(default)]
    pub alternate_logo: Option<String>,
    #[serde(default)]
    pub logo_tone: LogoTone,
    #[serde(default = "default_brightness_threshold")]
    pub brightness_threshold: u8,
    #[serde(default = "default_output_directory")]
    pub output_directory: PathBuf,
    #[serde(default)]
    pub theme: Theme,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    /// Keys written by other tools are carried through untouched
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    Auto,
}

fn default_logo_size() -> f32 {
    20.0
}

fn default_bottom_margin() -> f32 {
    5.0
}

fn default_brightness_threshold() -> u8 {
    128
}

fn default_output_directory() -> PathBuf {
    PathBuf::from("output")
}

fn default_jpeg_quality() -> u8 {
    95
}

impl Default for MarkflowConfig {
    fn default() -> Self {
        Self {
            use_logo: None,
            logo_size: default_logo_size(),
            alignment: Alignment::default(),
            bottom_margin: default_bottom_margin(),
            auto_invert: false,
            alternate_logo: None,
            logo_tone: LogoTone::default(),
            brightness_threshold: default_brightness_threshold(),
            output_directory: default_output_directory(),
            theme: Theme::default(),
            jpeg_quality: default_jpeg_quality(),
            extra: serde_json::Map::new(),
        }
    }
}

/// Paths derived from the data directory.
#[derive(Debug, Clone)]
pub struct DataPaths {
    pub data_directory: PathBuf,
    pub config_file: PathBuf,
    pub watermark_directory: PathBuf,
}

impl DataPaths {
    pub fn new(data_directory: impl Into<PathBuf>, config_file: Option<PathBuf>) -> Self {
        let data_directory = data_directory.into();
        let config_file = config_file.unwrap_or_else(|| data_directory.join("config.json"));
        let watermark_directory = data_directory.join("watermarks");
        Self {
            data_directory,
            config_file,
            watermark_directory,
        }
    }
}

/// Extensions accepted as photos in the image tray.
pub(crate) fn is_image(file_name: &str) -> bool {
    let lower = file_name.to_lowercase();
    lower.ends_with(".jpg")
        || lower.ends_with(".jpeg")
        || lower.ends_with(".png")
        || lower.ends_with(".gif")
        || lower.ends_with(".webp")
        || lower.ends_with(".bmp")
        || lower.ends_with(".tif")
        || lower.ends_with(".tiff")
}
