// Watermark library - the directory of logo assets
mod core;
mod error;

pub use core::ImportReport;
pub use error::LibraryError;

use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One logo file in the library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatermarkAsset {
    pub path: PathBuf,
    pub name: String,
}

pub struct WatermarkLibrary {
    pub(crate) directory: PathBuf,
}

impl WatermarkLibrary {
    /// Open the library, creating its directory when missing.
    pub fn open(directory: impl Into<PathBuf>) -> Result<Self, LibraryError> {
        let directory = directory.into();
        if !directory.exists() {
            info!("Creating watermark directory: {:?}", directory);
        }
        std::fs::create_dir_all(&directory)?;
        Ok(Self { directory })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub(crate) fn is_watermark_file(file_name: &str) -> bool {
        let lower = file_name.to_lowercase();
        lower.ends_with(".png")
            || lower.ends_with(".jpg")
            || lower.ends_with(".jpeg")
            || lower.ends_with(".bmp")
            || lower.ends_with(".gif")
    }

    /// All logo files, sorted by name.
    pub fn list(&self) -> Result<Vec<WatermarkAsset>, LibraryError> {
        let mut assets = Vec::new();
        for entry in std::fs::read_dir(&self.directory)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if Self::is_watermark_file(&name) {
                assets.push(WatermarkAsset {
                    path: entry.path(),
                    name,
                });
            }
        }
        assets.sort_by(|a, b| a.name.cmp(&b.name));
        debug!("Watermark library holds {} assets", assets.len());
        Ok(assets)
    }

    pub fn get(&self, name: &str) -> Result<WatermarkAsset, LibraryError> {
        validate_name(name)?;
        let path = self.directory.join(name);
        if path.is_file() {
            Ok(WatermarkAsset {
                path,
                name: name.to_string(),
            })
        } else {
            Err(LibraryError::NotFound(name.to_string()))
        }
    }
}

/// Reject names that would escape the library directory.
pub(crate) fn validate_name(name: &str) -> Result<(), LibraryError> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
    {
        return Err(LibraryError::InvalidName(name.to_string()));
    }
    Ok(())
}
