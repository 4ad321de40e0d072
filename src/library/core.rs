use super::{LibraryError, WatermarkAsset, WatermarkLibrary, validate_name};
use crate::MarkflowConfig;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Failures listed individually in an import summary
const LISTED_FAILURES: usize = 3;

#[derive(Debug, Default)]
pub struct ImportReport {
    pub imported: Vec<WatermarkAsset>,
    /// File name and error message for each file that could not be imported
    pub failed: Vec<(String, String)>,
}

impl ImportReport {
    pub fn summary(&self) -> String {
        let mut message = format!("Imported {} watermark(s)", self.imported.len());
        if !self.failed.is_empty() {
            message.push_str(&format!("\n{} failed:", self.failed.len()));
            for (name, error) in self.failed.iter().take(LISTED_FAILURES) {
                message.push_str(&format!("\n- {}: {}", name, error));
            }
            if self.failed.len() > LISTED_FAILURES {
                message.push_str(&format!(
                    "\n... and {} more",
                    self.failed.len() - LISTED_FAILURES
                ));
            }
        }
        message
    }
}

impl WatermarkLibrary {
    /// First free name for `file_name`: `name.ext`, then `name_1.ext`, `name_2.ext`, ...
    pub(crate) fn free_path_for(&self, file_name: &str) -> PathBuf {
        let candidate = self.directory.join(file_name);
        if !candidate.exists() {
            return candidate;
        }

        let path = Path::new(file_name);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        let mut counter = 1;
        loop {
            let candidate = self
                .directory
                .join(format!("{}_{}{}", stem, counter, extension));
            if !candidate.exists() {
                return candidate;
            }
            counter += 1;
        }
    }

    fn import_one(&self, source: &Path) -> Result<WatermarkAsset, LibraryError> {
        let file_name = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| LibraryError::InvalidName(source.display().to_string()))?;
        if !Self::is_watermark_file(&file_name) {
            return Err(LibraryError::UnsupportedFile(file_name));
        }
        if !source.is_file() {
            return Err(LibraryError::NotFound(source.display().to_string()));
        }

        let target = self.free_path_for(&file_name);
        std::fs::copy(source, &target)?;
        let name = target
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or(file_name);
        Ok(WatermarkAsset { path: target, name })
    }

    /// Copy logo files into the library. Each file succeeds or fails on its own.
    pub fn import<I, P>(&self, sources: I) -> ImportReport
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut report = ImportReport::default();
        for source in sources {
            let source = source.as_ref();
            match self.import_one(source) {
                Ok(asset) => {
                    info!("Imported watermark {:?} as {}", source, asset.name);
                    report.imported.push(asset);
                }
                Err(e) => {
                    error!("Failed to import watermark {:?}: {}", source, e);
                    let name = source
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_else(|| source.display().to_string());
                    report.failed.push((name, e.to_string()));
                }
            }
        }
        report
    }

    /// Rename a logo. A new name without an extension keeps the old extension.
    ///
    /// Configuration entries pointing at the old name follow the rename.
    pub fn rename(
        &self,
        old_name: &str,
        new_name: &str,
        config: &mut MarkflowConfig,
        config_path: &Path,
    ) -> Result<WatermarkAsset, LibraryError> {
        let current = self.get(old_name)?;

        let new_name = new_name.trim();
        if new_name.is_empty() || new_name == old_name {
            return Err(LibraryError::InvalidName(new_name.to_string()));
        }
        let new_name = if Path::new(new_name).extension().is_none() {
            match Path::new(old_name).extension() {
                Some(ext) => format!("{}.{}", new_name, ext.to_string_lossy()),
                None => new_name.to_string(),
            }
        } else {
            new_name.to_string()
        };
        validate_name(&new_name)?;

        let target = self.directory.join(&new_name);
        if target.exists() {
            return Err(LibraryError::AlreadyExists(new_name));
        }
        std::fs::rename(&current.path, &target)?;
        info!("Renamed watermark {} to {}", old_name, new_name);

        let mut updated = config.clone();
        if updated.use_logo.as_deref() == Some(old_name) {
            updated.use_logo = Some(new_name.clone());
        }
        if updated.alternate_logo.as_deref() == Some(old_name) {
            updated.alternate_logo = Some(new_name.clone());
        }
        if updated != *config {
            // The file and the saved config must agree on the name
            if let Err(e) = updated.save(config_path) {
                error!("Failed to save configuration after rename: {}", e);
                if let Err(rollback) = std::fs::rename(&target, &current.path) {
                    error!(
                        "Could not restore watermark {} after failed rename: {}",
                        old_name, rollback
                    );
                }
                return Err(e.into());
            }
            *config = updated;
        }

        Ok(WatermarkAsset {
            path: target,
            name: new_name,
        })
    }

    /// Delete a logo file. The selected logo and the alternate are protected.
    pub fn delete(&self, name: &str, config: &MarkflowConfig) -> Result<(), LibraryError> {
        let asset = self.get(name)?;
        if config.use_logo.as_deref() == Some(name) || config.alternate_logo.as_deref() == Some(name)
        {
            warn!("Refusing to delete selected watermark {}", name);
            return Err(LibraryError::SelectedWatermark(name.to_string()));
        }
        std::fs::remove_file(&asset.path)?;
        info!("Deleted watermark {}", name);
        Ok(())
    }

    /// Make `name` the logo used for watermarking and persist the choice.
    pub fn select(
        &self,
        name: &str,
        config: &mut MarkflowConfig,
        config_path: &Path,
    ) -> Result<WatermarkAsset, LibraryError> {
        let asset = self.get(name)?;
        config.use_logo = Some(asset.name.clone());
        config.save(config_path)?;
        info!("Selected watermark {}", asset.name);
        Ok(asset)
    }

    /// The configured logo, if it is still present in the library.
    pub fn selected(&self, config: &MarkflowConfig) -> Option<WatermarkAsset> {
        config
            .use_logo
            .as_deref()
            .and_then(|name| self.get(name).ok())
    }
}
