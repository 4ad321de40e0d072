use crate::{DataPaths, MarkflowConfig};
use std::path::Path;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum StartupCheckError {
    #[error("Failed to create directory {0}: {1}")]
    DirectoryCreationFailed(String, std::io::Error),

    #[error("Selected watermark is missing from the library: {0}")]
    SelectedLogoMissing(String),

    #[error("Alternate watermark is missing from the library: {0}")]
    AlternateLogoMissing(String),

    #[error("No watermark selected")]
    NoLogoSelected,
}

impl StartupCheckError {
    /// Errors that make a batch impossible to run.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            StartupCheckError::DirectoryCreationFailed(..)
                | StartupCheckError::SelectedLogoMissing(_)
                | StartupCheckError::NoLogoSelected
        )
    }
}

fn ensure_directory(path: &Path, errors: &mut Vec<StartupCheckError>) {
    if path.exists() {
        info!("Directory exists: {:?}", path);
        return;
    }
    info!("Directory does not exist, creating: {:?}", path);
    if let Err(e) = std::fs::create_dir_all(path) {
        error!("Failed to create directory {:?}: {}", path, e);
        errors.push(StartupCheckError::DirectoryCreationFailed(
            path.display().to_string(),
            e,
        ));
    }
}

/// Prepare the data directories and check the configured logos before a batch.
pub fn perform_startup_checks(
    paths: &DataPaths,
    config: &MarkflowConfig,
) -> Result<(), Vec<StartupCheckError>> {
    let mut errors = Vec::new();

    info!("Performing startup checks...");

    ensure_directory(&paths.data_directory, &mut errors);
    ensure_directory(&paths.watermark_directory, &mut errors);
    ensure_directory(&config.output_directory, &mut errors);

    match config.use_logo.as_deref() {
        Some(logo) if !paths.watermark_directory.join(logo).is_file() => {
            error!("Selected watermark not found: {}", logo);
            errors.push(StartupCheckError::SelectedLogoMissing(logo.to_string()));
        }
        Some(logo) => info!("Selected watermark: {}", logo),
        None => {
            warn!("No watermark selected");
            errors.push(StartupCheckError::NoLogoSelected);
        }
    }

    if let Some(alternate) = config.alternate_logo.as_deref()
        && !paths.watermark_directory.join(alternate).is_file()
    {
        warn!("Alternate watermark not found: {}", alternate);
        errors.push(StartupCheckError::AlternateLogoMissing(
            alternate.to_string(),
        ));
    }

    if errors.is_empty() {
        info!("All startup checks passed");
        Ok(())
    } else {
        error!("Startup checks failed with {} errors", errors.len());
        Err(errors)
    }
}
