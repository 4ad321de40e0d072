use thiserror::Error;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] crate::config::ConfigError),

    #[error("Watermark not found: {0}")]
    NotFound(String),

    #[error("A watermark named '{0}' already exists")]
    AlreadyExists(String),

    #[error("Invalid watermark name: {0}")]
    InvalidName(String),

    #[error("'{0}' is the selected watermark; select another one before deleting it")]
    SelectedWatermark(String),

    #[error("Not a supported watermark image: {0}")]
    UnsupportedFile(String),
}
