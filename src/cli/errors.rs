use thiserror::Error;

/// Application-specific errors for the CLI
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid size parameter: {size}. Expected WIDTHxHEIGHT with positive integers")]
    InvalidSize { size: String },

    #[error("This build has no {backend} support; rebuild with --features {feature}")]
    Unsupported {
        backend: &'static str,
        feature: &'static str,
    },

    #[error(transparent)]
    Library(#[from] geoinfer::Error),
}
