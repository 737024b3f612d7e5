use thiserror::Error;

/// Errors surfaced at the service seams (font loading and queries).
///
/// Layout itself never fails mid-pipeline: empty input, shaping
/// submission failures and zero-glyph results all degrade to an empty
/// layout instead of an error.
#[derive(Debug, Error)]
pub enum TextError {
    #[error("font I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid font data")]
    InvalidFont,
    #[error("no font matched the requested families")]
    NoFontMatch,
}

/// Convenient result alias for font-related operations.
pub type Result<T> = std::result::Result<T, TextError>;
