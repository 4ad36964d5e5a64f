use thiserror::Error;

#[derive(Error, Debug)]
pub enum CardprintError {
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Image too small: {width}x{height}, both dimensions must be at least {min}")]
    ImageTooSmall { width: u32, height: u32, min: u32 },

    #[error("Invalid query fingerprint: {0}")]
    QueryFingerprint(String),

    #[error("Fingerprint length mismatch: expected {expected} bits, got {actual}")]
    FingerprintLength { expected: usize, actual: usize },

    #[error("Invalid fingerprint encoding: {0}")]
    InvalidFingerprint(String),

    #[error("Failed to render {orientation} orientation: {reason}")]
    OrientationRender { orientation: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Corpus mismatch: {0}")]
    CorpusMismatch(String),
}

impl From<image::ImageError> for CardprintError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::Unsupported(e) => CardprintError::UnsupportedFormat(e.to_string()),
            other => CardprintError::Decode(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, CardprintError>;
