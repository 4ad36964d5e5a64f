//! Exit codes following sysexits.h conventions.
//!
//! These codes provide semantic meaning for different failure modes,
//! enabling scripts and batch jobs to handle errors appropriately.

use cardprint_core::CardprintError;

/// General error (catch-all).
pub const GENERAL_ERROR: i32 = 1;

/// Command line usage error (invalid arguments or configuration).
/// Maps to EX_USAGE from sysexits.h.
pub const USAGE_ERROR: i32 = 64;

/// Data format error (undecodable image, invalid query, incompatible corpus).
/// Maps to EX_DATAERR from sysexits.h.
pub const DATA_ERROR: i32 = 65;

/// Cannot open input file.
/// Maps to EX_NOINPUT from sysexits.h.
pub const INPUT_ERROR: i32 = 66;

/// I/O error (cannot write output file).
/// Maps to EX_IOERR from sysexits.h.
pub const IO_ERROR: i32 = 74;

/// Represents an exit code with optional error context.
pub struct ExitCode {
    pub code: i32,
    pub message: Option<String>,
}

impl ExitCode {
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");

        // Typed library errors take precedence over message inspection
        let code = match err.chain().find_map(|e| e.downcast_ref::<CardprintError>()) {
            Some(core) => Self::classify(core),
            None if message.contains("Failed to read") => INPUT_ERROR,
            None if message.contains("Failed to write") => IO_ERROR,
            None if message.contains("Invalid") => USAGE_ERROR,
            None => GENERAL_ERROR,
        };

        Self {
            code,
            message: Some(message),
        }
    }

    fn classify(err: &CardprintError) -> i32 {
        match err {
            CardprintError::InvalidConfig(_) => USAGE_ERROR,
            CardprintError::UnsupportedFormat(_)
            | CardprintError::Decode(_)
            | CardprintError::ImageTooSmall { .. }
            | CardprintError::QueryFingerprint(_)
            | CardprintError::FingerprintLength { .. }
            | CardprintError::InvalidFingerprint(_)
            | CardprintError::OrientationRender { .. }
            | CardprintError::Serialization(_)
            | CardprintError::CorpusMismatch(_) => DATA_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_core_errors_are_data_errors() {
        let err = anyhow::Error::new(CardprintError::Decode("bad".into()))
            .context("Failed to fingerprint card.png");
        assert_eq!(ExitCode::from_anyhow(&err).code, DATA_ERROR);
    }

    #[test]
    fn test_invalid_config_is_usage_error() {
        let err = anyhow::Error::new(CardprintError::InvalidConfig("threshold".into()));
        assert_eq!(ExitCode::from_anyhow(&err).code, USAGE_ERROR);
    }

    #[test]
    fn test_missing_file_is_input_error() {
        let err = std::fs::read("/nonexistent/card.png")
            .context("Failed to read image: /nonexistent/card.png")
            .unwrap_err();
        assert_eq!(ExitCode::from_anyhow(&err).code, INPUT_ERROR);
    }

    #[test]
    fn test_unknown_error_is_general() {
        let err = anyhow::anyhow!("something odd");
        let exit = ExitCode::from_anyhow(&err);
        assert_eq!(exit.code, GENERAL_ERROR);
        assert_eq!(exit.message.as_deref(), Some("something odd"));
    }
}
