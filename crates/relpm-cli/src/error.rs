//! Errors reported by the command line front end.

use thiserror::Error;

use crate::logging::LoggingError;

/// Result type for CLI operations.
pub type CliResult<T> = std::result::Result<T, CliError>;

/// Everything that can end a `relpm` run unsuccessfully.
#[derive(Debug, Error)]
pub enum CliError {
    /// A core operation failed.
    #[error(transparent)]
    Core(#[from] relpm_core::Error),

    /// Logging could not be set up.
    #[error(transparent)]
    Logging(#[from] LoggingError),

    /// The user aborted at a prompt.
    #[error("Aborted: {0}")]
    Aborted(String),

    /// Arguments were syntactically valid but make no sense.
    #[error("Invalid arguments: {0}")]
    Usage(String),
}

impl CliError {
    /// Process exit code for this error.
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Aborted(_) => 3,
            Self::Usage(_) => 2,
            Self::Core(_) | Self::Logging(_) => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relpm_core::PlaylistError;

    #[test]
    fn test_core_error_message_is_kept() {
        let err: CliError = relpm_core::Error::from(PlaylistError::IndexOutOfRange { index: 4, len: 2 }).into();
        assert_eq!(
            err.to_string(),
            "Playlist error: Index 4 is out of range for a playlist of 2 tracks"
        );
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::Aborted(String::new()).exit_code(), 3);
        assert_eq!(CliError::Usage(String::new()).exit_code(), 2);
    }
}
