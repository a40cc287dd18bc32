//! Error types for the OOK core crate.

use thiserror::Error;

/// Errors raised by a radio driver.
///
/// The core never inspects or retries these; they are carried through
/// [`OokError::Device`] untouched.
#[derive(Error, Debug)]
pub enum DeviceError {
    /// No device could be opened
    #[error("device not found: {0}")]
    NotFound(String),

    /// Parameters outside what the device supports
    #[error("configuration error: {0}")]
    Config(String),

    /// A transfer is already in flight
    #[error("device busy")]
    Busy,

    /// Operation requires a started transfer or an open device
    #[error("device not started")]
    NotStarted,

    /// Streaming failed part way through
    #[error("transfer error: {0}")]
    Transfer(String),

    /// Backing file or OS handle failure
    #[error("device IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// OOK core error type
#[derive(Error, Debug)]
pub enum OokError {
    /// Degenerate construction parameters
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Character outside the `1`/`0`/`p` alphabet in a symbol sequence
    #[error("malformed symbol {symbol:?} at position {position}")]
    MalformedSymbol {
        /// Offending character
        symbol: char,
        /// Character index within the symbol sequence
        position: usize,
    },

    /// Failure reported by the radio driver
    #[error("radio driver error: {0}")]
    Device(#[from] DeviceError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for OOK operations
pub type Result<T> = std::result::Result<T, OokError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_symbol_message() {
        let err = OokError::MalformedSymbol { symbol: 'q', position: 1 };
        assert_eq!(err.to_string(), "malformed symbol 'q' at position 1");
    }

    #[test]
    fn test_device_error_wraps() {
        let err: OokError = DeviceError::Busy.into();
        assert!(matches!(err, OokError::Device(DeviceError::Busy)));
        assert_eq!(err.to_string(), "radio driver error: device busy");
    }
}
