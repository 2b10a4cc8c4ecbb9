//! Error types for preset I/O.
//!
//! Only file-system and size failures escape [`crate::PresetParser::parse_file`]; the
//! other variants are produced by individual parse strategies and consumed by
//! the fallback chain.

/// Result type alias for preset I/O operations.
pub type Result<T> = std::result::Result<T, PresetError>;

/// Error type for preset reading and parsing.
#[derive(Debug, thiserror::Error)]
pub enum PresetError {
    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File exceeds the accepted preset size
    #[error("Preset file too large: {size} bytes (max {max})")]
    TooLarge {
        /// File size
        size: u64,
        /// Accepted maximum
        max: u64,
    },

    /// Input ended before a complete field could be read
    #[error("Unexpected end of data at offset {offset} (needed {needed} bytes)")]
    UnexpectedEof {
        /// Read position
        offset: usize,
        /// Bytes requested
        needed: usize,
    },

    /// The binary header does not carry a preset signature
    #[error("Bad preset signature: {0:?}")]
    BadSignature(String),

    /// The input does not decode to usable text
    #[error("Input is not text")]
    NotText,

    /// The strategy ran but recovered nothing
    #[error("No preset content recovered")]
    Empty,

    /// A scanner pattern failed to compile
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}
