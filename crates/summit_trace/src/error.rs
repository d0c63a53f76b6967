//! # Trace Error Types
//!
//! `CodecError` covers the pure encode/decode path and stays `Clone + Eq`
//! so tests can match on it. `TraceError` wraps it together with the I/O and
//! configuration failures of the layers above the codec.

use thiserror::Error;

/// Errors raised by the narrow-float NaN channel and the trajectory decoder.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Escape code does not fit in the NaN space of the target format.
    #[error("escape code {code} out of range (max {max})")]
    NanCodeOutOfRange {
        /// The rejected code.
        code: u32,
        /// Largest code the format can carry.
        max: u32,
    },

    /// `decode_nan` called on a value that is not a NaN pattern.
    #[error("value 0x{bits:04x} is not a NaN pattern")]
    NotNan {
        /// Raw bits of the offending value.
        bits: u16,
    },

    /// Stream ended in the middle of a record.
    #[error("truncated stream at byte {offset}: need {needed} bytes, {remaining} remaining")]
    Truncated {
        /// Offset of the record that could not be completed.
        offset: usize,
        /// Bytes the record requires.
        needed: usize,
        /// Bytes left in the buffer.
        remaining: usize,
    },

    /// Escape byte carries a code the decoder does not understand.
    #[error("unknown escape code {code} at byte {offset}")]
    UnknownEscape {
        /// Decoded escape code.
        code: u32,
        /// Offset of the escape byte.
        offset: usize,
    },
}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors raised by the recorder, the point store and configuration loading.
#[derive(Error, Debug)]
pub enum TraceError {
    /// Codec failure.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Filesystem failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML could not be parsed into a config.
    #[error("config parse error: {0}")]
    Config(#[from] toml::de::Error),

    /// Config parsed but holds unusable values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Point file does not start with the expected magic number.
    #[error("bad magic 0x{found:08x} in point file")]
    BadMagic {
        /// Magic number found in the file.
        found: u32,
    },

    /// Point file written by a newer format version.
    #[error("unsupported point file version {found} (max {supported})")]
    UnsupportedVersion {
        /// Version found in the file.
        found: u32,
        /// Newest version this build reads.
        supported: u32,
    },

    /// Header announces more points than the payload holds.
    #[error("point file declares {declared} points but holds {actual}")]
    PointCountMismatch {
        /// Count from the header.
        declared: u32,
        /// Points actually present.
        actual: usize,
    },
}

/// Result type for recorder, store and config operations.
pub type TraceResult<T> = Result<T, TraceError>;
