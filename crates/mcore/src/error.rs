//! Error taxonomy for the memory subsystem
//!
//! One unified enum for all crates in the workspace. `NotFound` is
//! deliberately absent: tag and strategy lookups that miss resolve to an
//! empty collection, never a surfaced error.

use thiserror::Error;

/// Result type alias used throughout the memory subsystem.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Serializer failed while reading a compressed or persistent cell.
    #[error("read error: {0}")]
    ReadError(String),

    /// Serializer failed while writing a value.
    #[error("write error: {0}")]
    WriteError(String),

    /// Compression or decompression failed.
    #[error("compression error: {0}")]
    CompressionError(String),

    /// The filesystem write, rename, or delete backing a persistent cell failed.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// Low-level I/O failure, wrapped into a PersistenceError at the call site
    /// unless the caller needs the raw `io::Error`.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts_via_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::IoError(_)));
    }
}
