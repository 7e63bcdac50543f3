//! Persistence error types.

use strata_voxel::PoolError;

/// Errors that can occur while encoding, decoding or restoring a world.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// The buffer ended before a field could be read.
    #[error("data truncated at offset {offset}: needed {needed} more bytes")]
    Truncated {
        /// Read position when the field started.
        offset: usize,
        /// Bytes required by the field.
        needed: usize,
    },
    /// The leading version byte has no registered reader.
    #[error("unsupported format version: {0}")]
    UnsupportedVersion(u8),
    /// The save was written with a different chunk edge length.
    #[error("chunk edge mismatch: save uses {found}, running configuration uses {expected}")]
    ChunkEdgeMismatch {
        /// Edge length recorded in (or implied by) the save.
        found: u8,
        /// Edge length of the running configuration.
        expected: u8,
    },
    /// A string length prefix is malformed.
    #[error("invalid string length prefix at offset {offset}")]
    InvalidStringLength {
        /// Offset of the prefix.
        offset: usize,
    },
    /// A string is not valid UTF-8.
    #[error("invalid UTF-8 string at offset {offset}")]
    InvalidUtf8 {
        /// Offset of the string bytes.
        offset: usize,
    },
    /// A count field is negative.
    #[error("negative count {count} at offset {offset}")]
    NegativeCount {
        /// Offset of the count field.
        offset: usize,
        /// Value read.
        count: i32,
    },
    /// A voxel run does not fit inside the chunk.
    #[error("run {start}+{repetitions} out of range in chunk record {chunk}")]
    RunOutOfRange {
        /// Index of the chunk record.
        chunk: usize,
        /// First voxel of the run.
        start: i16,
        /// Run length.
        repetitions: i16,
    },
    /// A table or stream has more entries than its count field can express.
    #[error("too many {what} to encode: {count}")]
    CountOverflow {
        /// Which stream overflowed.
        what: &'static str,
        /// Entry count.
        count: usize,
    },
    /// Bytes remain after the last scene object.
    #[error("{remaining} trailing bytes after offset {offset}")]
    TrailingBytes {
        /// Offset where the save should have ended.
        offset: usize,
        /// Unread bytes.
        remaining: usize,
    },
    /// A write target could not be obtained from the pool.
    #[error(transparent)]
    Pool(#[from] PoolError),
}
