//! Error handling.
//!
//! A single enum covers every failure kind the engine can produce: storage,
//! allocation, caller misuse, domain overflow, and configuration errors.
//! Every fallible public operation returns [`Result<T, SimError>`](SimError).

use thiserror::Error;

/// The result type used throughout this crate.
pub type Result<T> = std::result::Result<T, SimError>;

#[derive(Error, Debug, PartialEq)]
pub enum SimError {
    /// An I/O failure while reading or writing an archive or legacy file.
    #[error("I/O error: {0}")]
    Io(String),
    /// The bytes read back did not look like a recognized container at all.
    #[error("bad file format: {0}")]
    FileFormat(String),
    /// The container's format version did not match what this crate writes.
    #[error("file version mismatch: found {found:?}, expected {expected:?}")]
    FileVersion { found: (u32, u32), expected: (u32, u32) },
    /// A major version bump that this build of the crate cannot read at all.
    #[error("unsupported file version: {0}.{1}")]
    UnsupportedFileVersion(u32, u32),
    /// Allocation failed without having hit the configured cap (true OOM).
    #[error("out of memory")]
    NoMemory,
    /// The configured `max_memory` budget was exceeded.
    #[error("max_memory budget of {limit} bytes exceeded")]
    MaxMemoryExceeded { limit: usize },
    /// A file or archive was opened with an invalid mode for the requested operation.
    #[error("bad mode: {0}")]
    BadMode(String),
    /// A caller-supplied parameter was out of its valid domain.
    #[error("bad parameter: {0}")]
    BadParameter(String),
    /// An index was outside the bounds of the structure it indexes.
    #[error("index {index} out of bounds (len {len})")]
    OutOfBounds { index: usize, len: usize },
    /// Data that was required to be sorted was not.
    #[error("bad ordering: {0}")]
    BadOrdering(String),
    /// A population model was malformed (e.g. non-positive size, negative rate).
    #[error("bad population model: {0}")]
    BadPopModel(String),
    /// A mutation referenced an out-of-range node or position.
    #[error("bad mutation: {0}")]
    BadMutation(String),
    /// The number of recombination links in a genome overflowed the link-count type.
    #[error("links overflow: {0}")]
    LinksOverflow(String),
    /// The live-ancestor population exceeded the representable range.
    #[error("population overflow: {0}")]
    PopulationOverflow(String),
    /// A Newick string exceeded the configured size cap.
    #[error("newick output overflow")]
    NewickOverflow,
    /// More segregating sites were generated than the caller's configured cap.
    #[error("too many segregating sites: {found} > {limit}")]
    TooManySegregatingSites { found: usize, limit: usize },
    /// `population_models` was not supplied in ascending `start_time` order.
    #[error("population models must be sorted by start_time")]
    UnsortedPopModels,
    /// A feature was requested without enabling the flag it depends on.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
}

impl From<std::io::Error> for SimError {
    fn from(e: std::io::Error) -> Self {
        SimError::Io(e.to_string())
    }
}
