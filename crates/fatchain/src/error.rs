use fatchain_io::DeviceError;

/// Every failure the engine can report.
///
/// Errors are returned unchanged through every intermediate call, the first failure wins and
/// nothing is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FatError {
    /// The name is absent, or the end-of-entries marker was reached before it
    #[error("file not found")]
    NotFound,
    /// The chain terminates here; for a sequential file read this is end-of-file
    #[error("end of cluster chain")]
    EndOfChain,
    /// An advance was attempted from a position that is already past the end of the chain.
    /// This is a sequencing bug in the caller, not a normal end-of-file.
    #[error("reading past the end of the cluster chain")]
    ReadingPastEndOfChain,
    /// The resolved name is a directory
    #[error("entry is a directory, not a file")]
    EntryNotFile,
    /// The resolved name is a file where a directory was expected
    #[error("entry is a file, not a directory")]
    EntryNotDirectory,
    /// A chain link points at a free, bad or out of range cluster
    #[error("cluster {cluster} links to invalid cluster value {value:#x}")]
    BadCluster { cluster: u32, value: u32 },
    /// A cluster number outside the data region was used as the start of a chain
    #[error("cluster {0} is outside the data region")]
    InvalidCluster(u32),
    #[error("invalid boot sector: {0}")]
    InvalidBootSector(&'static str),
    #[error("device error: {0}")]
    Device(#[from] DeviceError),
}

pub type Result<T> = core::result::Result<T, FatError>;
