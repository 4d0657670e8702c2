use core::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::io;

use thiserror::Error;

pub type Result<T, E = OcflError> = core::result::Result<T, E>;

/// Errors produced by the object store core.
///
/// Variants correspond 1:1 to the error taxonomy: each names *why* an
/// operation failed rather than which operation failed, so the same
/// variant surfaces from every call site that hits that condition.
#[derive(Error)]
pub enum OcflError {
    /// A directory expected to be an OCFL object lacks, or has more than
    /// one, declaration tag, or the single tag present is not an
    /// `ocfl_object` declaration.
    #[error("{0} is not a valid OCFL object")]
    InvalidOcflObject(String),

    /// Creating a storage root over a non-directory, moving an object to
    /// an id whose dispersed path is already occupied, or checking out
    /// into an existing regular file.
    #[error("{0}")]
    PathConflict(String),

    /// Operating on an object or storage root whose declared path does
    /// not exist on disk.
    #[error("Path does not exist: {0}")]
    MissingPath(String),

    /// The configured dispersal scheme is neither `storage_simple` nor
    /// `storage_pair_tree`.
    #[error("Unknown storage scheme: {0}")]
    UnknownStorageScheme(String),

    /// The requested digest algorithm is not offered by the platform
    /// hash facility.
    #[error("Unknown digest algorithm: {0}")]
    UnknownDigestAlgorithm(String),

    /// `new()` was called on a `StorageRoot` or `Object` with no path,
    /// or otherwise missing required configuration.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// A wrapped underlying filesystem failure.
    #[error("{0}")]
    Io(io::Error),

    /// A wrapped inventory (de)serialization failure.
    #[error("{0}")]
    Json(serde_json::Error),
}

impl Debug for OcflError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl From<io::Error> for OcflError {
    fn from(e: io::Error) -> Self {
        OcflError::Io(e)
    }
}

impl From<serde_json::Error> for OcflError {
    fn from(e: serde_json::Error) -> Self {
        OcflError::Json(e)
    }
}

impl From<walkdir::Error> for OcflError {
    fn from(e: walkdir::Error) -> Self {
        match e.into_io_error() {
            Some(io_err) => OcflError::Io(io_err),
            None => OcflError::Io(io::Error::new(io::ErrorKind::Other, "directory walk failed")),
        }
    }
}
