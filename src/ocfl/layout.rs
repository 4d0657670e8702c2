//! Storage dispersal: mapping a logical object id to a deterministic
//! path beneath the storage root (§4.1).

use serde::{Deserialize, Serialize};
use strum_macros::{Display as EnumDisplay, EnumString};

use crate::ocfl::digest::DigestAlgorithm;
use crate::ocfl::error::{OcflError, Result};

/// The dispersal scheme a `StorageRoot` uses to lay out its objects.
#[derive(
    Deserialize, Serialize, Debug, Hash, Eq, PartialEq, Copy, Clone, EnumString, EnumDisplay,
)]
pub enum StorageScheme {
    #[serde(rename = "storage_simple")]
    #[strum(serialize = "storage_simple")]
    Simple,
    #[serde(rename = "storage_pair_tree")]
    #[strum(serialize = "storage_pair_tree")]
    PairTree,
}

impl StorageScheme {
    /// Parses a scheme name read from a `1=<scheme>` declaration tag.
    pub fn parse(name: &str) -> Result<Self> {
        name.parse()
            .map_err(|_| OcflError::UnknownStorageScheme(name.to_string()))
    }

    /// Disperses a storage id (already hex-digested from the logical
    /// object id) into its relative path beneath the storage root.
    pub fn disperse(&self, storage_id: &str) -> String {
        match self {
            StorageScheme::Simple => storage_id.to_string(),
            StorageScheme::PairTree => pair_tree_path(storage_id),
        }
    }
}

/// Splits `storage_id` into two-character directory segments, with the
/// full id as the terminal segment: `abcdef1234` ->
/// `ab/cd/ef/12/34/abcdef1234`.
fn pair_tree_path(storage_id: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    let bytes = storage_id.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let end = (i + 2).min(bytes.len());
        segments.push(&storage_id[i..end]);
        i = end;
    }
    segments.push(storage_id);
    segments.join("/")
}

/// Derives the internal storage id from a logical object id:
/// `digest(storage_id_algo, obj_id_utf8_bytes)` as lowercase hex.
pub fn storage_id(algo: DigestAlgorithm, obj_id: &str) -> String {
    algo.hash_bytes(obj_id.as_bytes())
}
