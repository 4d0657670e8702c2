//! Path-joining helpers. Filesystem paths use `std::path::Path`, which
//! respects the platform separator; logical/manifest paths recorded in
//! the inventory always use `/`, per §6.3, regardless of platform.

use std::path::{Path, PathBuf};

use crate::ocfl::consts::*;
use crate::ocfl::digest::DigestAlgorithm;

/// Returns the path to `inventory.json` within the specified directory.
pub fn inventory_path(dir: impl AsRef<Path>) -> PathBuf {
    dir.as_ref().join(INVENTORY_FILE)
}

/// Returns the path to `inventory.json.<algo>` within the specified
/// directory.
pub fn sidecar_path(dir: impl AsRef<Path>, algorithm: DigestAlgorithm) -> PathBuf {
    dir.as_ref().join(sidecar_name(algorithm))
}

/// Returns the name of an inventory sidecar checksum file for the
/// specified algorithm.
pub fn sidecar_name(algorithm: DigestAlgorithm) -> String {
    format!("{}.{}", INVENTORY_FILE, algorithm)
}

/// Returns the path to the version directory (`vN`) within the object
/// root.
pub fn version_path(object_root: impl AsRef<Path>, version_num: u32) -> PathBuf {
    object_root.as_ref().join(version_dir_name(version_num))
}

/// Returns the path to a version's `content` directory.
pub fn content_path(object_root: impl AsRef<Path>, version_num: u32) -> PathBuf {
    version_path(object_root, version_num).join(CONTENT_DIR)
}

/// Returns the `vN` directory name for a version number.
pub fn version_dir_name(version_num: u32) -> String {
    format!("v{}", version_num)
}

/// Joins two logical-path segments with `/`, avoiding doubled or missing
/// separators.
pub fn join_logical(part1: &str, part2: &str) -> String {
    if part1.is_empty() {
        return part2.to_string();
    }
    if part2.is_empty() {
        return part1.to_string();
    }

    let mut joined = part1.trim_end_matches('/').to_string();
    joined.push('/');
    joined.push_str(part2.trim_start_matches('/'));
    joined
}

/// Converts a logical path's `/`-separated segments into a filesystem
/// path relative to `base`.
pub fn logical_to_fs(base: impl AsRef<Path>, logical_path: &str) -> PathBuf {
    let mut path = base.as_ref().to_path_buf();
    for segment in logical_path.split('/') {
        path.push(segment);
    }
    path
}

/// Converts a filesystem path, relative to `base`, into a `/`-separated
/// logical path. Used when walking a `content/` tree to build a
/// version's state map.
pub fn fs_to_logical(base: impl AsRef<Path>, path: impl AsRef<Path>) -> std::io::Result<String> {
    let relative = path.as_ref().strip_prefix(base.as_ref()).map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "path is not a descendant of base",
        )
    })?;

    let segments: Vec<&str> = relative
        .iter()
        .map(|segment| segment.to_str().unwrap_or_default())
        .collect();

    Ok(segments.join("/"))
}
