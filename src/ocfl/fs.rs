//! Platform filesystem layer (§6.4): the primitives the Object and
//! StorageRoot engines build on — recursive walk, chunked digest (via
//! `digest.rs`), mkdir, rename, delete, glob, and copy-tree. Kept thin
//! and free of OCFL semantics so the engines above stay the testable
//! layer.

use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use walkdir::WalkDir;

use crate::ocfl::error::Result;

static VERSION_DIR_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^v([0-9]+)$").unwrap());

/// Creates `path` and any missing parent directories.
pub fn create_dir_all(path: impl AsRef<Path>) -> Result<()> {
    fs::create_dir_all(path)?;
    Ok(())
}

/// Recursively lists every file (not directory) beneath `dir`, in a
/// stable, deterministic order.
pub fn list_files_recursive(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir.as_ref()).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

/// Lists the immediate children of `dir` (files and subdirectories), in
/// a stable order. Used when converting a plain directory into `v1`
/// (§4.4 `new()`), which must move every existing entry.
pub fn list_entries(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .collect::<std::io::Result<Vec<_>>>()?
        .into_iter()
        .map(|e| e.path())
        .collect();
    entries.sort();
    Ok(entries)
}

/// Lists the version directory numbers (`vN`) directly under `dir`,
/// sorted ascending. Matches §6.4's glob(`vN`) primitive.
pub fn list_version_dir_numbers(dir: impl AsRef<Path>) -> Result<Vec<u32>> {
    let mut numbers = Vec::new();

    for entry in fs::read_dir(dir.as_ref())? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }

        if let Some(name) = entry.file_name().to_str() {
            if let Some(caps) = VERSION_DIR_REGEX.captures(name) {
                if let Ok(n) = caps[1].parse::<u32>() {
                    numbers.push(n);
                }
            }
        }
    }

    numbers.sort_unstable();
    Ok(numbers)
}

/// Lists the suffixes of every top-level file in `dir` whose name
/// starts with `prefix` (e.g. `prefix = "0="` finds declaration tags
/// like `0=ocfl_object_1.0`, returning `["ocfl_object_1.0"]`). Matches
/// §6.4's Namaste-style declaration tag convention.
pub fn find_declaration_suffixes(dir: impl AsRef<Path>, prefix: &str) -> Result<Vec<String>> {
    let mut matches = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }

        if let Some(name) = entry.file_name().to_str() {
            if let Some(suffix) = name.strip_prefix(prefix) {
                matches.push(suffix.to_string());
            }
        }
    }

    matches.sort();
    Ok(matches)
}

/// Splits a declaration tag suffix of the form `name_major.minor` (e.g.
/// `ocfl_object_1.0`) into its `name` and `version` parts, at the
/// rightmost underscore.
pub fn parse_declaration_suffix(suffix: &str) -> Option<(String, String)> {
    let (name, version) = suffix.rsplit_once('_')?;
    Some((name.to_string(), version.to_string()))
}

/// Moves (renames) `src` to `dst`.
pub fn rename(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> Result<()> {
    fs::rename(src, dst)?;
    Ok(())
}

/// Deletes a single file.
pub fn remove_file(path: impl AsRef<Path>) -> Result<()> {
    fs::remove_file(path)?;
    Ok(())
}

/// Removes `dir` if, and only if, it contains no entries.
pub fn remove_dir_if_empty(dir: impl AsRef<Path>) -> Result<()> {
    if dir_is_empty(dir.as_ref())? {
        fs::remove_dir(dir.as_ref())?;
    }
    Ok(())
}

/// Returns true if `dir` contains no entries.
pub fn dir_is_empty(dir: impl AsRef<Path>) -> Result<bool> {
    Ok(fs::read_dir(dir)?.next().is_none())
}

/// Walks `start_dir` bottom-up, deleting every directory that has become
/// empty. Used after forward-delta reconciliation prunes files out of a
/// version's `content/` tree (§4.4 `reconcile_deltas`).
pub fn clean_empty_dirs(start_dir: impl AsRef<Path>) -> Result<()> {
    let start_dir = start_dir.as_ref();
    if !start_dir.exists() {
        return Ok(());
    }

    let mut dirs: Vec<PathBuf> = WalkDir::new(start_dir)
        .contents_first(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.into_path())
        .collect();

    // contents_first already yields children before parents, but sort
    // by depth descending to be explicit about the invariant this
    // function depends on.
    dirs.sort_by_key(|p| std::cmp::Reverse(p.components().count()));

    for dir in dirs {
        remove_dir_if_empty(&dir)?;
    }

    Ok(())
}

/// Recursively copies every entry under `src` into `dst`, creating
/// directories as needed. Used by `StorageRoot::add_object` to relocate
/// a converted object tree into the dispersed storage path.
pub fn copy_tree(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> Result<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    for entry in WalkDir::new(src).sort_by_file_name() {
        let entry = entry?;
        let relative = entry.path().strip_prefix(src).unwrap();
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
        }
    }

    Ok(())
}
