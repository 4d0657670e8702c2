//! Object-level operations: convert a plain directory into an OCFL
//! object, parse one back from disk, write inventories, reconcile
//! forward-delta duplicates, checkout a version, and verify fixity
//! (§4.4).

use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Serialize;

use crate::ocfl::consts::*;
use crate::ocfl::digest::DigestAlgorithm;
use crate::ocfl::error::{OcflError, Result};
use crate::ocfl::fs;
use crate::ocfl::inventory::{
    fresh_hex_id, normalize_path_map, to_canonical_json, version_key, Inventory, PathMap,
    VersionArg, VersionEntry,
};
use crate::ocfl::paths;

/// A parsed `0=name_major.minor` declaration tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub version: String,
}

/// Construction-time knobs, mirroring the fields §3.1 attaches to an
/// `Object`: the declared conformance namespace/version, the primary
/// digest, and an optional fixity digest.
#[derive(Debug, Clone)]
pub struct ObjectConfig {
    pub conformance: String,
    pub version: String,
    pub file_digest_algo: DigestAlgorithm,
    pub fixity_algo: Option<DigestAlgorithm>,
}

impl Default for ObjectConfig {
    fn default() -> Self {
        ObjectConfig {
            conformance: DEFAULT_OBJECT_CONFORMANCE.to_string(),
            version: DEFAULT_OBJECT_VERSION.to_string(),
            file_digest_algo: DigestAlgorithm::Sha256,
            fixity_algo: None,
        }
    }
}

/// The outcome of [`Object::check_fixity`]: fixity discrepancies are
/// data, not errors (§7 "Fixity failures are data, not errors").
#[derive(Debug, Clone, PartialEq)]
pub enum FixityReport {
    /// Every expected digest/path was reproduced by a fresh scan.
    Ok,
    /// The inventory has no fixity record for the requested algorithm.
    NoDigestsForAlgorithm(DigestAlgorithm),
    /// digest -> paths that failed to reproduce.
    Failures(PathMap),
}

impl FixityReport {
    pub fn is_ok(&self) -> bool {
        matches!(self, FixityReport::Ok)
    }
}

/// A versioned OCFL object (§3.1). `path` is relative to `root` when
/// attached to a `StorageRoot`, and absolute otherwise — never both at
/// once (§9 "mixed absolute/relative paths").
pub struct Object {
    path: PathBuf,
    root: Option<PathBuf>,
    config: ObjectConfig,
    pub inventory: Option<Inventory>,
}

impl Object {
    /// Wraps an unattached, possibly-nonexistent directory. If the
    /// directory already holds a valid OCFL object, its inventory is
    /// loaded automatically.
    pub fn new(path: impl AsRef<Path>, config: ObjectConfig) -> Result<Self> {
        let mut object = Object {
            path: path.as_ref().to_path_buf(),
            root: None,
            config,
            inventory: None,
        };
        object.parse_object()?;
        Ok(object)
    }

    /// Wraps a directory relative to a storage root.
    pub fn attached(path: impl AsRef<Path>, root: impl AsRef<Path>, config: ObjectConfig) -> Result<Self> {
        let mut object = Object {
            path: path.as_ref().to_path_buf(),
            root: Some(root.as_ref().to_path_buf()),
            config,
            inventory: None,
        };
        object.parse_object()?;
        Ok(object)
    }

    /// The object's path as stored (relative if attached, absolute
    /// otherwise).
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The fully resolved path to the object directory on disk.
    pub fn full_path(&self) -> PathBuf {
        match &self.root {
            Some(root) => root.join(&self.path),
            None => self.path.clone(),
        }
    }

    pub(crate) fn set_path(&mut self, path: PathBuf) {
        self.path = path;
    }

    pub(crate) fn attach_root(&mut self, root: PathBuf) {
        self.root = Some(root);
    }

    fn invalid_object_err(&self) -> OcflError {
        OcflError::InvalidOcflObject(self.full_path().display().to_string())
    }

    /// Inspects the directory's declaration tags. Exactly one `0=` tag
    /// must be present and name the configured object conformance;
    /// anything else (zero tags, more than one, or a mismatched name)
    /// is reported as "not an object" rather than an error.
    pub fn is_ocfl_object(&self) -> Result<Option<Declaration>> {
        let full_path = self.full_path();
        if !full_path.is_dir() {
            return Ok(None);
        }

        let tags = fs::find_declaration_suffixes(&full_path, "0=")?;
        if tags.len() != 1 {
            return Ok(None);
        }

        match fs::parse_declaration_suffix(&tags[0]) {
            Some((name, version)) if name == self.config.conformance => {
                Ok(Some(Declaration { name, version }))
            }
            _ => Ok(None),
        }
    }

    /// Loads `inventory.json` if the directory exists and is a valid
    /// OCFL object; a no-op otherwise. Runs automatically from `new`.
    pub fn parse_object(&mut self) -> Result<()> {
        let full_path = self.full_path();
        if !full_path.exists() {
            return Ok(());
        }

        if self.is_ocfl_object()?.is_some() {
            let bytes = std::fs::read(paths::inventory_path(&full_path))?;
            self.inventory = Some(serde_json::from_slice(&bytes)?);
        }

        Ok(())
    }

    /// Converts the plain directory at `full_path()` into a fresh OCFL
    /// object: every existing entry becomes `v1/content/` (§4.4 `new`).
    pub fn initialize(
        &mut self,
        obj_id: Option<String>,
        dec_readme: Option<&str>,
        v1_msg: Option<String>,
    ) -> Result<()> {
        let full_path = self.full_path();

        if self.is_ocfl_object()?.is_some() {
            return Err(OcflError::PathConflict(format!(
                "{} is already an OCFL object",
                full_path.display()
            )));
        }

        fs::create_dir_all(&full_path)?;

        let tmp_dir = full_path.join(fresh_hex_id());
        let tmp_content = tmp_dir.join(CONTENT_DIR);
        fs::create_dir_all(&tmp_content)?;

        for entry in fs::list_entries(&full_path)? {
            if entry == tmp_dir {
                continue;
            }
            let name = entry
                .file_name()
                .expect("directory entry always has a file name");
            fs::rename(&entry, tmp_content.join(name))?;
        }

        let v1_dir = paths::version_path(&full_path, 1);
        fs::rename(&tmp_dir, &v1_dir)?;

        let mut inventory = Inventory::new(obj_id, self.config.file_digest_algo);
        inventory.version_entry_mut(1u32)?.message = v1_msg;
        self.inventory = Some(inventory);

        let tag_name = format!("0={}_{}", self.config.conformance, self.config.version);
        std::fs::write(full_path.join(tag_name), b"")?;
        if let Some(readme) = dec_readme {
            let readme_name = format!("{}_{}.txt", self.config.conformance, self.config.version);
            std::fs::write(full_path.join(readme_name), readme)?;
        }

        info!("initialized OCFL object at {}", full_path.display());

        self.update(true, true, false)
    }

    /// Runs the maintenance sequence described in §4.4: inventories are
    /// always written before reconciliation runs, since reconciliation
    /// reads the state maps `write_inventories` just produced.
    pub fn update(&mut self, write_inventories: bool, reconcile_deltas: bool, calc_fixity: bool) -> Result<()> {
        if write_inventories {
            self.write_inventories()?;
        }
        if reconcile_deltas {
            self.reconcile_deltas()?;
        }
        if calc_fixity {
            if let Some(algo) = self.config.fixity_algo {
                self.calc_fixity(false, Some(algo), true)?;
            }
        }
        Ok(())
    }

    /// Recomputes the object manifest and every version's state from
    /// the on-disk `vN/content/` trees, then serializes the inventory
    /// and every per-version inventory document (§4.4 `write_inventories`).
    pub fn write_inventories(&mut self) -> Result<()> {
        let full_path = self.full_path();
        let fs_versions = fs::list_version_dir_numbers(&full_path)?;

        let inventory = self.inventory.as_mut().ok_or_else(|| {
            OcflError::InvalidOcflObject(full_path.display().to_string())
        })?;

        let mut manifest = PathMap::new();
        for &v in &fs_versions {
            let content_dir = paths::content_path(&full_path, v);
            if !content_dir.exists() {
                continue;
            }
            for file in fs::list_files_recursive(&content_dir)? {
                let digest = inventory.digest_algorithm.hash_file(&file)?;
                let logical = paths::fs_to_logical(&full_path, &file)?;
                manifest.entry(digest).or_insert_with(Vec::new).push(logical);
            }
        }
        inventory.manifest = normalize_path_map(manifest);

        for &v in &fs_versions {
            let content_dir = paths::content_path(&full_path, v);
            let mut state = PathMap::new();
            if content_dir.exists() {
                for file in fs::list_files_recursive(&content_dir)? {
                    let digest = inventory.digest_algorithm.hash_file(&file)?;
                    let logical = paths::fs_to_logical(&content_dir, &file)?;
                    state.entry(digest).or_insert_with(Vec::new).push(logical);
                }
            }
            inventory.update_version_state(&version_key(v), normalize_path_map(state));
        }

        if let Some(&max_v) = fs_versions.last() {
            inventory.head = version_key(max_v);
        }

        debug!(
            "wrote inventory for {} across {} version(s)",
            full_path.display(),
            fs_versions.len()
        );

        self.write_inventory_document(&full_path)?;

        for &v in &fs_versions {
            let version_dir = paths::version_path(&full_path, v);
            let entry = self
                .inventory
                .as_ref()
                .expect("checked above")
                .version_entry(v)?
                .clone();
            self.write_version_document(&version_dir, &entry)?;
        }

        Ok(())
    }

    fn write_inventory_document(&self, dir: &Path) -> Result<()> {
        let inventory = self
            .inventory
            .as_ref()
            .ok_or_else(|| self.invalid_object_err())?;
        self.write_document(dir, inventory)
    }

    fn write_version_document(&self, dir: &Path, entry: &VersionEntry) -> Result<()> {
        self.write_document(dir, entry)
    }

    fn write_document<T: Serialize>(&self, dir: &Path, value: &T) -> Result<()> {
        fs::create_dir_all(dir)?;
        let json = to_canonical_json(value)?;
        std::fs::write(paths::inventory_path(dir), &json)?;

        let digest = self.config.file_digest_algo.hash_bytes(&json);
        let sidecar = format!("{}  {}\n", digest, INVENTORY_FILE);
        std::fs::write(paths::sidecar_path(dir, self.config.file_digest_algo), sidecar)?;

        Ok(())
    }

    /// Deletes physical content in later versions that's already
    /// present in an ancestor, preserving logical reconstructability via
    /// the manifest (§4.4 `reconcile_deltas`). Pruned physical paths are
    /// also removed from `inventory.manifest` and the inventory document
    /// is re-serialized, so the on-disk record never references a file
    /// this pass just deleted.
    pub fn reconcile_deltas(&mut self) -> Result<()> {
        let full_path = self.full_path();

        let versions = self
            .inventory
            .as_ref()
            .ok_or_else(|| self.invalid_object_err())?
            .version_numbers();

        if versions.len() <= 1 {
            return Ok(());
        }

        for &v in versions.iter().skip(1) {
            let state = self
                .inventory
                .as_ref()
                .expect("checked above")
                .version_entry(v)?
                .state
                .clone();

            for (digest, logical_paths) in &state {
                let found_ancestor = {
                    let inventory = self.inventory.as_ref().expect("checked above");
                    versions
                        .iter()
                        .filter(|&&a| a < v)
                        .rev()
                        .any(|&ancestor| {
                            inventory
                                .version_entry(ancestor)
                                .map(|entry| entry.state.contains_key(digest))
                                .unwrap_or(false)
                        })
                };

                if !found_ancestor {
                    continue;
                }

                let content_dir = paths::content_path(&full_path, v);
                let version_prefix = format!("{}/{}", paths::version_dir_name(v), CONTENT_DIR);
                let mut removed_physical = Vec::with_capacity(logical_paths.len());

                for logical_path in logical_paths {
                    let file = paths::logical_to_fs(&content_dir, logical_path);
                    if file.exists() {
                        fs::remove_file(&file)?;
                    }
                    removed_physical.push(paths::join_logical(&version_prefix, logical_path));
                }

                let inventory = self.inventory.as_mut().expect("checked above");
                if let Some(physical_paths) = inventory.manifest.get_mut(digest) {
                    physical_paths.retain(|p| !removed_physical.contains(p));
                }
            }

            fs::clean_empty_dirs(paths::content_path(&full_path, v))?;
        }

        self.write_inventory_document(&full_path)?;

        Ok(())
    }

    /// Reconstructs a version's complete logical state under
    /// `output_path`, resolving every logical path through the manifest
    /// to its surviving physical copy (§4.4 `checkout`).
    pub fn checkout<V: Into<VersionArg>>(
        &self,
        output_path: impl AsRef<Path>,
        overwrite: bool,
        version: Option<V>,
    ) -> Result<()> {
        let output_path = output_path.as_ref();
        let full_path = self.full_path();
        let inventory = self
            .inventory
            .as_ref()
            .ok_or_else(|| self.invalid_object_err())?;

        let version_num = match version {
            Some(v) => inventory.resolve_version_number(v)?,
            None => inventory.head_num()?,
        };

        if output_path.is_file() {
            return Err(OcflError::PathConflict(format!(
                "checkout target {} is an existing file",
                output_path.display()
            )));
        }
        if output_path.is_dir() && !overwrite {
            return Err(OcflError::PathConflict(format!(
                "checkout target {} already exists",
                output_path.display()
            )));
        }
        fs::create_dir_all(output_path)?;

        let entry = inventory.version_entry(version_num)?;
        for (digest, logical_paths) in &entry.state {
            let physical_paths = inventory.manifest.get(digest).ok_or_else(|| {
                OcflError::MissingPath(format!(
                    "digest {} referenced by v{} state is missing from the manifest",
                    digest, version_num
                ))
            })?;
            let canonical = physical_paths.first().ok_or_else(|| {
                OcflError::MissingPath(format!("digest {} has no recorded physical path", digest))
            })?;
            let source = paths::logical_to_fs(&full_path, canonical);

            for logical_path in logical_paths {
                let dest = paths::logical_to_fs(output_path, logical_path);
                if let Some(parent) = dest.parent() {
                    fs::create_dir_all(parent)?;
                }
                std::fs::copy(&source, &dest)?;
            }
        }

        Ok(())
    }

    /// Compares recorded fixity against a fresh scan, per §4.4
    /// `check_fixity`. Discrepancies are returned as data, not errors.
    pub fn check_fixity(
        &self,
        fixity_algo: Option<DigestAlgorithm>,
        use_manifest_digest: bool,
    ) -> Result<FixityReport> {
        let inventory = self
            .inventory
            .as_ref()
            .ok_or_else(|| self.invalid_object_err())?;

        let algo = self.resolve_fixity_algo(use_manifest_digest, fixity_algo)?;

        let expected = match inventory
            .fixity
            .as_ref()
            .and_then(|f| f.get(&algo.to_string()))
        {
            Some(expected) => expected,
            None => return Ok(FixityReport::NoDigestsForAlgorithm(algo)),
        };

        let observed = self.compute_fixity(use_manifest_digest, algo)?;

        let mut failures = PathMap::new();
        for (digest, expected_paths) in expected {
            match observed.get(digest) {
                None => {
                    failures.insert(digest.clone(), expected_paths.clone());
                }
                Some(observed_paths) => {
                    let missing: Vec<String> = expected_paths
                        .iter()
                        .filter(|p| !observed_paths.contains(p))
                        .cloned()
                        .collect();
                    if !missing.is_empty() {
                        failures.insert(digest.clone(), missing);
                    }
                }
            }
        }

        if failures.is_empty() {
            Ok(FixityReport::Ok)
        } else {
            Ok(FixityReport::Failures(failures))
        }
    }

    /// Computes a fixity digest map, optionally writing it back into
    /// the inventory (§4.4 `calc_fixity`). When `use_manifest_digest` is
    /// set, the manifest is aliased verbatim under the fixity algorithm
    /// name rather than rehashed.
    pub fn calc_fixity(
        &mut self,
        use_manifest_digest: bool,
        fixity_algo: Option<DigestAlgorithm>,
        update_fixity: bool,
    ) -> Result<PathMap> {
        let algo = self.resolve_fixity_algo(use_manifest_digest, fixity_algo)?;
        let digests = self.compute_fixity(use_manifest_digest, algo)?;

        if update_fixity {
            let full_path = self.full_path();
            {
                let inventory = self
                    .inventory
                    .as_mut()
                    .ok_or_else(|| OcflError::InvalidOcflObject(full_path.display().to_string()))?;
                inventory.update_fixity(algo, digests.clone());
            }
            self.write_inventory_document(&full_path)?;
        }

        Ok(digests)
    }

    fn resolve_fixity_algo(
        &self,
        use_manifest_digest: bool,
        fixity_algo: Option<DigestAlgorithm>,
    ) -> Result<DigestAlgorithm> {
        if use_manifest_digest {
            let inventory = self
                .inventory
                .as_ref()
                .ok_or_else(|| self.invalid_object_err())?;
            return Ok(inventory.digest_algorithm);
        }

        fixity_algo
            .or(self.config.fixity_algo)
            .ok_or_else(|| OcflError::Configuration("no fixity algorithm configured".to_string()))
    }

    fn compute_fixity(&self, use_manifest_digest: bool, algo: DigestAlgorithm) -> Result<PathMap> {
        let inventory = self
            .inventory
            .as_ref()
            .ok_or_else(|| self.invalid_object_err())?;

        if use_manifest_digest {
            return Ok(inventory.manifest.clone());
        }

        let full_path = self.full_path();
        let mut digests = PathMap::new();
        for v in inventory.version_numbers() {
            let content_dir = paths::content_path(&full_path, v);
            if !content_dir.exists() {
                continue;
            }
            for file in fs::list_files_recursive(&content_dir)? {
                let digest = algo.hash_file(&file)?;
                let logical = paths::fs_to_logical(&full_path, &file)?;
                digests.entry(digest).or_insert_with(Vec::new).push(logical);
            }
        }

        Ok(normalize_path_map(digests))
    }
}
