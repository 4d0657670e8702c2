//! Root-level operations: declaration, id→path dispersal, and
//! add/get/move/enumerate/verify across the objects beneath a storage
//! root (§4.2).

use std::path::{Path, PathBuf};

use log::info;
use walkdir::WalkDir;

use crate::ocfl::consts::*;
use crate::ocfl::digest::DigestAlgorithm;
use crate::ocfl::error::{OcflError, Result};
use crate::ocfl::fs;
use crate::ocfl::inventory::PathMap;
use crate::ocfl::layout::{storage_id, StorageScheme};
use crate::ocfl::object::{FixityReport, Object, ObjectConfig};

/// Construction-time knobs for a `StorageRoot`: its declared
/// conformance namespace/version, dispersal scheme, the digest used to
/// derive storage ids, and the defaults handed to every `Object`
/// created or loaded beneath it (§3.1 StorageRoot).
#[derive(Debug, Clone)]
pub struct StorageRootConfig {
    pub conformance: String,
    pub version: String,
    pub storage: StorageScheme,
    pub storage_id_algo: DigestAlgorithm,
    pub object_config: ObjectConfig,
}

impl Default for StorageRootConfig {
    fn default() -> Self {
        StorageRootConfig {
            conformance: DEFAULT_STORAGE_ROOT_CONFORMANCE.to_string(),
            version: DEFAULT_STORAGE_ROOT_VERSION.to_string(),
            storage: StorageScheme::PairTree,
            storage_id_algo: DigestAlgorithm::Md5,
            object_config: ObjectConfig::default(),
        }
    }
}

/// A directory holding many `Object`s, with a dispersal scheme mapping
/// logical id to directory (§3.1 StorageRoot).
pub struct StorageRoot {
    path: PathBuf,
    config: StorageRootConfig,
}

impl StorageRoot {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &StorageRootConfig {
        &self.config
    }

    /// Creates the storage root at `path`, writing its declaration tags
    /// and optional readmes, if the path doesn't already declare one;
    /// otherwise loads the existing root (§4.2 `new`).
    pub fn new(
        path: impl AsRef<Path>,
        config: StorageRootConfig,
        readmes: Option<(&str, &str)>,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if path.is_file() {
            return Err(OcflError::PathConflict(format!(
                "{} exists and is a regular file",
                path.display()
            )));
        }

        if path.is_dir() && Self::has_declaration(&path)? {
            return Self::load(path, config);
        }

        fs::create_dir_all(&path)?;

        let conformance_tag = format!("0={}_{}", config.conformance, config.version);
        std::fs::write(path.join(conformance_tag), b"")?;
        let storage_tag = format!("1={}", config.storage);
        std::fs::write(path.join(storage_tag), b"")?;

        if let Some((dec_readme, storage_readme)) = readmes {
            let dec_name = format!("{}_{}.txt", config.conformance, config.version);
            std::fs::write(path.join(dec_name), dec_readme)?;
            let storage_name = format!("{}.txt", config.storage);
            std::fs::write(path.join(storage_name), storage_readme)?;
        }

        info!("created storage root at {}", path.display());

        Ok(StorageRoot { path, config })
    }

    fn has_declaration(path: &Path) -> Result<bool> {
        Ok(!fs::find_declaration_suffixes(path, "0=")?.is_empty())
    }

    /// Loads an existing storage root, recovering the dispersal scheme
    /// from its `1=<scheme>` tag and verifying the conformance
    /// declaration matches `config` (§4.2 `load`).
    pub fn load(path: impl AsRef<Path>, mut config: StorageRootConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let scheme_tags = fs::find_declaration_suffixes(&path, "1=")?;
        let scheme_name = scheme_tags.first().ok_or_else(|| {
            OcflError::Configuration(format!(
                "{} has no storage scheme declaration",
                path.display()
            ))
        })?;
        config.storage = StorageScheme::parse(scheme_name)?;

        let root = StorageRoot { path, config };
        if !root.verify_dec()? {
            return Err(OcflError::Configuration(format!(
                "{} is not a valid OCFL storage root",
                root.path.display()
            )));
        }

        Ok(root)
    }

    /// Returns true iff both declaration tags are present and match the
    /// configured conformance and dispersal scheme (§4.2 `verify_dec`).
    pub fn verify_dec(&self) -> Result<bool> {
        let conformance_tags = fs::find_declaration_suffixes(&self.path, "0=")?;
        let storage_tags = fs::find_declaration_suffixes(&self.path, "1=")?;

        let expected_conformance = format!("{}_{}", self.config.conformance, self.config.version);
        let conformance_ok =
            conformance_tags.len() == 1 && conformance_tags[0] == expected_conformance;
        let storage_ok =
            storage_tags.len() == 1 && storage_tags[0] == self.config.storage.to_string();

        Ok(conformance_ok && storage_ok)
    }

    fn storage_id(&self, obj_id: &str) -> String {
        storage_id(self.config.storage_id_algo, obj_id)
    }

    /// The object's path, relative to this root, derived from its
    /// logical id (§4.1 dispersal).
    fn dispersed_relative_path(&self, obj_id: &str) -> PathBuf {
        let sid = self.storage_id(obj_id);
        let relative = self.config.storage.disperse(&sid);
        let mut path = PathBuf::new();
        for segment in relative.split('/') {
            path.push(segment);
        }
        path
    }

    /// Converts `obj` into an object attached to this root: computes
    /// its dispersed path from its (possibly overridden) id, copies its
    /// files into place, then re-runs its maintenance sequence
    /// (§4.2 `add_object`).
    pub fn add_object(&self, obj: &mut Object, target_id: Option<String>) -> Result<()> {
        if obj.is_ocfl_object()?.is_none() {
            return Err(OcflError::InvalidOcflObject(
                obj.full_path().display().to_string(),
            ));
        }

        if let Some(id) = target_id {
            obj.inventory.as_mut().expect("checked above").id = id;
        }

        let obj_id = obj.inventory.as_ref().expect("checked above").id.clone();
        let relative = self.dispersed_relative_path(&obj_id);
        let destination = self.path.join(&relative);

        if destination.exists() {
            return Err(OcflError::PathConflict(format!(
                "{} is already occupied",
                destination.display()
            )));
        }

        fs::create_dir_all(&destination)?;
        fs::copy_tree(obj.full_path(), &destination)?;

        obj.attach_root(self.path.clone());
        obj.set_path(relative);

        info!(
            "added object {} to storage root at {}",
            obj_id,
            self.path.display()
        );

        obj.update(true, true, false)
    }

    /// Resolves a logical id to its dispersed path and returns the
    /// object there, distinguishing "not found" (`Ok(None)`) from
    /// "found but invalid" (`Err(InvalidOcflObject)`) (§4.2 `get_object`,
    /// `id_type="id"`).
    pub fn get_object_by_id(&self, id: &str) -> Result<Option<Object>> {
        self.get_object_at(self.dispersed_relative_path(id))
    }

    /// Same as `get_object_by_id`, but `relative` is already a path
    /// relative to the storage root (`id_type="path"`).
    pub fn get_object_by_path(&self, relative: impl AsRef<Path>) -> Result<Option<Object>> {
        self.get_object_at(relative.as_ref().to_path_buf())
    }

    fn get_object_at(&self, relative: PathBuf) -> Result<Option<Object>> {
        let full_path = self.path.join(&relative);
        if !full_path.exists() {
            return Ok(None);
        }

        let object = Object::attached(relative, self.path.clone(), self.config.object_config.clone())?;
        if object.inventory.is_none() {
            return Err(OcflError::InvalidOcflObject(full_path.display().to_string()));
        }

        Ok(Some(object))
    }

    /// Renames an attached object's dispersed directory to the path
    /// computed for `target_id`, failing if that path is already
    /// occupied; the new path is relative to this storage root, matching
    /// `add_object` (§9's resolved Open Question) (§4.2 `move_object`).
    pub fn move_object(&self, obj: &mut Object, target_id: String) -> Result<()> {
        if self.get_object_by_id(&target_id)?.is_some() {
            return Err(OcflError::PathConflict(format!(
                "object with id {} already exists",
                target_id
            )));
        }

        let new_relative = self.dispersed_relative_path(&target_id);
        let new_full = self.path.join(&new_relative);
        let old_full = obj.full_path();

        if let Some(parent) = new_full.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(&old_full, &new_full)?;

        obj.attach_root(self.path.clone());
        obj.set_path(new_relative);
        if let Some(inventory) = obj.inventory.as_mut() {
            inventory.id = target_id;
        }

        obj.update(true, true, false)
    }

    fn object_dirs(&self) -> Result<Vec<PathBuf>> {
        let mut dirs = Vec::new();

        for entry in WalkDir::new(&self.path).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_dir() {
                continue;
            }

            let tags = fs::find_declaration_suffixes(entry.path(), "0=")?;
            let is_object_dir = tags.iter().any(|tag| {
                fs::parse_declaration_suffix(tag)
                    .map(|(name, _)| name == self.config.object_config.conformance)
                    .unwrap_or(false)
            });

            if is_object_dir {
                dirs.push(entry.into_path());
            }
        }

        Ok(dirs)
    }

    /// Lazily lists every object directory under this root, relative to
    /// it, without parsing inventories — cheaper than `iter_objects`
    /// when only a count or path listing is needed (§9 "Generators").
    pub fn iter_object_paths(&self) -> Result<impl Iterator<Item = PathBuf> + '_> {
        let dirs = self.object_dirs()?;
        let root = self.path.clone();
        Ok(dirs
            .into_iter()
            .map(move |d| d.strip_prefix(&root).unwrap().to_path_buf()))
    }

    /// Same enumeration as `iter_object_paths`, but parses each
    /// object's inventory.
    pub fn iter_objects(&self) -> Result<impl Iterator<Item = Result<Object>> + '_> {
        let dirs = self.object_dirs()?;
        let root = self.path.clone();
        let config = self.config.object_config.clone();
        Ok(dirs.into_iter().map(move |d| {
            let relative = d.strip_prefix(&root).unwrap().to_path_buf();
            Object::attached(relative, root.clone(), config.clone())
        }))
    }

    /// Folds object enumeration to a count (§4.2 `count_objects`).
    pub fn count_objects(&self) -> Result<usize> {
        Ok(self.object_dirs()?.len())
    }

    /// Folds `Object::check_fixity` over every object under the root.
    pub fn check_fixity(
        &self,
        fixity_algo: Option<DigestAlgorithm>,
        use_manifest_digest: bool,
    ) -> Result<Vec<(PathBuf, FixityReport)>> {
        let mut results = Vec::new();
        for object in self.iter_objects()? {
            let object = object?;
            let report = object.check_fixity(fixity_algo, use_manifest_digest)?;
            results.push((object.path().to_path_buf(), report));
        }
        Ok(results)
    }

    /// Folds `Object::calc_fixity` over every object under the root.
    pub fn calc_fixity(
        &self,
        use_manifest_digest: bool,
        fixity_algo: Option<DigestAlgorithm>,
        update_fixity: bool,
    ) -> Result<Vec<(PathBuf, PathMap)>> {
        let mut results = Vec::new();
        for object in self.iter_objects()? {
            let mut object = object?;
            let digests = object.calc_fixity(use_manifest_digest, fixity_algo, update_fixity)?;
            results.push((object.path().to_path_buf(), digests));
        }
        Ok(results)
    }
}
