//! In-memory representation of an OCFL inventory document (§3.1, §4.3):
//! the manifest, per-version states, and optional fixity records, with
//! the JSON encoding (§6.3) kept behind typed accessors rather than
//! exposed as a raw document.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use rand::RngCore;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::ocfl::consts::INVENTORY_TYPE;
use crate::ocfl::digest::DigestAlgorithm;
use crate::ocfl::error::{OcflError, Result};

static VERSION_KEY_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^v([0-9]+)$").unwrap());

/// digest -> paths. Always kept sorted (§5: "implementations must sort
/// path entries before grouping") so index 0 is a stable, deterministic
/// canonical entry across runs, which `Object::checkout` depends on.
pub type PathMap = BTreeMap<String, Vec<String>>;

/// Sorts and dedupes every path list in a freshly scanned digest->paths
/// map before it's stored in the inventory.
pub fn normalize_path_map(mut map: PathMap) -> PathMap {
    for paths in map.values_mut() {
        paths.sort();
        paths.dedup();
    }
    map
}

/// OCFL inventory serialization document.
///
/// Field declaration order matches the JSON key names alphabetically,
/// so `derive(Serialize)` already produces the canonical sorted-keys
/// encoding (§6.3) in one pass, with no second serialize-through-Value
/// step needed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Inventory {
    #[serde(rename = "digestAlgorithm")]
    pub digest_algorithm: DigestAlgorithm,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixity: Option<BTreeMap<String, PathMap>>,

    pub head: String,

    pub id: String,

    pub manifest: PathMap,

    #[serde(rename = "type")]
    pub type_declaration: String,

    pub versions: BTreeMap<String, VersionEntry>,
}

/// A single version entry within `versions` (§3.1 VersionEntry).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VersionEntry {
    #[serde(with = "iso_utc")]
    pub created: DateTime<Utc>,
    pub message: Option<String>,
    pub state: PathMap,
}

impl VersionEntry {
    pub fn new(message: Option<String>) -> Self {
        VersionEntry {
            created: Utc::now(),
            message,
            state: PathMap::new(),
        }
    }
}

/// Accepts either an integer version number or a `"vN"` key, per the
/// spec's note (§9) that `get_version_entry` takes either dynamically;
/// expressed here as a tagged input instead.
pub enum VersionArg {
    Num(u32),
    Key(String),
}

impl From<u32> for VersionArg {
    fn from(n: u32) -> Self {
        VersionArg::Num(n)
    }
}

impl From<&str> for VersionArg {
    fn from(s: &str) -> Self {
        VersionArg::Key(s.to_string())
    }
}

impl From<String> for VersionArg {
    fn from(s: String) -> Self {
        VersionArg::Key(s)
    }
}

/// Formats a version number as its `"vN"` inventory key.
pub fn version_key(n: u32) -> String {
    format!("v{}", n)
}

/// Parses a `"vN"` inventory key back into its version number.
pub fn parse_version_key(key: &str) -> Result<u32> {
    VERSION_KEY_REGEX
        .captures(key)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .ok_or_else(|| OcflError::Configuration(format!("invalid version key: {}", key)))
}

/// Generates a fresh 32-character lowercase hex id, the same shape as a
/// hyphen-less UUID v4, used as a default object id when none is given.
pub fn fresh_hex_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

impl Inventory {
    /// Constructs the scaffold inventory described in §4.3: a single
    /// empty `v1`, a fresh id unless one is supplied, and the passed
    /// digest algorithm as the primary digest.
    pub fn new(id: Option<String>, digest_algorithm: DigestAlgorithm) -> Self {
        let mut versions = BTreeMap::new();
        versions.insert(version_key(1), VersionEntry::new(None));

        Inventory {
            digest_algorithm,
            fixity: None,
            head: version_key(1),
            id: id.unwrap_or_else(fresh_hex_id),
            manifest: PathMap::new(),
            type_declaration: INVENTORY_TYPE.to_string(),
            versions,
        }
    }

    /// Replaces a version's state, or creates a fresh `VersionEntry`
    /// with a `now` timestamp if the version key doesn't exist yet
    /// (§4.3 `update_version_state`).
    pub fn update_version_state(&mut self, version_key: &str, state: PathMap) {
        match self.versions.get_mut(version_key) {
            Some(entry) => entry.state = state,
            None => {
                self.versions
                    .insert(version_key.to_string(), VersionEntry::new(None).with_state(state));
            }
        }
    }

    /// Integer version numbers parsed from the inventory's keys, sorted
    /// ascending (§4.3, §8 invariant 6).
    pub fn version_numbers(&self) -> Vec<u32> {
        let mut nums: Vec<u32> = self
            .versions
            .keys()
            .filter_map(|k| parse_version_key(k).ok())
            .collect();
        nums.sort_unstable();
        nums
    }

    /// Looks up a version entry by integer or `"vN"` key.
    pub fn version_entry(&self, version: impl Into<VersionArg>) -> Result<&VersionEntry> {
        let key = self.resolve_version_key(version.into());
        self.versions.get(&key).ok_or_else(|| {
            OcflError::MissingPath(format!("version {} not found in object {}", key, self.id))
        })
    }

    /// Mutable counterpart of [`Inventory::version_entry`].
    pub fn version_entry_mut(&mut self, version: impl Into<VersionArg>) -> Result<&mut VersionEntry> {
        let key = self.resolve_version_key(version.into());
        let id = self.id.clone();
        self.versions
            .get_mut(&key)
            .ok_or_else(|| OcflError::MissingPath(format!("version {} not found in object {}", key, id)))
    }

    /// Resolves a `VersionArg` into a concrete version number.
    pub fn resolve_version_number(&self, arg: impl Into<VersionArg>) -> Result<u32> {
        match arg.into() {
            VersionArg::Num(n) => Ok(n),
            VersionArg::Key(k) => parse_version_key(&k),
        }
    }

    fn resolve_version_key(&self, arg: VersionArg) -> String {
        match arg {
            VersionArg::Num(n) => version_key(n),
            VersionArg::Key(k) => k,
        }
    }

    /// Merges a freshly computed fixity map into the inventory's
    /// `fixity` table under `algo`, creating the table if absent
    /// (§4.3 `update_fixity`).
    pub fn update_fixity(&mut self, algo: DigestAlgorithm, digests: PathMap) {
        let fixity = self.fixity.get_or_insert_with(BTreeMap::new);
        fixity.insert(algo.to_string(), digests);
    }

    /// The object's head version number.
    pub fn head_num(&self) -> Result<u32> {
        parse_version_key(&self.head)
    }
}

impl VersionEntry {
    fn with_state(mut self, state: PathMap) -> Self {
        self.state = state;
        self
    }
}

/// Serializes `value` as indent-4 JSON with keys in declaration order
/// (§6.3's "sorted keys" requirement, satisfied by field ordering rather
/// than a second serialize-through-`Value` pass).
pub fn to_canonical_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    Ok(buf)
}

/// Serializes/deserializes timestamps as `YYYY-MM-DDTHH:MM:SSZ` (§6.3),
/// tolerating any valid RFC 3339 timestamp (with offset or fractional
/// seconds) on read, since the sidecar/trailing-newline convention note
/// (§9) applies the same "accept either form" spirit to timestamps
/// produced by other OCFL tools.
mod iso_utc {
    use chrono::{DateTime, Utc};
    use serde::{de::Error as DeError, Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(DeError::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_inventory_has_single_empty_v1() {
        let inv = Inventory::new(Some("test-1".to_string()), DigestAlgorithm::Sha256);
        assert_eq!("test-1", inv.id);
        assert_eq!("v1", inv.head);
        assert_eq!(vec![1], inv.version_numbers());
        assert!(inv.manifest.is_empty());
        assert!(inv.version_entry(1u32).unwrap().state.is_empty());
    }

    #[test]
    fn new_inventory_without_id_gets_fresh_hex_id() {
        let inv = Inventory::new(None, DigestAlgorithm::Sha256);
        assert_eq!(32, inv.id.len());
        assert!(inv.id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn version_numbers_sorted_ascending_despite_lexicographic_keys() {
        let mut inv = Inventory::new(Some("o".to_string()), DigestAlgorithm::Sha256);
        inv.update_version_state("v2", PathMap::new());
        inv.update_version_state("v10", PathMap::new());
        assert_eq!(vec![1, 2, 10], inv.version_numbers());
    }

    #[test]
    fn version_entry_accepts_int_or_key() {
        let inv = Inventory::new(Some("o".to_string()), DigestAlgorithm::Sha256);
        assert!(inv.version_entry(1u32).is_ok());
        assert!(inv.version_entry("v1").is_ok());
        assert!(inv.version_entry("v2").is_err());
    }

    #[test]
    fn update_fixity_merges_by_algorithm() {
        let mut inv = Inventory::new(Some("o".to_string()), DigestAlgorithm::Sha256);
        let mut digests = PathMap::new();
        digests.insert("abc".to_string(), vec!["v1/content/foo.txt".to_string()]);
        inv.update_fixity(DigestAlgorithm::Md5, digests.clone());
        inv.update_fixity(DigestAlgorithm::Sha1, digests);
        let fixity = inv.fixity.unwrap();
        assert_eq!(2, fixity.len());
        assert!(fixity.contains_key("md5"));
        assert!(fixity.contains_key("sha1"));
    }

    #[test]
    fn serialization_round_trip_is_canonical() {
        let inv = Inventory::new(Some("o1".to_string()), DigestAlgorithm::Sha256);
        let json1 = serde_json::to_string_pretty(&inv).unwrap();
        let parsed: Inventory = serde_json::from_str(&json1).unwrap();
        let json2 = serde_json::to_string_pretty(&parsed).unwrap();
        assert_eq!(json1, json2);
    }

    #[test]
    fn json_keys_are_alphabetically_ordered() {
        let inv = Inventory::new(Some("o1".to_string()), DigestAlgorithm::Sha256);
        let json = serde_json::to_string(&inv).unwrap();
        let digest_idx = json.find("digestAlgorithm").unwrap();
        let head_idx = json.find("\"head\"").unwrap();
        let id_idx = json.find("\"id\"").unwrap();
        let manifest_idx = json.find("manifest").unwrap();
        let type_idx = json.find("\"type\"").unwrap();
        let versions_idx = json.find("versions").unwrap();
        assert!(digest_idx < head_idx);
        assert!(head_idx < id_idx);
        assert!(id_idx < manifest_idx);
        assert!(manifest_idx < type_idx);
        assert!(type_idx < versions_idx);
    }

    #[test]
    fn timestamp_serializes_without_fractional_seconds() {
        let inv = Inventory::new(Some("o1".to_string()), DigestAlgorithm::Sha256);
        let json = serde_json::to_string(&inv).unwrap();
        assert!(json.contains("Z\""));
        assert!(!json.contains('.'));
    }

    #[test]
    fn parse_version_key_rejects_malformed_input() {
        assert!(parse_version_key("v1").is_ok());
        assert!(parse_version_key("1").is_err());
        assert!(parse_version_key("vX").is_err());
    }
}
