use std::fs::File;
use std::io::Read;
use std::path::Path;

use blake2::Blake2b512;
use digest::{Digest, DynDigest};
use md5::Md5;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Sha256, Sha512};
use strum_macros::{Display as EnumDisplay, EnumString};

use crate::ocfl::error::{OcflError, Result};

/// Digest algorithms offered by the platform hash facility (§6.4, §7
/// `UnknownDigestAlgorithm`).
#[derive(
    Deserialize, Serialize, Debug, Hash, Eq, PartialEq, Copy, Clone, EnumString, EnumDisplay,
)]
pub enum DigestAlgorithm {
    #[serde(rename = "md5")]
    #[strum(serialize = "md5")]
    Md5,
    #[serde(rename = "sha1")]
    #[strum(serialize = "sha1")]
    Sha1,
    #[serde(rename = "sha256")]
    #[strum(serialize = "sha256")]
    Sha256,
    #[serde(rename = "sha512")]
    #[strum(serialize = "sha512")]
    Sha512,
    #[serde(rename = "blake2b-512")]
    #[strum(serialize = "blake2b-512")]
    Blake2b512,
}

impl DigestAlgorithm {
    /// Parses an algorithm name, e.g. from a CLI flag or a stored
    /// `digestAlgorithm` field that was read back as a plain string.
    pub fn parse(name: &str) -> Result<Self> {
        name.parse()
            .map_err(|_| OcflError::UnknownDigestAlgorithm(name.to_string()))
    }

    /// The algorithm's block size, used to size the read buffer at
    /// `128 * block_size` per §4.5.
    fn block_size(&self) -> usize {
        match self {
            DigestAlgorithm::Md5 => 64,
            DigestAlgorithm::Sha1 => 64,
            DigestAlgorithm::Sha256 => 64,
            DigestAlgorithm::Sha512 => 128,
            DigestAlgorithm::Blake2b512 => 128,
        }
    }

    fn new_digest(&self) -> Box<dyn DynDigest> {
        match self {
            DigestAlgorithm::Md5 => Box::new(Md5::new()),
            DigestAlgorithm::Sha1 => Box::new(Sha1::new()),
            DigestAlgorithm::Sha256 => Box::new(Sha256::new()),
            DigestAlgorithm::Sha512 => Box::new(Sha512::new()),
            DigestAlgorithm::Blake2b512 => Box::new(Blake2b512::new()),
        }
    }

    /// Streams `filepath` in `128 * block_size` chunks and returns the
    /// lowercase hex digest. Failure to open or read the file propagates
    /// as `OcflError::Io` (§7 `IoError`).
    pub fn hash_file(&self, filepath: impl AsRef<Path>) -> Result<String> {
        let file = File::open(filepath)?;
        self.hash_reader(file)
    }

    /// Streams `reader` in `128 * block_size` chunks and returns the
    /// lowercase hex digest.
    pub fn hash_reader(&self, mut reader: impl Read) -> Result<String> {
        let mut hasher = self.new_digest();
        let chunk_size = 128 * self.block_size();
        let mut buf = vec![0u8; chunk_size];

        loop {
            let read = reader.read(&mut buf)?;
            if read == 0 {
                break;
            }
            hasher.update(&buf[..read]);
        }

        Ok(hex::encode(hasher.finalize()))
    }

    /// Hashes an in-memory byte slice, e.g. the serialized inventory
    /// document before it's written to its sidecar file.
    pub fn hash_bytes(&self, bytes: &[u8]) -> String {
        let mut hasher = self.new_digest();
        hasher.update(bytes);
        hex::encode(hasher.finalize())
    }
}
