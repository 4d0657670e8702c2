//! The object store core: storage dispersal, object lifecycle and
//! forward-delta reconciliation, inventory modeling, checkout, and
//! fixity verification.
//!
//! ```rust,no_run
//! use ocfl_core::ocfl::{StorageRoot, StorageRootConfig};
//!
//! # fn main() -> ocfl_core::ocfl::Result<()> {
//! let root = StorageRoot::new("path/to/storage/root", StorageRootConfig::default(), None)?;
//! let count = root.count_objects()?;
//! # let _ = count;
//! # Ok(())
//! # }
//! ```

pub use self::digest::DigestAlgorithm;
pub use self::error::{OcflError, Result};
pub use self::inventory::{Inventory, PathMap, VersionArg, VersionEntry};
pub use self::layout::StorageScheme;
pub use self::object::{Declaration, FixityReport, Object, ObjectConfig};
pub use self::storage_root::{StorageRoot, StorageRootConfig};

mod consts;
mod digest;
mod error;
mod fs;
mod inventory;
mod layout;
mod object;
mod paths;
mod storage_root;
