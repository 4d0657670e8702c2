//! A content-addressed, versioned object store implementing the Oxford
//! Common Filesystem Layout (OCFL) conventions over a plain hierarchical
//! filesystem.
//!
//! A `StorageRoot` holds many `Object`s, each of which retains every
//! historical version while deduplicating identical file content across
//! versions via a digest manifest. See `ocfl::object` for ingest,
//! checkout, and fixity verification, and `ocfl::storage_root` for
//! id-based retrieval and relocation.

pub mod ocfl;
