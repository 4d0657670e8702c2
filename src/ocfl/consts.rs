//! Filename and format constants used by the on-disk OCFL layout.

/// Default storage root conformance namespace.
pub const DEFAULT_STORAGE_ROOT_CONFORMANCE: &str = "ocfl";
/// Default storage root conformance version.
pub const DEFAULT_STORAGE_ROOT_VERSION: &str = "1.0";

/// Default object conformance namespace.
pub const DEFAULT_OBJECT_CONFORMANCE: &str = "ocfl_object";
/// Default object conformance version.
pub const DEFAULT_OBJECT_VERSION: &str = "1.0";

/// Inventory document filename.
pub const INVENTORY_FILE: &str = "inventory.json";

/// `content` subdirectory name within a version directory.
pub const CONTENT_DIR: &str = "content";

/// Constant `type` value written into every inventory document.
pub const INVENTORY_TYPE: &str = "Object";
