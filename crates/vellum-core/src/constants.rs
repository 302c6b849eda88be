//! Shared constants.

/// Default transfer chunk size in bytes (100 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 100 * 1024;

/// Upper bound accepted for `CONTENT_CHUNK_SIZE_KB` (16 MiB).
pub const MAX_CHUNK_SIZE_KB: usize = 16 * 1024;

/// File name reported when content is requested by bare content identifier.
pub const UNKNOWN_FILE_NAME: &str = "unknown.txt";

/// Content type used when the file extension is unknown.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
