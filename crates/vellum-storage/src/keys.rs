//! Blob key generation.

use uuid::Uuid;

const BLOB_KEY_PREFIX: &str = "doc-";

/// Blob name for the given content identifier: `doc-{content_id}`.
pub fn blob_key(content_id: Uuid) -> String {
    format!("{}{}", BLOB_KEY_PREFIX, content_id)
}
