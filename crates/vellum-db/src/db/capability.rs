//! Content capability detection.

use sqlx::PgExecutor;
use vellum_core::{AppError, ContentCapability};

/// SQLSTATE `undefined_object`, raised when a large-object reference is dangling.
pub const UNDEFINED_OBJECT: &str = "42704";

/// Look up the storage type of `file_content.content` in the current schema.
#[tracing::instrument(skip(executor), fields(db.table = "information_schema.columns"))]
pub async fn detect<'e, E>(executor: E) -> Result<ContentCapability, AppError>
where
    E: PgExecutor<'e>,
{
    let udt_name: Option<String> = sqlx::query_scalar(
        r#"
        SELECT udt_name::text
        FROM information_schema.columns
        WHERE table_schema = current_schema()
          AND table_name = 'file_content'
          AND column_name = 'content'
        "#,
    )
    .fetch_optional(executor)
    .await?;

    let capability = capability_from_udt(udt_name.as_deref())?;
    tracing::debug!(capability = %capability, "Content capability detected");
    Ok(capability)
}

/// Map a catalog type name to a capability.
pub fn capability_from_udt(udt_name: Option<&str>) -> Result<ContentCapability, AppError> {
    match udt_name {
        Some("oid") => Ok(ContentCapability::LargeObject),
        Some("bytea") => Ok(ContentCapability::BinaryColumn),
        Some(other) => Err(AppError::CapabilityMisconfigured(format!(
            "file_content.content has type '{}'. Convert it to OID to store content as large objects, or to BYTEA to store it inline",
            other
        ))),
        None => Err(AppError::CapabilityMisconfigured(
            "file_content.content column not found. Run the migrations or add an OID or BYTEA content column"
                .to_string(),
        )),
    }
}

/// Whether a database error reports a missing object (dangling large-object reference).
pub fn is_undefined_object(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.code().as_deref() == Some(UNDEFINED_OBJECT),
        _ => false,
    }
}
