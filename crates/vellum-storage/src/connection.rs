//! Object storage connection strings
//!
//! Two forms are understood:
//!
//! - Azure storage connection strings, `Key=Value` pairs separated by `;`
//!   (`DefaultEndpointsProtocol`, `AccountName`, `AccountKey`, `EndpointSuffix`,
//!   `BlobEndpoint`, `UseDevelopmentStorage`). The container is the Azure container.
//! - Object store URLs understood by `object_store::parse_url_opts` (`s3://bucket`,
//!   `gs://bucket`, `az://account/container`, `file:///root`, `memory://`). The
//!   container is a top-level prefix below the URL root; for `file://` roots it must
//!   exist as a directory.

use crate::object::{ContainerCheck, ObjectStoreBlobStore};
use crate::traits::{StorageError, StorageResult};
use object_store::azure::MicrosoftAzureBuilder;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use url::Url;

const INVALID_CONNECTION_STRING: &str = "Invalid connection string";
const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";
const URL_SCHEMES: &[&str] = &[
    "s3", "s3a", "gs", "az", "azure", "abfs", "abfss", "file", "memory",
];

/// Azure account settings parsed from a `Key=Value;...` connection string.
#[derive(Clone, PartialEq, Eq)]
pub struct AzureConnection {
    pub account: Option<String>,
    pub access_key: Option<String>,
    pub protocol: String,
    pub endpoint_suffix: String,
    pub blob_endpoint: Option<String>,
    pub use_emulator: bool,
}

impl std::fmt::Debug for AzureConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureConnection")
            .field("account", &self.account)
            .field("access_key", &self.access_key.as_ref().map(|_| "***"))
            .field("protocol", &self.protocol)
            .field("endpoint_suffix", &self.endpoint_suffix)
            .field("blob_endpoint", &self.blob_endpoint)
            .field("use_emulator", &self.use_emulator)
            .finish()
    }
}

impl AzureConnection {
    /// Endpoint to talk to, when it differs from the public Azure cloud default.
    fn endpoint(&self) -> Option<String> {
        if let Some(ref endpoint) = self.blob_endpoint {
            return Some(endpoint.trim_end_matches('/').to_string());
        }
        let account = self.account.as_deref()?;
        if self.endpoint_suffix == DEFAULT_ENDPOINT_SUFFIX && self.protocol == "https" {
            return None;
        }
        Some(format!(
            "{}://{}.blob.{}",
            self.protocol, account, self.endpoint_suffix
        ))
    }
}

/// A parsed object storage connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionString {
    Azure(AzureConnection),
    Url(Url),
}

impl FromStr for ConnectionString {
    type Err = StorageError;

    fn from_str(raw: &str) -> StorageResult<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(invalid());
        }

        if !raw.contains(';') && raw.contains("://") {
            let url = Url::parse(raw).map_err(|_| invalid())?;
            if !URL_SCHEMES.contains(&url.scheme()) {
                return Err(invalid());
            }
            return Ok(ConnectionString::Url(url));
        }

        parse_key_values(raw).map(ConnectionString::Azure)
    }
}

fn invalid() -> StorageError {
    StorageError::ConfigError(INVALID_CONNECTION_STRING.to_string())
}

fn parse_key_values(raw: &str) -> StorageResult<AzureConnection> {
    let mut pairs: HashMap<String, String> = HashMap::new();
    for part in raw.split(';').map(str::trim).filter(|p| !p.is_empty()) {
        // Account keys are base64 and may end in '=', so split on the first one only
        let (key, value) = part.split_once('=').ok_or_else(invalid)?;
        let key = key.trim();
        if key.is_empty() {
            return Err(invalid());
        }
        pairs.insert(key.to_ascii_lowercase(), value.trim().to_string());
    }

    let use_emulator = pairs
        .get("usedevelopmentstorage")
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let account = pairs.get("accountname").cloned().filter(|v| !v.is_empty());
    let access_key = pairs.get("accountkey").cloned().filter(|v| !v.is_empty());

    if !use_emulator && (account.is_none() || access_key.is_none()) {
        return Err(invalid());
    }

    let protocol = pairs
        .get("defaultendpointsprotocol")
        .map(|v| v.to_ascii_lowercase())
        .unwrap_or_else(|| "https".to_string());
    if protocol != "https" && protocol != "http" {
        return Err(invalid());
    }

    Ok(AzureConnection {
        account,
        access_key,
        protocol,
        endpoint_suffix: pairs
            .get("endpointsuffix")
            .cloned()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_ENDPOINT_SUFFIX.to_string()),
        blob_endpoint: pairs.get("blobendpoint").cloned().filter(|v| !v.is_empty()),
        use_emulator,
    })
}

impl ConnectionString {
    /// Build a blob store addressing `container`.
    pub fn build_store(&self, container: &str) -> StorageResult<ObjectStoreBlobStore> {
        match self {
            ConnectionString::Azure(azure) => build_azure(azure, container),
            ConnectionString::Url(url) => build_from_url(url, container),
        }
    }
}

fn build_azure(azure: &AzureConnection, container: &str) -> StorageResult<ObjectStoreBlobStore> {
    let mut builder = MicrosoftAzureBuilder::new().with_container_name(container);

    if azure.use_emulator {
        builder = builder.with_use_emulator(true);
    }
    if let Some(ref account) = azure.account {
        builder = builder.with_account(account.clone());
    }
    if let Some(ref key) = azure.access_key {
        builder = builder.with_access_key(key.clone());
    }
    if let Some(endpoint) = azure.endpoint() {
        let allow_http = endpoint.starts_with("http://");
        builder = builder.with_endpoint(endpoint).with_allow_http(allow_http);
    }

    let store = builder.build().map_err(|e| {
        tracing::error!(error = %e, container = %container, "Failed to build Azure blob client");
        invalid()
    })?;

    Ok(ObjectStoreBlobStore::container_scoped(Arc::new(store), container))
}

fn build_from_url(url: &Url, container: &str) -> StorageResult<ObjectStoreBlobStore> {
    // object_store config keys are lowercase (`aws_access_key_id`, `google_service_account`)
    let options = std::env::vars().map(|(key, value)| (key.to_ascii_lowercase(), value));
    build_from_url_with(url, container, options)
}

fn build_from_url_with<I>(url: &Url, container: &str, options: I) -> StorageResult<ObjectStoreBlobStore>
where
    I: IntoIterator<Item = (String, String)>,
{
    let (store, base) = object_store::parse_url_opts(url, options).map_err(|e| {
        tracing::error!(error = %e, scheme = %url.scheme(), "Failed to build object store from URL");
        invalid()
    })?;

    let blob_store = ObjectStoreBlobStore::prefixed(Arc::from(store), base.child(container), container);

    match url.scheme() {
        "file" => {
            let root = url.to_file_path().map_err(|_| invalid())?;
            Ok(blob_store.with_container_check(ContainerCheck::Directory(root.join(container))))
        }
        "memory" => Ok(blob_store.with_container_check(ContainerCheck::Populated)),
        _ => Ok(blob_store),
    }
}
