//! API constants

/// Versioned API prefix used by every content route
pub const API_PREFIX: &str = "/api/v0";

/// Query parameter (matched case-insensitively) overriding the download filename
pub const FILENAME_QUERY_PARAM: &str = "filename";

/// Timeout applied to each health check
pub const HEALTH_CHECK_TIMEOUT_SECS: u64 = 5;
