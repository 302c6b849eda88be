//! Vellum API Library
//!
//! This crate provides the HTTP gateway: the download and upload services, the
//! streaming response sink, handlers, and application setup.

pub mod constants;
pub mod error;
pub mod handlers;
pub mod services;
pub mod setup;
pub mod state;
pub mod streaming;
pub mod telemetry;

// Re-exports
pub use error::{ErrorResponse, HttpAppError};
pub use services::{DownloadService, UploadService};
pub use state::AppState;
