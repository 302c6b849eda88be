pub mod content_download;
pub mod content_upload;
