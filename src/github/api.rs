//! Wire types for the remote contents API, plus the binary-safe
//! transport codec used for file bodies.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Answer to a content lookup: a directory yields a listing, a file
/// yields the file itself (with its body inline).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ContentResponse {
    Listing(Vec<DirEntry>),
    File(FileEntry),
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirEntry {
    pub name: String,
    pub path: String,
    pub sha: String,
    #[serde(rename = "type")]
    pub entry_type: String,
}

impl DirEntry {
    pub fn is_markdown_file(&self) -> bool {
        self.entry_type == "file" && self.name.ends_with(".md")
    }

    /// File name without the post extension.
    pub fn stem(&self) -> &str {
        self.name.strip_suffix(".md").unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileEntry {
    pub name: String,
    pub path: String,
    pub sha: String,
    /// Transport-encoded body; present on single-file lookups, absent in
    /// directory listings.
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlobResponse {
    pub sha: String,
    /// Transport-encoded body, wrapped in newlines by the store.
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserResponse {
    pub login: String,
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: String,
    pub email: Option<String>,
}

/// Create-or-update request body. `sha` present means update at that
/// revision; absent means create.
#[derive(Debug, Serialize)]
pub struct PutFileRequest<'a> {
    pub message: &'a str,
    pub content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct DeleteFileRequest<'a> {
    pub message: &'a str,
    pub sha: &'a str,
}

/// Error payload the store attaches to non-success answers.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub message: String,
}

/// Text to wire form. The store only accepts base64 file bodies.
pub fn encode_transport(text: &str) -> String {
    STANDARD.encode(text.as_bytes())
}

/// Wire form back to text. The store wraps base64 at 60 columns, so
/// ASCII whitespace is stripped before decoding; the result must be
/// valid UTF-8.
pub fn decode_transport(wire: &str) -> Result<String, StoreError> {
    let compact: String = wire.chars().filter(|c| !c.is_ascii_whitespace()).collect();

    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| StoreError::Encoding(format!("bad base64 payload: {}", e)))?;

    String::from_utf8(bytes).map_err(|e| StoreError::Encoding(format!("payload is not UTF-8: {}", e)))
}
