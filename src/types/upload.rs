//! Files picked by the user and where they land in storage.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use uuid::Uuid;

pub const PDF_MEDIA_TYPE: &str = "application/pdf";
const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static DISALLOWED: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_.\-]").expect("valid regex"));

/// Make a file name safe to use as a storage path segment.
///
/// Whitespace runs become `_`, then anything outside `[A-Za-z0-9_.-]` is
/// dropped. Case is preserved.
pub fn sanitize_file_name(name: &str) -> String {
    let underscored = WHITESPACE.replace_all(name, "_");
    DISALLOWED.replace_all(&underscored, "").into_owned()
}

/// A file chosen through a picker, held in memory until submission
#[derive(Clone, PartialEq)]
pub struct UploadFile {
    pub name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, deriving its media type from the extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(Self::new(name, media_type_for_path(path), bytes))
    }

    pub fn is_pdf(&self) -> bool {
        self.media_type == PDF_MEDIA_TYPE
    }

    pub fn sanitized_name(&self) -> String {
        sanitize_file_name(&self.name)
    }
}

impl fmt::Debug for UploadFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadFile")
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Media type by file extension
pub fn media_type_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => PDF_MEDIA_TYPE,
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        _ => FALLBACK_MEDIA_TYPE,
    }
}

/// Display-only reference to a picked file; never uploaded or persisted remotely
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewRef(String);

impl PreviewRef {
    pub fn for_file(file: &UploadFile) -> Self {
        Self(format!("preview://{}/{}", Uuid::new_v4(), file.sanitized_name()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Kind of object stored under a company's namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Logo,
    Document,
}

impl StorageKind {
    fn segment(self) -> &'static str {
        match self {
            StorageKind::Logo => "logo",
            StorageKind::Document => "docs",
        }
    }
}

/// Build `companies/{company_id}/{logo|docs}/{sanitized name}`
pub fn storage_path(company_id: Uuid, kind: StorageKind, file_name: &str) -> String {
    format!(
        "companies/{}/{}/{}",
        company_id,
        kind.segment(),
        sanitize_file_name(file_name)
    )
}
