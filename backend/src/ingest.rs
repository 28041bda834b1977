use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

pub const ALLOWED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("no scan image attached to the request")]
    MissingFile,
    #[error("unsupported file type \"{0}\"; allowed: png, jpg, jpeg, gif")]
    UnsupportedType(String),
    #[error("uploaded file exceeds the {} MiB limit", MAX_UPLOAD_BYTES / 1024 / 1024)]
    TooLarge,
    #[error("failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

/// One uploaded file as read off the multipart stream.
pub struct ScanUpload {
    pub filename: Option<String>,
    pub bytes: Vec<u8>,
}

pub struct StoredScan {
    pub path: PathBuf,
    pub filename: String,
    pub content_hash: String,
}

/// Validates and persists an upload. The extension check runs before
/// anything touches the disk; collisions on the sanitized name are
/// resolved last-write-wins.
pub fn store(upload: &ScanUpload, dir: &Path) -> Result<StoredScan, IngestError> {
    let raw_name = upload.filename.as_deref().unwrap_or("").trim();
    if raw_name.is_empty() || upload.bytes.is_empty() {
        return Err(IngestError::MissingFile);
    }
    if upload.bytes.len() > MAX_UPLOAD_BYTES {
        return Err(IngestError::TooLarge);
    }

    let extension = extension_of(raw_name);
    if !is_allowed(&extension) {
        return Err(IngestError::UnsupportedType(extension));
    }

    let filename = sanitize_filename(raw_name).ok_or(IngestError::MissingFile)?;

    fs::create_dir_all(dir)?;
    let path = dir.join(&filename);
    fs::write(&path, &upload.bytes)?;

    Ok(StoredScan {
        path,
        filename,
        content_hash: content_hash(&upload.bytes),
    })
}

pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn extension_of(filename: &str) -> String {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

fn is_allowed(extension: &str) -> bool {
    ALLOWED_EXTENSIONS.contains(&extension)
}

/// Strips directory components and anything outside `[A-Za-z0-9._-]`,
/// so a hostile filename cannot escape the upload directory.
fn sanitize_filename(raw: &str) -> Option<String> {
    let basename = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(raw);

    let cleaned: String = basename
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();

    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() || !cleaned.contains('.') {
        return None;
    }
    Some(cleaned)
}
