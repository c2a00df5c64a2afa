//! On-disk layout and URL scheme for client files.
//!
//! ```text
//! {root}/secured/client_{id}/{filename}   <- current scheme, served via
//!                                            /api/v1/secured-files/{id}/{filename}
//! {root}/public/{path}                    <- legacy public files, /{path}
//! ```
//!
//! Files are owned by the path scheme, not by database rows; the only
//! reference is the URL stored on the verified document.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// Directory (under the storage root) holding per-client private folders.
pub const SECURED_DIR: &str = "secured";

/// Directory (under the storage root) mirroring the legacy public URL space:
/// `/docs/a.pdf` lives at `{root}/public/docs/a.pdf`.
pub const PUBLIC_DIR: &str = "public";

/// URL prefix of access-controlled file retrieval.
pub const SECURED_URL_PREFIX: &str = "/api/v1/secured-files/";

/// API paths never map to public files.
const API_URL_PREFIX: &str = "/api/";

/// A single path segment: starts alphanumeric, then alphanumerics, `.`, `_`, `-`.
static FILENAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]{0,254}$").expect("valid regex"));

// ---------------------------------------------------------------------------
// Identity captures
// ---------------------------------------------------------------------------

/// The three images an identity verification requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureKind {
    IdFront,
    IdBack,
    Selfie,
}

impl CaptureKind {
    pub const ALL: [CaptureKind; 3] = [Self::IdFront, Self::IdBack, Self::Selfie];

    /// Multipart field name the mobile client uses.
    pub fn field_name(self) -> &'static str {
        match self {
            Self::IdFront => "idFront",
            Self::IdBack => "idBack",
            Self::Selfie => "selfie",
        }
    }

    /// Prefix of the stored filename.
    pub fn file_prefix(self) -> &'static str {
        match self {
            Self::IdFront => "id_front",
            Self::IdBack => "id_back",
            Self::Selfie => "selfie",
        }
    }

    pub fn from_field_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.field_name() == name)
    }
}

/// `{kind}_{clientId}_{timestamp}.jpg`
pub fn capture_filename(kind: CaptureKind, client_id: DbId, now: Timestamp) -> String {
    format!(
        "{}_{client_id}_{}.jpg",
        kind.file_prefix(),
        now.timestamp_millis()
    )
}

/// Reject uploads that are not a JPEG, PNG or WebP image.
pub fn ensure_image(kind: CaptureKind, bytes: &[u8]) -> Result<(), CoreError> {
    match image::guess_format(bytes) {
        Ok(image::ImageFormat::Jpeg | image::ImageFormat::Png | image::ImageFormat::WebP) => {
            Ok(())
        }
        _ => Err(CoreError::Validation(format!(
            "File '{}' must be a JPEG, PNG or WebP image",
            kind.field_name()
        ))),
    }
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// `document_{clientId}_{timestamp}.pdf`
pub fn document_filename(client_id: DbId, now: Timestamp) -> String {
    format!("document_{client_id}_{}.pdf", now.timestamp_millis())
}

/// Name of the stamped copy of `original`: `signed_{stem}_{timestamp}.pdf`.
pub fn signed_filename(original: &Path, now: Timestamp) -> String {
    let stem = original
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document");
    format!("signed_{stem}_{}.pdf", now.timestamp_millis())
}

/// Name of the standalone attestation page produced while stamping.
pub fn attestation_filename(session_id: &str, now: Timestamp) -> String {
    format!("attestation_{session_id}_{}.pdf", now.timestamp_millis())
}

/// Reject anything that does not look like a PDF header.
pub fn ensure_pdf(bytes: &[u8]) -> Result<(), CoreError> {
    if bytes.starts_with(b"%PDF-") {
        Ok(())
    } else {
        Err(CoreError::Validation("Document must be a PDF file".into()))
    }
}

// ---------------------------------------------------------------------------
// Paths and URLs
// ---------------------------------------------------------------------------

/// Validate a single filename coming from a URL or request path.
pub fn validate_filename(name: &str) -> Result<(), CoreError> {
    if FILENAME_RE.is_match(name) && !name.contains("..") {
        Ok(())
    } else {
        Err(CoreError::Validation(format!("Invalid file name '{name}'")))
    }
}

/// Private directory of a client.
pub fn client_dir(root: &Path, client_id: DbId) -> PathBuf {
    root.join(SECURED_DIR).join(format!("client_{client_id}"))
}

/// Access-controlled URL of a file in a client's private directory.
pub fn secured_url(client_id: DbId, filename: &str) -> String {
    format!("{SECURED_URL_PREFIX}{client_id}/{filename}")
}

/// A URL resolved back to its on-disk location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    /// Owning client for secured files; `None` for legacy public files.
    pub client_id: Option<DbId>,
    pub path: PathBuf,
}

/// Resolve a stored document URL to its path under `root`.
///
/// Accepts absolute URLs (the scheme and host are ignored), the secured
/// scheme, and root-relative legacy public paths. Returns `None` for other
/// API paths, relative paths, and traversal attempts.
pub fn resolve_url(root: &Path, url: &str) -> Option<ResolvedFile> {
    let path = strip_origin(url);
    let path = path.split(['?', '#']).next().unwrap_or_default();

    if let Some(rest) = path.strip_prefix(SECURED_URL_PREFIX) {
        let (client, filename) = rest.split_once('/')?;
        let client_id: DbId = client.parse().ok()?;
        validate_filename(filename).ok()?;
        return Some(ResolvedFile {
            client_id: Some(client_id),
            path: client_dir(root, client_id).join(filename),
        });
    }

    if path.starts_with(API_URL_PREFIX) {
        return None;
    }

    let rest = path.strip_prefix('/')?;
    let mut resolved = root.join(PUBLIC_DIR);
    for segment in rest.split('/') {
        validate_filename(segment).ok()?;
        resolved.push(segment);
    }
    Some(ResolvedFile {
        client_id: None,
        path: resolved,
    })
}

fn strip_origin(url: &str) -> &str {
    match url.split_once("://") {
        Some((_, after_scheme)) => after_scheme
            .find('/')
            .map(|i| &after_scheme[i..])
            .unwrap_or("/"),
        None => url,
    }
}

/// Content type for serving a stored file.
pub fn content_type_for(filename: &str) -> &'static str {
    match filename
        .rsplit('.')
        .next()
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("pdf") => "application/pdf",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
