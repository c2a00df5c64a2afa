//! Signature stamping: append an attestation page to a source PDF.
//!
//! Best-effort enrichment over a guaranteed artifact:
//!
//! 1. Copy the original to the signed filename. From here on a readable
//!    signed document exists no matter what happens next.
//! 2. Render a one-page attestation PDF (completion time, session id).
//! 3. Merge `[original, attestation]` into a temporary file.
//! 4. Rename the temporary file over the signed copy.
//! 5. Remove the temporary file and the standalone attestation page.
//!
//! Any failure in steps 2-4 is logged and leaves the plain copy from step 1
//! as the deliverable.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use crate::error::CoreError;
use crate::types::Timestamp;

/// A4 portrait in PDF points.
const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Maximum page-tree depth followed when resolving inherited attributes.
const MAX_TREE_DEPTH: usize = 32;

/// Facts printed on the attestation page.
#[derive(Debug, Clone)]
pub struct Attestation {
    pub session_id: String,
    pub completed_at: Timestamp,
    pub signer_name: Option<String>,
}

/// Result of a stamping run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StampOutcome {
    /// The original was not on disk; nothing was produced.
    SourceMissing,
    /// `artifact` is a readable PDF. `enriched` tells whether it carries the
    /// attestation page or is a plain copy of the original.
    Produced { artifact: PathBuf, enriched: bool },
}

#[derive(Debug, thiserror::Error)]
enum EnrichError {
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed PDF: {0}")]
    Structure(&'static str),
    #[error("Stamping task failed: {0}")]
    Join(String),
}

/// Stamp `original` into `signed`, writing the temporary attestation page to
/// `attestation_path`.
///
/// Returns `Err` only when the guaranteed copy itself cannot be made.
pub async fn stamp(
    original: &Path,
    signed: &Path,
    attestation_path: &Path,
    attestation: &Attestation,
) -> Result<StampOutcome, CoreError> {
    if !tokio::fs::try_exists(original).await.unwrap_or(false) {
        tracing::warn!(path = %original.display(), "Source document missing, skipping stamp");
        return Ok(StampOutcome::SourceMissing);
    }

    tokio::fs::copy(original, signed)
        .await
        .map_err(|e| CoreError::Internal(format!("Failed to copy source document: {e}")))?;

    let merged_tmp = signed.with_extension("pdf.tmp");
    let result = enrich(original, signed, attestation_path, &merged_tmp, attestation).await;

    remove_quietly(&merged_tmp).await;
    remove_quietly(attestation_path).await;

    let enriched = match result {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(
                error = %e,
                session_id = %attestation.session_id,
                "Attestation page not appended, keeping unstamped copy"
            );
            false
        }
    };

    Ok(StampOutcome::Produced {
        artifact: signed.to_path_buf(),
        enriched,
    })
}

async fn enrich(
    original: &Path,
    signed: &Path,
    attestation_path: &Path,
    merged_tmp: &Path,
    attestation: &Attestation,
) -> Result<(), EnrichError> {
    let original = original.to_path_buf();
    let attestation_path = attestation_path.to_path_buf();
    let merged_tmp_owned = merged_tmp.to_path_buf();
    let attestation = attestation.clone();

    tokio::task::spawn_blocking(move || -> Result<(), EnrichError> {
        let mut page = render_attestation(&attestation)?;
        page.save(&attestation_path)?;

        let source = Document::load(&original)?;
        let page = Document::load(&attestation_path)?;
        let mut merged = merge(vec![source, page])?;
        merged.save(&merged_tmp_owned)?;
        Ok(())
    })
    .await
    .map_err(|e| EnrichError::Join(e.to_string()))??;

    tokio::fs::rename(merged_tmp, signed).await?;
    Ok(())
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::debug!(path = %path.display(), error = %e, "Failed to remove temporary file");
        }
    }
}

// ---------------------------------------------------------------------------
// Attestation page
// ---------------------------------------------------------------------------

/// Text lines of the attestation page.
pub fn attestation_lines(attestation: &Attestation) -> Vec<String> {
    let mut lines = vec![
        "Identity verification and signature attestation".to_string(),
        String::new(),
        format!(
            "Completed on: {}",
            attestation.completed_at.format("%d/%m/%Y %H:%M:%S UTC")
        ),
        format!("Session: {}", attestation.session_id),
    ];
    if let Some(name) = &attestation.signer_name {
        lines.push(format!("Signer: {name}"));
    }
    lines.push(String::new());
    lines.push(
        "The signer's identity was verified with an identity document and a selfie."
            .to_string(),
    );
    lines
}

fn render_attestation(attestation: &Attestation) -> Result<Document, EnrichError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 12.into()]),
        Operation::new("TL", vec![18.into()]),
        Operation::new("Td", vec![60.into(), 760.into()]),
    ];
    for line in attestation_lines(attestation) {
        operations.push(Operation::new(
            "Tj",
            vec![Object::string_literal(ascii_only(&line))],
        ));
        operations.push(Operation::new("T*", vec![]));
    }
    operations.push(Operation::new("ET", vec![]));

    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();
    Ok(doc)
}

/// Standard Type1 fonts only cover Latin-1 reliably; replace everything else.
fn ascii_only(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_ascii() { c } else { '?' })
        .collect()
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// Concatenate the pages of `documents`, in order, into one document.
fn merge(documents: Vec<Document>) -> Result<Document, EnrichError> {
    let mut max_id = 1;
    let mut pages: Vec<(ObjectId, Dictionary)> = Vec::new();
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for mut doc in documents {
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        for (_, page_id) in doc.get_pages() {
            let mut page = doc.get_dictionary(page_id)?.clone();
            flatten_inherited(&doc, &mut page);
            pages.push((page_id, page));
        }
        objects.extend(doc.objects);
    }

    if pages.is_empty() {
        return Err(EnrichError::Structure("no pages to merge"));
    }

    let mut merged = Document::with_version("1.5");
    for (id, object) in objects {
        match type_of(&object) {
            b"Catalog" | b"Pages" | b"Page" | b"Outlines" | b"Outline" => {}
            _ => {
                merged.objects.insert(id, object);
            }
        }
    }

    let pages_id: ObjectId = (max_id, 0);
    let catalog_id: ObjectId = (max_id + 1, 0);

    let kids: Vec<Object> = pages.iter().map(|(id, _)| Object::Reference(*id)).collect();
    let count = kids.len() as i64;
    for (id, mut page) in pages {
        page.set("Parent", pages_id);
        merged.objects.insert(id, Object::Dictionary(page));
    }
    merged.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    merged.objects.insert(
        catalog_id,
        Object::Dictionary(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        }),
    );
    merged.trailer.set("Root", catalog_id);
    merged.max_id = max_id + 1;
    merged.renumber_objects();
    merged.compress();
    Ok(merged)
}

/// Copy attributes the page inherits from its page-tree ancestors onto the
/// page itself, so it can be re-parented.
fn flatten_inherited(doc: &Document, page: &mut Dictionary) {
    for key in INHERITABLE_KEYS {
        if page.has(key) {
            continue;
        }
        let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
        let mut depth = 0;
        while let Some(node_id) = parent {
            depth += 1;
            if depth > MAX_TREE_DEPTH {
                break;
            }
            let Ok(node) = doc.get_dictionary(node_id) else {
                break;
            };
            if let Ok(value) = node.get(key) {
                page.set(key, value.clone());
                break;
            }
            parent = node.get(b"Parent").and_then(Object::as_reference).ok();
        }
    }
}

fn type_of(object: &Object) -> &[u8] {
    let dict = match object {
        Object::Dictionary(dict) => dict,
        Object::Stream(stream) => &stream.dict,
        _ => return b"",
    };
    dict.get(b"Type").and_then(Object::as_name).unwrap_or(b"")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};

    use super::*;

    fn attestation() -> Attestation {
        Attestation {
            session_id: "sig-abc-123".to_string(),
            completed_at: Utc.with_ymd_and_hms(2026, 10, 16, 14, 30, 5).unwrap(),
            signer_name: Some("Mario Rossi".to_string()),
        }
    }

    fn write_source_pdf(path: &Path, pages: usize) {
        let mut docs = Vec::new();
        for _ in 0..pages {
            docs.push(render_attestation(&attestation()).unwrap());
        }
        let mut doc = if docs.len() == 1 {
            docs.remove(0)
        } else {
            merge(docs).unwrap()
        };
        doc.save(path).unwrap();
    }

    #[test]
    fn attestation_lines_include_time_and_session() {
        let lines = attestation_lines(&attestation());
        assert!(lines.iter().any(|l| l == "Completed on: 16/10/2026 14:30:05 UTC"));
        assert!(lines.iter().any(|l| l == "Session: sig-abc-123"));
        assert!(lines.iter().any(|l| l == "Signer: Mario Rossi"));
    }

    #[test]
    fn merge_concatenates_pages_in_order() {
        let merged = merge(vec![
            render_attestation(&attestation()).unwrap(),
            render_attestation(&attestation()).unwrap(),
            render_attestation(&attestation()).unwrap(),
        ])
        .unwrap();
        assert_eq!(merged.get_pages().len(), 3);
    }

    #[tokio::test]
    async fn stamp_appends_attestation_page() {
        let dir = tempfile::tempdir().unwrap();
        let original = dir.path().join("contract.pdf");
        let signed = dir.path().join("signed_contract.pdf");
        let page = dir.path().join("attestation.pdf");
        write_source_pdf(&original, 2);

        let outcome = stamp(&original, &signed, &page, &attestation()).await.unwrap();

        assert_eq!(
            outcome,
            StampOutcome::Produced {
                artifact: signed.clone(),
                enriched: true
            }
        );
        assert_eq!(Document::load(&signed).unwrap().get_pages().len(), 3);
        assert_eq!(Document::load(&original).unwrap().get_pages().len(), 2);
        assert!(!page.exists(), "standalone attestation page must be removed");
        assert!(!signed.with_extension("pdf.tmp").exists());
    }

    #[tokio::test]
    async fn stamp_falls_back_to_plain_copy_for_unparseable_source() {
        let dir = tempfile::tempdir().unwrap();
        let original = dir.path().join("broken.pdf");
        let signed = dir.path().join("signed_broken.pdf");
        let page = dir.path().join("attestation.pdf");
        std::fs::write(&original, b"%PDF-1.4 definitely not a real pdf").unwrap();

        let outcome = stamp(&original, &signed, &page, &attestation()).await.unwrap();

        assert_matches!(outcome, StampOutcome::Produced { enriched: false, .. });
        assert_eq!(
            std::fs::read(&signed).unwrap(),
            b"%PDF-1.4 definitely not a real pdf"
        );
        assert!(!page.exists());
    }

    #[tokio::test]
    async fn stamp_is_a_no_op_when_source_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = stamp(
            &dir.path().join("missing.pdf"),
            &dir.path().join("signed.pdf"),
            &dir.path().join("attestation.pdf"),
            &attestation(),
        )
        .await
        .unwrap();

        assert_eq!(outcome, StampOutcome::SourceMissing);
        assert!(!dir.path().join("signed.pdf").exists());
    }
}
