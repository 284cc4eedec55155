//! Document attachment validation
//!
//! File candidates are checked against a MIME allow-list and a size limit
//! before they are admitted into a return's document set. Each file in a
//! batch is judged on its own; rejections are collected and reported together.

use anyhow::{Context, Result};
use std::fmt;
use std::path::Path;

use crate::models::{new_id, today, Document, DocumentKind};

/// Default upload limit in megabytes
pub const DEFAULT_MAX_UPLOAD_MB: u64 = 10;

/// MIME types accepted for upload
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "image/jpeg",
    "image/png",
    "image/gif",
];

/// A file offered for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    pub name: String,
    /// Empty when the type could not be determined
    pub mime_type: String,
    pub size_bytes: u64,
}

impl FileCandidate {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size_bytes,
        }
    }

    /// Builds a candidate from a file on disk, taking the MIME type from the extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let metadata = std::fs::metadata(path)
            .with_context(|| format!("Failed to read file metadata: {:?}", path))?;
        if !metadata.is_file() {
            anyhow::bail!("Not a regular file: {:?}", path);
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime_type = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(mime_type_for_extension)
            .unwrap_or_default();

        Ok(Self::new(name, mime_type, metadata.len()))
    }
}

/// Maps a file extension to the MIME type a browser would report for it
pub fn mime_type_for_extension(ext: &str) -> Option<&'static str> {
    match ext.to_lowercase().as_str() {
        "pdf" => Some("application/pdf"),
        "doc" => Some("application/msword"),
        "docx" => Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "txt" => Some("text/plain"),
        "csv" => Some("text/csv"),
        "zip" => Some("application/zip"),
        _ => None,
    }
}

/// Classifies an allowed MIME type by substring
pub fn classify(mime_type: &str) -> DocumentKind {
    if mime_type.contains("pdf") {
        DocumentKind::Pdf
    } else if mime_type.contains("word") || mime_type.contains("document") {
        DocumentKind::Docx
    } else {
        DocumentKind::Image
    }
}

/// Rule a candidate violated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    InvalidType,
    TooLarge { max_mb: u64 },
}

/// A candidate that was not admitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub file_name: String,
    pub reason: RejectionReason,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason {
            RejectionReason::InvalidType => write!(f, "{}: Invalid file type", self.file_name),
            RejectionReason::TooLarge { max_mb } => {
                write!(f, "{}: File too large (max {}MB)", self.file_name, max_mb)
            }
        }
    }
}

impl std::error::Error for Rejection {}

/// Result of validating several candidates at once
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub accepted: Vec<Document>,
    pub rejected: Vec<Rejection>,
}

impl BatchOutcome {
    /// All rejection reasons joined into one message, or `None` if every file passed
    pub fn error_message(&self) -> Option<String> {
        if self.rejected.is_empty() {
            return None;
        }
        Some(
            self.rejected
                .iter()
                .map(|r| r.to_string())
                .collect::<Vec<_>>()
                .join(", "),
        )
    }
}

/// Allow-list and size limit applied to uploads
#[derive(Debug, Clone)]
pub struct AttachmentPolicy {
    allowed_mime_types: Vec<String>,
    max_size_mb: u64,
}

impl Default for AttachmentPolicy {
    fn default() -> Self {
        Self::with_max_size_mb(DEFAULT_MAX_UPLOAD_MB)
    }
}

impl AttachmentPolicy {
    pub fn with_max_size_mb(max_size_mb: u64) -> Self {
        Self {
            allowed_mime_types: ALLOWED_MIME_TYPES.iter().map(|s| s.to_string()).collect(),
            max_size_mb,
        }
    }

    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_mb.saturating_mul(1024 * 1024)
    }

    pub fn is_allowed_type(&self, mime_type: &str) -> bool {
        self.allowed_mime_types.iter().any(|t| t == mime_type)
    }

    /// Admits a single candidate or says why not
    pub fn accept(&self, file: &FileCandidate) -> Result<Document, Rejection> {
        if !self.is_allowed_type(&file.mime_type) {
            return Err(Rejection {
                file_name: file.name.clone(),
                reason: RejectionReason::InvalidType,
            });
        }

        if file.size_bytes > self.max_size_bytes() {
            return Err(Rejection {
                file_name: file.name.clone(),
                reason: RejectionReason::TooLarge {
                    max_mb: self.max_size_mb,
                },
            });
        }

        Ok(Document {
            id: new_id(),
            name: file.name.clone(),
            kind: classify(&file.mime_type),
            size_bytes: file.size_bytes,
            upload_date: today(),
            comments: String::new(),
        })
    }

    /// Validates every candidate independently
    pub fn accept_batch<'f, I>(&self, files: I) -> BatchOutcome
    where
        I: IntoIterator<Item = &'f FileCandidate>,
    {
        let mut outcome = BatchOutcome::default();
        for file in files {
            match self.accept(file) {
                Ok(doc) => outcome.accepted.push(doc),
                Err(rejection) => outcome.rejected.push(rejection),
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MB: u64 = 1024 * 1024;

    #[test]
    fn test_mime_to_kind_mapping() {
        let policy = AttachmentPolicy::default();
        let cases = [
            ("application/pdf", DocumentKind::Pdf),
            ("application/msword", DocumentKind::Docx),
            (
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
                DocumentKind::Docx,
            ),
            ("image/jpeg", DocumentKind::Image),
            ("image/png", DocumentKind::Image),
            ("image/gif", DocumentKind::Image),
        ];

        for (mime, kind) in cases {
            let doc = policy
                .accept(&FileCandidate::new("f", mime, 1024))
                .unwrap();
            assert_eq!(doc.kind, kind, "{}", mime);
            assert_eq!(doc.size_bytes, 1024);
            assert_eq!(doc.upload_date, today());
            assert!(doc.comments.is_empty());
        }
    }

    #[test]
    fn test_rejects_disallowed_and_missing_type() {
        let policy = AttachmentPolicy::default();
        let err = policy
            .accept(&FileCandidate::new("notes.txt", "text/plain", 10))
            .unwrap_err();
        assert_eq!(err.to_string(), "notes.txt: Invalid file type");

        let err = policy.accept(&FileCandidate::new("blob", "", 10)).unwrap_err();
        assert_eq!(err.reason, RejectionReason::InvalidType);
    }

    #[test]
    fn test_size_limit_is_inclusive() {
        let policy = AttachmentPolicy::default();
        assert!(policy
            .accept(&FileCandidate::new("exact.pdf", "application/pdf", 10 * MB))
            .is_ok());

        let err = policy
            .accept(&FileCandidate::new("big.pdf", "application/pdf", 10 * MB + 1))
            .unwrap_err();
        assert_eq!(err.to_string(), "big.pdf: File too large (max 10MB)");
    }

    #[test]
    fn test_batch_rejections_do_not_block_siblings() {
        let policy = AttachmentPolicy::default();
        let files = vec![
            FileCandidate::new("w2.pdf", "application/pdf", MB),
            FileCandidate::new("virus.exe", "application/x-msdownload", MB),
            FileCandidate::new("scan.png", "image/png", 2 * MB),
            FileCandidate::new("huge.gif", "image/gif", 50 * MB),
        ];

        let outcome = policy.accept_batch(&files);
        let names: Vec<_> = outcome.accepted.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["w2.pdf", "scan.png"]);
        assert_ne!(outcome.accepted[0].id, outcome.accepted[1].id);
        assert_eq!(
            outcome.error_message().as_deref(),
            Some("virus.exe: Invalid file type, huge.gif: File too large (max 10MB)")
        );
    }

    #[test]
    fn test_clean_batch_has_no_message() {
        let policy = AttachmentPolicy::default();
        let files = [FileCandidate::new("a.pdf", "application/pdf", 1)];
        assert!(policy.accept_batch(&files).error_message().is_none());
    }

    #[test]
    fn test_custom_limit() {
        let policy = AttachmentPolicy::with_max_size_mb(1);
        let err = policy
            .accept(&FileCandidate::new("a.pdf", "application/pdf", 2 * MB))
            .unwrap_err();
        assert_eq!(err.reason, RejectionReason::TooLarge { max_mb: 1 });
    }

    #[test]
    fn test_candidate_from_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("Receipt.JPG");
        std::fs::write(&path, vec![0u8; 300]).unwrap();

        let candidate = FileCandidate::from_path(&path).unwrap();
        assert_eq!(candidate.name, "Receipt.JPG");
        assert_eq!(candidate.mime_type, "image/jpeg");
        assert_eq!(candidate.size_bytes, 300);

        let unknown = temp_dir.path().join("data.bin");
        std::fs::write(&unknown, b"x").unwrap();
        assert_eq!(FileCandidate::from_path(&unknown).unwrap().mime_type, "");

        assert!(FileCandidate::from_path(temp_dir.path()).is_err());
    }
}
