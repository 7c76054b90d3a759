//! Document conversion: everything the model sees is a PDF.
//!
//! Word documents are converted through external CLIs (`soffice` for legacy
//! `.doc`, `pandoc` for `.docx`). Converted files live in a scratch directory
//! owned by the returned [`ConvertedDocument`] and vanish when it is dropped.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::TempDir;
use thiserror::Error;

pub mod cli;

pub use cli::CliConverter;

/// Input formats accepted by the extraction pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Doc,
    Docx,
}

#[derive(Debug, Error)]
#[error("Only PDF and Word documents are allowed (got '{0}')")]
pub struct UnsupportedFormat(pub String);

impl DocumentKind {
    /// Detects the document kind from the file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self, UnsupportedFormat> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "pdf" => Ok(Self::Pdf),
            "doc" => Ok(Self::Doc),
            "docx" => Ok(Self::Docx),
            _ => Err(UnsupportedFormat(
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            )),
        }
    }

    pub fn needs_conversion(self) -> bool {
        !matches!(self, Self::Pdf)
    }
}

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("'{program}' did not finish within {secs}s")]
    Timeout { program: String, secs: u64 },

    #[error("conversion output not found: {0}")]
    MissingOutput(PathBuf),

    #[error("scratch directory error: {0}")]
    Io(#[from] std::io::Error),
}

/// A PDF ready for upload.
///
/// Holds the scratch directory (if any) so intermediate files outlive the
/// model call and are removed afterwards.
#[derive(Debug)]
pub struct ConvertedDocument {
    path: PathBuf,
    _workdir: Option<TempDir>,
}

impl ConvertedDocument {
    /// Wraps a file that is already a PDF. Nothing is cleaned up on drop.
    pub fn passthrough(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _workdir: None,
        }
    }

    pub fn in_workdir(path: PathBuf, workdir: TempDir) -> Self {
        Self {
            path,
            _workdir: Some(workdir),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Converts an input document into a PDF.
#[async_trait]
pub trait DocumentConverter: Send + Sync {
    async fn to_pdf(
        &self,
        source: &Path,
        kind: DocumentKind,
    ) -> Result<ConvertedDocument, ConversionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_supported_extensions() {
        assert_eq!(
            DocumentKind::from_path(Path::new("/tmp/cv.pdf")).unwrap(),
            DocumentKind::Pdf
        );
        assert_eq!(
            DocumentKind::from_path(Path::new("resume.doc")).unwrap(),
            DocumentKind::Doc
        );
        assert_eq!(
            DocumentKind::from_path(Path::new("resume.docx")).unwrap(),
            DocumentKind::Docx
        );
    }

    #[test]
    fn test_kind_is_case_insensitive() {
        assert_eq!(
            DocumentKind::from_path(Path::new("CV.PDF")).unwrap(),
            DocumentKind::Pdf
        );
        assert_eq!(
            DocumentKind::from_path(Path::new("CV.DocX")).unwrap(),
            DocumentKind::Docx
        );
    }

    #[test]
    fn test_unsupported_extensions_rejected() {
        for name in ["cv.txt", "cv.odt", "cv.pdf.exe", "cv", "docx", "cv.png"] {
            let err = DocumentKind::from_path(Path::new(name)).unwrap_err();
            assert!(err.to_string().starts_with("Only PDF and Word documents"));
        }
    }

    #[test]
    fn test_only_pdf_skips_conversion() {
        assert!(!DocumentKind::Pdf.needs_conversion());
        assert!(DocumentKind::Doc.needs_conversion());
        assert!(DocumentKind::Docx.needs_conversion());
    }

    #[test]
    fn test_converted_document_removes_workdir_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("converted.pdf");
        std::fs::write(&pdf, b"%PDF-1.4").unwrap();
        let dir_path = dir.path().to_path_buf();

        let doc = ConvertedDocument::in_workdir(pdf.clone(), dir);
        assert!(doc.path().exists());
        drop(doc);
        assert!(!dir_path.exists());
    }

    #[test]
    fn test_passthrough_keeps_source() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("cv.pdf");
        std::fs::write(&pdf, b"%PDF-1.4").unwrap();

        drop(ConvertedDocument::passthrough(&pdf));
        assert!(pdf.exists());
    }
}
