//! Résumé extraction pipeline:
//! kind check → PDF conversion → model call → cleanup/parse → key remap.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::convert::{DocumentConverter, DocumentKind};
use crate::errors::AppError;
use crate::extraction::cleanup::parse_model_output;
use crate::extraction::prompts::EXTRACTION_SYSTEM;
use crate::extraction::remap::{remap, KeyMapping, RemapScope};
use crate::extraction::template::ResumeTemplate;
use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::DocumentModel;

/// Result of one extraction. `Empty` means the model gave no answer or one
/// that could not be parsed; callers get an empty result rather than an error.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome {
    Extracted(Value),
    Empty,
}

impl ExtractionOutcome {
    /// Serializes the outcome, with 4-space indentation when `pretty`.
    pub fn render(&self, pretty: bool) -> String {
        match self {
            Self::Extracted(value) => render_value(value, pretty),
            Self::Empty => render_value(&Value::Null, pretty),
        }
    }
}

fn render_value(value: &Value, pretty: bool) -> String {
    if !pretty {
        return value.to_string();
    }

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    match value.serialize(&mut ser) {
        Ok(()) => String::from_utf8(buf).unwrap_or_else(|_| value.to_string()),
        Err(_) => value.to_string(),
    }
}

/// Owns everything one extraction needs. Shared across requests behind an `Arc`.
pub struct ResumeExtractor {
    converter: Arc<dyn DocumentConverter>,
    model: Arc<dyn DocumentModel>,
    prompt: String,
    system: String,
    mapping: KeyMapping,
    scope: RemapScope,
}

impl ResumeExtractor {
    pub fn new(
        converter: Arc<dyn DocumentConverter>,
        model: Arc<dyn DocumentModel>,
        template: &ResumeTemplate,
        mapping: KeyMapping,
        scope: RemapScope,
    ) -> Self {
        Self {
            converter,
            model,
            prompt: template.build_prompt(),
            system: format!("{EXTRACTION_SYSTEM} {JSON_ONLY_SYSTEM}"),
            mapping,
            scope,
        }
    }

    /// Runs the full pipeline on the document at `path`.
    pub async fn extract(&self, path: &Path) -> Result<ExtractionOutcome, AppError> {
        let kind = DocumentKind::from_path(path)?;
        info!("Processing {:?} document {}", kind, path.display());

        let pdf = self.converter.to_pdf(path, kind).await?;

        let Some(text) = self
            .model
            .extract(&self.prompt, &self.system, pdf.path())
            .await
            .map_err(|e| AppError::Llm(format!("Résumé upload failed: {e}")))?
        else {
            return Ok(ExtractionOutcome::Empty);
        };

        let Some(parsed) = parse_model_output(&text) else {
            warn!(
                "Discarding unparseable model output for {} ({} chars)",
                path.display(),
                text.len()
            );
            return Ok(ExtractionOutcome::Empty);
        };

        Ok(ExtractionOutcome::Extracted(remap(
            parsed,
            &self.mapping,
            self.scope,
        )))
    }
}
