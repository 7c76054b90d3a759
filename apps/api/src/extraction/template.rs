use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::extraction::prompts::EXTRACTION_PROMPT;
use crate::llm_client::prompts::NO_FABRICATION_INSTRUCTION;

const BUILTIN_TEMPLATE: &str = include_str!("../../assets/resume_template.json");

/// The JSON shape the model is asked to fill in.
#[derive(Debug, Clone)]
pub struct ResumeTemplate {
    schema: Value,
}

impl ResumeTemplate {
    pub fn builtin() -> Result<Self> {
        Self::parse(BUILTIN_TEMPLATE).context("built-in résumé template is not valid JSON")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read template {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("template {} is not valid JSON", path.display()))
    }

    /// Loads the override at `path` if one is configured, else the built-in template.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Self::builtin(),
        }
    }

    fn parse(raw: &str) -> Result<Self> {
        let schema: Value = serde_json::from_str(raw)?;
        if !schema.is_object() {
            anyhow::bail!("template must be a JSON object");
        }
        Ok(Self { schema })
    }

    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// Renders the extraction prompt with this template embedded.
    pub fn build_prompt(&self) -> String {
        let pretty = serde_json::to_string_pretty(&self.schema).unwrap_or_default();
        EXTRACTION_PROMPT
            .replace("{template}", &pretty)
            .replace("{no_fabrication}", NO_FABRICATION_INSTRUCTION)
    }
}
