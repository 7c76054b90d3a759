// Résumé extraction.
// Implements: template prompt, model output cleanup, key remapping, the pipeline and its handler.
// All model calls go through llm_client; all document conversion goes through convert.

pub mod cleanup;
pub mod handlers;
pub mod pipeline;
pub mod prompts;
pub mod remap;
pub mod template;

pub use pipeline::ResumeExtractor;
pub use remap::{KeyMapping, RemapScope};
pub use template::ResumeTemplate;
