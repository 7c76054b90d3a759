// Shared prompt fragments.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting pieces only.

/// System instruction that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Use double quotes for every key and string, and null for missing values. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Appended to extraction prompts so the model never invents content.
pub const NO_FABRICATION_INSTRUCTION: &str = "\
    Only use information present in the attached document. \
    If a field is not present, set it to null (or an empty list for list fields). \
    Do NOT guess, infer, or invent details.";
