// Résumé extraction prompt templates.
// All prompts for the extraction module are defined here.

pub const EXTRACTION_SYSTEM: &str = "\
You are an expert in résumé data extraction and JSON formatting. \
You read the attached résumé document and fill in a JSON template with its contents.";

pub const EXTRACTION_PROMPT: &str = r#"Extract the résumé data from the attached document and format it EXACTLY as the JSON template below. Comply strictly with its structure, accuracy and completeness.

JSON TEMPLATE:
{template}

GUIDELINES:
1. Keep every key of the template, spelled exactly as given. Do not add keys.
2. Extract and map City, State, Country and Zipcode, and split combined address lines into their fields.
3. Extract ALL experience entries, certificates and visas. Never truncate a list.
4. Dates keep the format used in the document unless the template shows a format.
5. {no_fabrication}
6. Return ONLY the JSON object, nothing else, no code fences."#;
