//! Turns raw model text into JSON.
//!
//! Models occasionally wrap their answer in code fences or answer with a
//! Python-style literal (`'key': None`). A strict parse is always tried first;
//! the literal rewrite only runs when that fails.

use serde_json::Value;
use tracing::{debug, warn};

/// Strips ```json ... ``` or ``` ... ``` code fences, or a bare leading
/// `json` tag, from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let inner = if let Some(rest) = text.strip_prefix("```") {
        let rest = rest
            .strip_prefix("json")
            .or_else(|| rest.strip_prefix("JSON"))
            .unwrap_or(rest);
        let rest = rest.trim_start();
        rest.strip_suffix("```").unwrap_or(rest)
    } else {
        text
    };

    let inner = inner.trim();
    match inner.strip_prefix("json") {
        Some(rest) if rest.trim_start().starts_with(['{', '[']) => rest.trim_start(),
        _ => inner,
    }
}

/// Rewrites a Python literal into JSON: single-quoted strings become
/// double-quoted, bare `None`/`True`/`False` become `null`/`true`/`false`.
/// Text inside strings is never touched.
pub fn normalize_python_literals(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                out.push('"');
                while let Some(c) = chars.next() {
                    out.push(c);
                    match c {
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                out.push(escaped);
                            }
                        }
                        '"' => break,
                        _ => {}
                    }
                }
            }
            '\'' => {
                out.push('"');
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => match chars.next() {
                            Some('\'') => out.push('\''),
                            Some(escaped) => {
                                out.push('\\');
                                out.push(escaped);
                            }
                            None => out.push('\\'),
                        },
                        '\'' => break,
                        '"' => out.push_str("\\\""),
                        _ => out.push(c),
                    }
                }
                out.push('"');
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut word = String::from(c);
                while let Some(&next) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' {
                        word.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                out.push_str(match word.as_str() {
                    "None" => "null",
                    "True" => "true",
                    "False" => "false",
                    other => other,
                });
            }
            _ => out.push(c),
        }
    }

    out
}

/// Parses model output into JSON. Returns `None` (after logging) when the
/// output cannot be parsed even after cleanup.
pub fn parse_model_output(text: &str) -> Option<Value> {
    let stripped = strip_json_fences(text);

    let strict_err = match serde_json::from_str::<Value>(stripped) {
        Ok(value) => return Some(value),
        Err(e) => e,
    };

    match serde_json::from_str::<Value>(&normalize_python_literals(stripped)) {
        Ok(value) => {
            debug!("Model output parsed after literal normalization ({strict_err})");
            Some(value)
        }
        Err(e) => {
            warn!("Error parsing JSON from model output: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_bare_json_tag() {
        assert_eq!(strip_json_fences("\njson\n{\"a\": 1}\n"), "{\"a\": 1}");
        assert_eq!(strip_json_fences("jsonish"), "jsonish");
    }

    #[test]
    fn test_strip_unterminated_fence() {
        assert_eq!(strip_json_fences("```json\n[1, 2]"), "[1, 2]");
    }

    #[test]
    fn test_normalize_python_dict() {
        let input = "{'name': 'Ada', 'visa': None, 'current': True, 'remote': False}";
        assert_eq!(
            normalize_python_literals(input),
            r#"{"name": "Ada", "visa": null, "current": true, "remote": false}"#
        );
    }

    #[test]
    fn test_normalize_leaves_string_contents_alone() {
        let input = r#"{"summary": "None of the 'above'", 'city': "O'Fallon"}"#;
        assert_eq!(
            normalize_python_literals(input),
            r#"{"summary": "None of the 'above'", "city": "O'Fallon"}"#
        );
    }

    #[test]
    fn test_normalize_escapes_inner_double_quotes() {
        let input = r#"{'title': 'The "Best" Engineer', 'note': 'it\'s'}"#;
        let value: Value = serde_json::from_str(&normalize_python_literals(input)).unwrap();
        assert_eq!(value["title"], "The \"Best\" Engineer");
        assert_eq!(value["note"], "it's");
    }

    #[test]
    fn test_normalize_keeps_numbers_and_identifiers() {
        assert_eq!(normalize_python_literals("[1e5, NoneType]"), "[1e5, NoneType]");
    }

    #[test]
    fn test_parse_valid_json_untouched() {
        // An apostrophe in a valid document must survive.
        let value = parse_model_output(r#"{"name": "Sinéad O'Connor"}"#).unwrap();
        assert_eq!(value, json!({"name": "Sinéad O'Connor"}));
    }

    #[test]
    fn test_parse_fenced_python_literal() {
        let value = parse_model_output("```json\n{'skills': ['Rust', 'SQL'], 'visa': None}\n```")
            .unwrap();
        assert_eq!(value, json!({"skills": ["Rust", "SQL"], "visa": null}));
    }

    #[test]
    fn test_parse_garbage_is_swallowed() {
        assert!(parse_model_output("Sorry, I cannot read this document.").is_none());
        assert!(parse_model_output("").is_none());
        assert!(parse_model_output("{\"truncated\": [1, 2").is_none());
    }
}
