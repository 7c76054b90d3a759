use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{Map, Value};

const BUILTIN_MAPPING: &str = include_str!("../../assets/key_mapping.json");

/// Static `template field name → output field name` dictionary.
#[derive(Debug, Clone, Default)]
pub struct KeyMapping {
    names: HashMap<String, String>,
}

/// What the remapper rewrites besides object keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemapScope {
    #[default]
    Keys,
    /// Also rewrites string leaves that exactly equal a mapped name.
    KeysAndStrings,
}

impl KeyMapping {
    pub fn builtin() -> Result<Self> {
        Self::parse(BUILTIN_MAPPING).context("built-in key mapping is not valid")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read key mapping {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("key mapping {} is not valid", path.display()))
    }

    /// Loads the override at `path` if one is configured, else the built-in mapping.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Self::builtin(),
        }
    }

    fn parse(raw: &str) -> Result<Self> {
        let names: HashMap<String, String> =
            serde_json::from_str(raw).context("expected a JSON object of string to string")?;
        Ok(Self { names })
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.names.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    fn rename(&self, name: String) -> String {
        self.get(&name).map(str::to_string).unwrap_or(name)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for KeyMapping {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            names: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Walks any JSON value and substitutes mapped names. Arrays, nested objects
/// and key order are preserved. If two keys map to the same name, the later
/// one wins.
pub fn remap(value: Value, mapping: &KeyMapping, scope: RemapScope) -> Value {
    match value {
        Value::Object(fields) => {
            let mut renamed = Map::with_capacity(fields.len());
            for (key, child) in fields {
                renamed.insert(mapping.rename(key), remap(child, mapping, scope));
            }
            Value::Object(renamed)
        }
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| remap(item, mapping, scope))
                .collect(),
        ),
        Value::String(s) if scope == RemapScope::KeysAndStrings => {
            Value::String(mapping.rename(s))
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn remap_keys(value: Value, mapping: &KeyMapping) -> Value {
        remap(value, mapping, RemapScope::Keys)
    }

    fn mapping() -> KeyMapping {
        [
            ("first_name", "FirstName"),
            ("city", "City"),
            ("experience", "WorkExperience"),
            ("job_title", "Designation"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_remaps_top_level_and_nested_keys() {
        let input = json!({
            "first_name": "Ada",
            "address": {"city": "London", "zipcode": "N1"},
            "experience": [
                {"job_title": "Engineer", "city": "Paris"},
                {"job_title": "Analyst", "city": null}
            ]
        });

        let out = remap_keys(input, &mapping());

        assert_eq!(
            out,
            json!({
                "FirstName": "Ada",
                "address": {"City": "London", "zipcode": "N1"},
                "WorkExperience": [
                    {"Designation": "Engineer", "City": "Paris"},
                    {"Designation": "Analyst", "City": null}
                ]
            })
        );
    }

    #[test]
    fn test_key_order_is_preserved() {
        let input = json!({"zeta": 1, "first_name": "Ada", "alpha": 2});
        let out = remap_keys(input, &mapping());
        let keys: Vec<&str> = out.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, ["zeta", "FirstName", "alpha"]);
    }

    #[test]
    fn test_string_values_untouched_by_default() {
        let out = remap_keys(json!({"role": "job_title"}), &mapping());
        assert_eq!(out, json!({"role": "job_title"}));
    }

    #[test]
    fn test_string_values_remapped_when_requested() {
        let out = remap(
            json!({"fields": ["city", "first_name", "other"], "n": 3}),
            &mapping(),
            RemapScope::KeysAndStrings,
        );
        assert_eq!(out, json!({"fields": ["City", "FirstName", "other"], "n": 3}));
    }

    #[test]
    fn test_scalars_and_empty_containers_pass_through() {
        let m = mapping();
        for value in [json!(null), json!(42), json!(true), json!("city"), json!([]), json!({})] {
            assert_eq!(remap_keys(value.clone(), &m), value);
        }
    }

    #[test]
    fn test_colliding_keys_later_wins() {
        let m: KeyMapping = [("a", "X"), ("b", "X")].into_iter().collect();
        let out = remap_keys(json!({"a": 1, "b": 2}), &m);
        assert_eq!(out, json!({"X": 2}));
    }

    #[test]
    fn test_empty_mapping_is_identity() {
        let input = json!({"first_name": "Ada", "experience": [{"job_title": "x"}]});
        assert_eq!(remap_keys(input.clone(), &KeyMapping::default()), input);
    }

    #[test]
    fn test_builtin_mapping_covers_template_keys() {
        let m = KeyMapping::builtin().unwrap();
        assert!(!m.is_empty());
        assert_eq!(m.get("zipcode"), Some("ZipCode"));
        assert_eq!(m.get("visas"), Some("Visas"));
        assert_eq!(m.get("not_a_field"), None);
    }

    #[test]
    fn test_mapping_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"email": "EmailAddress"}}"#).unwrap();
        let m = KeyMapping::load(Some(file.path())).unwrap();
        assert_eq!(m.len(), 1);
        assert_eq!(m.get("email"), Some("EmailAddress"));
    }

    #[test]
    fn test_mapping_rejects_non_string_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"email": 1}}"#).unwrap();
        assert!(KeyMapping::from_file(file.path()).is_err());
    }
}
