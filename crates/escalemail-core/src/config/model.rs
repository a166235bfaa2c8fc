//! Configuration data model.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Placeholder token replaced with the stopover code when rendering
/// templates.
pub const TEMPLATE_PLACEHOLDER: &str = "{{stopover_code}}";

/// Default subject template used when none is configured.
pub const DEFAULT_SUBJECT: &str = "Rapport d’escale - {{stopover_code}}";

/// Default body template used when none is configured.
pub const DEFAULT_BODY: &str = "Bonjour,

Veuillez trouver en pièce jointe le rapport d’escale pour {{stopover_code}}.

Cordialement,
Escalemail";

/// Current schema revision of the persisted file.
pub const SCHEMA_VERSION: u32 = 1;

/// Subject and body templates, both may contain
/// [`TEMPLATE_PLACEHOLDER`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Templates {
    /// Subject template.
    #[serde(default)]
    pub subject: String,
    /// Body template.
    #[serde(default)]
    pub body: String,
}

impl Templates {
    /// Return `(subject, body)` with defaults applied for empty fields.
    ///
    /// Pure accessor; the persisted configuration is not changed.
    #[must_use]
    pub fn effective(&self) -> (String, String) {
        let subject = if self.subject.is_empty() {
            DEFAULT_SUBJECT.to_string()
        } else {
            self.subject.clone()
        };
        let body = if self.body.is_empty() {
            DEFAULT_BODY.to_string()
        } else {
            self.body.clone()
        };
        (subject, body)
    }
}

/// Substitute the stopover code into a template string.
#[must_use]
pub fn render_template(template: &str, code: &str) -> String {
    template.replace(TEMPLATE_PLACEHOLDER, code)
}

/// The single persisted configuration aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    /// Schema revision.
    pub version: u32,
    /// Enabled stopover codes, in display order.
    #[serde(default)]
    pub stopovers: Vec<String>,
    /// Stopover code to encoded recipient list.
    #[serde(default)]
    pub mappings: BTreeMap<String, Vec<String>>,
    /// Subject and body templates.
    #[serde(default)]
    pub templates: Templates,
    /// Stopover code to ISO-8601 UTC timestamp of last send.
    #[serde(default)]
    pub last_sent: BTreeMap<String, String>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            version: SCHEMA_VERSION,
            stopovers: Vec::new(),
            mappings: BTreeMap::new(),
            templates: Templates::default(),
            last_sent: BTreeMap::new(),
        }
    }
}

impl Configuration {
    /// Build a configuration from raw JSON, enforcing schema and types.
    ///
    /// Deprecated or unknown keys are dropped. Mapping values that are a
    /// single string are coerced to one-element lists; non-string list
    /// entries and non-string last-sent values are discarded. Missing
    /// sections fall back to defaults.
    #[must_use]
    pub fn sanitize(raw: &Value) -> Self {
        let mut cfg = Self::default();
        let Some(obj) = raw.as_object() else {
            return cfg;
        };

        if let Some(version) = obj.get("version").and_then(Value::as_u64) {
            cfg.version = u32::try_from(version).unwrap_or(SCHEMA_VERSION);
        }

        if let Some(stopovers) = obj.get("stopovers").and_then(Value::as_array) {
            cfg.stopovers = stopovers.iter().filter_map(coerce_string).collect();
        }

        if let Some(mappings) = obj.get("mappings").and_then(Value::as_object) {
            for (key, value) in mappings {
                cfg.mappings.insert(key.clone(), coerce_string_list(value));
            }
        }

        if let Some(templates) = obj.get("templates").and_then(Value::as_object) {
            if let Some(subject) = templates.get("subject").and_then(coerce_string) {
                cfg.templates.subject = subject;
            }
            if let Some(body) = templates.get("body").and_then(coerce_string) {
                cfg.templates.body = body;
            }
        }

        if let Some(last_sent) = obj.get("last_sent").and_then(Value::as_object) {
            for (key, value) in last_sent {
                if let Some(ts) = value.as_str() {
                    cfg.last_sent.insert(key.clone(), ts.to_string());
                }
            }
        }

        cfg
    }
}

/// Accept strings and integers as strings, reject everything else.
fn coerce_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Accept a list of strings or a lone string as a recipient list.
fn coerce_string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(coerce_string).collect(),
        Value::String(s) => vec![s.clone()],
        _ => Vec::new(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sanitize_coerces_loose_shapes() {
        let raw = json!({
            "version": 1,
            "stopovers": ["ABJ", 123, {"nested": true}],
            "mappings": {
                "ABJ": ["a@x.com", 7, null],
                "DKR": "solo@x.com",
                "NDJ": {"not": "a list"}
            },
            "templates": {"subject": "S", "body": 42},
            "last_sent": {"ABJ": "2025-07-31T10:22:45Z", "DKR": 12},
            "check_vars": "deprecated"
        });

        let cfg = Configuration::sanitize(&raw);
        assert_eq!(cfg.stopovers, vec!["ABJ", "123"]);
        assert_eq!(cfg.mappings["ABJ"], vec!["a@x.com", "7"]);
        assert_eq!(cfg.mappings["DKR"], vec!["solo@x.com"]);
        assert!(cfg.mappings["NDJ"].is_empty());
        assert_eq!(cfg.templates.subject, "S");
        assert_eq!(cfg.templates.body, "42");
        assert_eq!(cfg.last_sent.len(), 1);
        assert_eq!(cfg.last_sent["ABJ"], "2025-07-31T10:22:45Z");
    }

    #[test]
    fn test_sanitize_non_object_yields_default() {
        assert_eq!(Configuration::sanitize(&json!([1, 2])), Configuration::default());
        assert_eq!(Configuration::sanitize(&json!("nope")), Configuration::default());
    }

    #[test]
    fn test_serde_roundtrip() {
        let mut cfg = Configuration::default();
        cfg.stopovers = vec!["ABJ".to_string(), "DKR".to_string()];
        cfg.mappings
            .insert("ABJ".to_string(), vec!["a@x.com".to_string()]);
        cfg.templates.subject = "Subject {{stopover_code}}".to_string();
        cfg.last_sent
            .insert("ABJ".to_string(), "2025-07-31T10:22:45Z".to_string());

        let text = serde_json::to_string_pretty(&cfg).unwrap();
        let back: Configuration = serde_json::from_str(&text).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn test_effective_templates_fall_back_to_defaults() {
        let templates = Templates::default();
        let (subject, body) = templates.effective();
        assert_eq!(subject, DEFAULT_SUBJECT);
        assert_eq!(body, DEFAULT_BODY);

        let templates = Templates {
            subject: "Custom".to_string(),
            body: String::new(),
        };
        let (subject, body) = templates.effective();
        assert_eq!(subject, "Custom");
        assert_eq!(body, DEFAULT_BODY);
    }

    #[test]
    fn test_render_template() {
        assert_eq!(
            render_template("Rapport d’escale - {{stopover_code}}", "ABJ"),
            "Rapport d’escale - ABJ"
        );
        assert_eq!(render_template("no placeholder", "ABJ"), "no placeholder");
    }
}
