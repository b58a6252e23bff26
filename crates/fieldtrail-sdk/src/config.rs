use std::path::Path;

use fieldtrail_types::{
    parse_context_rule, parse_field_specs, validate_field_specs, ConfigError, ConfigResult,
    ContextRule, FieldSpec,
};
use serde::Deserialize;
use serde_json::Value as Json;

use crate::error::{SdkError, SdkResult};

/// Default path of the document identifier.
pub const DEFAULT_ID_PATH: &str = "_id";

/// Setup for one audited collection.
///
/// Loaded from TOML:
///
/// ```toml
/// subject = "orders"
/// id_path = "_id"
/// capture_whole_document = true
/// compress = true
/// context = { document = ["tenant"] }
///
/// [[fields]]
/// path = "status"
///
/// [[fields]]
/// path = "items"
/// array_kind = "keyed"
/// array_key = "sku"
/// children = [{ path = "qty" }]
/// ```
#[derive(Clone, Debug)]
pub struct AuditorConfig {
    pub subject: String,
    pub id_path: String,
    pub capture_whole_document: bool,
    pub compress: bool,
    /// Entry-level context captured from the whole document.
    pub context: Option<ContextRule>,
    pub fields: Vec<FieldSpec>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    subject: String,
    #[serde(default = "default_id_path")]
    id_path: String,
    #[serde(default)]
    capture_whole_document: bool,
    #[serde(default)]
    compress: bool,
    #[serde(default)]
    context: Option<Json>,
    #[serde(default)]
    fields: Vec<Json>,
}

fn default_id_path() -> String {
    DEFAULT_ID_PATH.to_string()
}

impl AuditorConfig {
    pub fn new(subject: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        Self {
            subject: subject.into(),
            id_path: default_id_path(),
            capture_whole_document: false,
            compress: false,
            context: None,
            fields,
        }
    }

    pub fn with_id_path(mut self, path: impl Into<String>) -> Self {
        self.id_path = path.into();
        self
    }

    pub fn with_whole_document(mut self, enabled: bool) -> Self {
        self.capture_whole_document = enabled;
        self
    }

    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }

    pub fn with_context(mut self, rule: ContextRule) -> Self {
        self.context = Some(rule);
        self
    }

    /// Parse a TOML configuration and validate it.
    pub fn from_toml_str(text: &str) -> SdkResult<Self> {
        let raw: RawConfig = toml::from_str(text).map_err(|e| SdkError::Parse {
            what: "auditor config".into(),
            reason: e.to_string(),
        })?;
        let context = raw
            .context
            .as_ref()
            .map(|rule| parse_context_rule(rule, "context"))
            .transpose()?;
        let config = Self {
            subject: raw.subject,
            id_path: raw.id_path,
            capture_whole_document: raw.capture_whole_document,
            compress: raw.compress,
            context,
            fields: parse_field_specs(&Json::Array(raw.fields))?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.subject.trim().is_empty() {
            return Err(ConfigError::InvalidOption {
                name: "subject".into(),
                reason: "must not be empty".into(),
            });
        }
        if self.id_path.is_empty() {
            return Err(ConfigError::InvalidOption {
                name: "id_path".into(),
                reason: "must not be empty".into(),
            });
        }
        validate_field_specs(&self.fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldtrail_types::ArrayKind;
    use std::io::Write;

    const SAMPLE: &str = r#"
        subject = "orders"
        capture_whole_document = true
        context = { document = ["tenant"] }

        [[fields]]
        path = "status"
        mask = "***"

        [[fields]]
        path = "items"
        array_kind = "keyed"
        array_key = "sku"
        children = [{ path = "qty" }]
    "#;

    #[test]
    fn parses_toml() {
        let config = AuditorConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.subject, "orders");
        assert_eq!(config.id_path, "_id");
        assert!(config.capture_whole_document);
        assert!(!config.compress);
        assert_eq!(
            config.context.as_ref().and_then(ContextRule::document_paths),
            Some(&["tenant".to_string()][..])
        );
        assert_eq!(config.fields.len(), 2);
        assert!(config.fields[0].mask.is_some());
        assert_eq!(config.fields[1].array, ArrayKind::keyed("sku"));
        assert_eq!(config.fields[1].children[0].path, "qty");
    }

    #[test]
    fn field_errors_surface_as_config_errors() {
        let text = r#"
            subject = "orders"
            [[fields]]
            path = "items"
            array_kind = "keyed"
        "#;
        let err = AuditorConfig::from_toml_str(text).unwrap_err();
        assert!(matches!(
            err,
            SdkError::Config(ConfigError::MissingArrayKey { ref at }) if at == "items"
        ));
    }

    #[test]
    fn empty_subject_is_rejected() {
        let err = AuditorConfig::from_toml_str("subject = \"\"").unwrap_err();
        assert!(matches!(
            err,
            SdkError::Config(ConfigError::InvalidOption { ref name, .. }) if name == "subject"
        ));
    }

    #[test]
    fn bad_toml_and_unknown_keys_are_parse_errors() {
        assert!(matches!(
            AuditorConfig::from_toml_str("subject = ").unwrap_err(),
            SdkError::Parse { .. }
        ));
        assert!(matches!(
            AuditorConfig::from_toml_str("subject = \"a\"\nretries = 3").unwrap_err(),
            SdkError::Parse { .. }
        ));
    }

    #[test]
    fn bad_context_is_rejected() {
        let err = AuditorConfig::from_toml_str("subject = \"a\"\ncontext = 5").unwrap_err();
        assert!(matches!(
            err,
            SdkError::Config(ConfigError::InvalidContextRule { ref at }) if at == "context"
        ));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = AuditorConfig::load(file.path()).unwrap();
        assert_eq!(config.fields.len(), 2);

        let missing = AuditorConfig::load(file.path().with_extension("missing"));
        assert!(matches!(missing.unwrap_err(), SdkError::Io(_)));
    }

    #[test]
    fn programmatic_builders() {
        let config = AuditorConfig::new("users", vec![FieldSpec::scalar("email")])
            .with_id_path("uid")
            .with_whole_document(true)
            .with_compression(true);
        assert!(config.validate().is_ok());
        assert_eq!(config.id_path, "uid");
        assert!(config.compress);

        let bad = AuditorConfig::new("users", vec![]).with_id_path("");
        assert!(bad.validate().is_err());
    }
}
