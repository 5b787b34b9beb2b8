//! Control-file field schemas and property validation
//!
//! Every format backend declares an ordered table of [`FieldDef`] records.
//! The same table drives both property validation (aliases, defaults,
//! mandatory checks) and control-file rendering, so the two can never
//! disagree about the field list.

use std::collections::BTreeMap;

use crate::error::ConfigurationError;

/// A validated property value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    /// Single string value
    Scalar(String),
    /// Ordered list of strings
    List(Vec<String>),
    /// Integer value
    Integer(i64),
}

impl PropertyValue {
    /// The scalar text of this value, if it is one
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Flat text rendering for variable expansion; lists join with spaces
    pub fn to_text(&self) -> String {
        match self {
            Self::Scalar(s) => s.clone(),
            Self::Integer(i) => i.to_string(),
            Self::List(items) => items.join(" "),
        }
    }

    /// Convert a TOML value into a property value.
    ///
    /// Strings, integers, and arrays of strings are accepted; booleans are
    /// carried as scalars so they render as bare words.
    pub fn from_toml(value: &toml::Value) -> Option<Self> {
        match value {
            toml::Value::String(s) => Some(Self::Scalar(s.clone())),
            toml::Value::Integer(i) => Some(Self::Integer(*i)),
            toml::Value::Boolean(b) => Some(Self::Scalar(b.to_string())),
            toml::Value::Array(items) => {
                let strings: Option<Vec<String>> = items
                    .iter()
                    .map(|v| v.as_str().map(str::to_string))
                    .collect();
                strings.map(Self::List)
            }
            _ => None,
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Self::Scalar(_) => "string",
            Self::List(_) => "string list",
            Self::Integer(_) => "integer",
        }
    }
}

/// Validated property map, keyed by canonical field key
pub type Properties = BTreeMap<String, PropertyValue>;

/// Expected shape of a field value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Single string
    Scalar,
    /// List of strings; a scalar input is wrapped
    List,
    /// Integer
    Integer,
}

/// Const-constructible default for a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue {
    /// String default
    Str(&'static str),
    /// String list default
    StrList(&'static [&'static str]),
    /// Integer default
    Int(i64),
}

impl DefaultValue {
    fn to_value(self) -> PropertyValue {
        match self {
            Self::Str(s) => PropertyValue::Scalar(s.to_string()),
            Self::StrList(items) => {
                PropertyValue::List(items.iter().map(|s| (*s).to_string()).collect())
            }
            Self::Int(i) => PropertyValue::Integer(i),
        }
    }
}

/// One schema record: canonical key, optional input alias, value kind,
/// whether the field must be present after defaulting, and its default
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    /// Canonical control-file key
    pub key: &'static str,
    /// Alternative input name resolved during validation
    pub alias: Option<&'static str>,
    /// Expected value shape
    pub kind: FieldKind,
    /// Must be present after alias resolution and defaulting
    pub mandatory: bool,
    /// Default applied when neither key nor alias is given
    pub default: Option<DefaultValue>,
}

impl FieldDef {
    /// Shorthand for a plain optional field
    pub const fn optional(key: &'static str, kind: FieldKind) -> Self {
        Self {
            key,
            alias: None,
            kind,
            mandatory: false,
            default: None,
        }
    }
}

/// Validate a raw property map against a schema.
///
/// Aliases are resolved to canonical keys, defaults are filled in, scalars
/// are wrapped into lists where the schema asks for one, and a missing
/// mandatory field with no default is a fatal [`ConfigurationError`].
/// Raw keys not covered by the schema are carried through unchanged.
pub fn validate_properties(
    format: &str,
    schema: &[FieldDef],
    raw: &Properties,
) -> Result<Properties, ConfigurationError> {
    let mut out = Properties::new();

    for def in schema {
        let value = raw
            .get(def.key)
            .or_else(|| def.alias.and_then(|a| raw.get(a)))
            .cloned()
            .or_else(|| def.default.map(DefaultValue::to_value));

        match value {
            Some(v) => {
                out.insert(def.key.to_string(), coerce(def, v)?);
            }
            None if def.mandatory => {
                return Err(ConfigurationError::MissingMandatoryField {
                    format: format.to_string(),
                    field: def.key.to_string(),
                });
            }
            None => {}
        }
    }

    // Properties outside the schema pass through, e.g. extra PKGBUILD
    // fields from the manifest's per-format table.
    let aliases: Vec<&str> = schema.iter().filter_map(|d| d.alias).collect();
    for (key, value) in raw {
        if !out.contains_key(key) && !aliases.contains(&key.as_str()) {
            out.insert(key.clone(), value.clone());
        }
    }

    Ok(out)
}

fn coerce(def: &FieldDef, value: PropertyValue) -> Result<PropertyValue, ConfigurationError> {
    match (def.kind, value) {
        (FieldKind::List, PropertyValue::Scalar(s)) => Ok(PropertyValue::List(vec![s])),
        (FieldKind::Scalar, v @ PropertyValue::Scalar(_))
        | (FieldKind::List, v @ PropertyValue::List(_))
        | (FieldKind::Integer, v @ PropertyValue::Integer(_)) => Ok(v),
        (FieldKind::Integer, PropertyValue::Scalar(s)) => match s.parse::<i64>() {
            Ok(i) => Ok(PropertyValue::Integer(i)),
            Err(_) => Err(ConfigurationError::InvalidFieldValue {
                field: def.key.to_string(),
                expected: "integer".to_string(),
                got: format!("'{s}'"),
            }),
        },
        (kind, v) => Err(ConfigurationError::InvalidFieldValue {
            field: def.key.to_string(),
            expected: match kind {
                FieldKind::Scalar => "string",
                FieldKind::List => "string list",
                FieldKind::Integer => "integer",
            }
            .to_string(),
            got: v.kind_name().to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &[FieldDef] = &[
        FieldDef {
            key: "pkgname",
            alias: Some("name"),
            kind: FieldKind::List,
            mandatory: true,
            default: None,
        },
        FieldDef {
            key: "pkgrel",
            alias: Some("release"),
            kind: FieldKind::Integer,
            mandatory: true,
            default: Some(DefaultValue::Int(0)),
        },
        FieldDef {
            key: "arch",
            alias: None,
            kind: FieldKind::List,
            mandatory: true,
            default: Some(DefaultValue::StrList(&["any"])),
        },
        FieldDef::optional("url", FieldKind::Scalar),
    ];

    fn props(pairs: &[(&str, PropertyValue)]) -> Properties {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_alias_resolution_and_list_coercion() {
        let raw = props(&[("name", PropertyValue::Scalar("abc".into()))]);
        let validated = validate_properties("pkg", SCHEMA, &raw).unwrap();
        assert_eq!(
            validated.get("pkgname"),
            Some(&PropertyValue::List(vec!["abc".into()]))
        );
        assert!(!validated.contains_key("name"));
    }

    #[test]
    fn test_defaults_fill_missing_mandatory_fields() {
        let raw = props(&[("pkgname", PropertyValue::Scalar("abc".into()))]);
        let validated = validate_properties("pkg", SCHEMA, &raw).unwrap();
        assert_eq!(validated.get("pkgrel"), Some(&PropertyValue::Integer(0)));
        assert_eq!(
            validated.get("arch"),
            Some(&PropertyValue::List(vec!["any".into()]))
        );
    }

    #[test]
    fn test_missing_mandatory_without_default_fails() {
        let err = validate_properties("pkg", SCHEMA, &Properties::new()).unwrap_err();
        match err {
            ConfigurationError::MissingMandatoryField { field, .. } => {
                assert_eq!(field, "pkgname");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_integer_parsed_from_scalar() {
        let raw = props(&[
            ("pkgname", PropertyValue::Scalar("abc".into())),
            ("release", PropertyValue::Scalar("2".into())),
        ]);
        let validated = validate_properties("pkg", SCHEMA, &raw).unwrap();
        assert_eq!(validated.get("pkgrel"), Some(&PropertyValue::Integer(2)));
    }

    #[test]
    fn test_invalid_integer_rejected() {
        let raw = props(&[
            ("pkgname", PropertyValue::Scalar("abc".into())),
            ("release", PropertyValue::Scalar("two".into())),
        ]);
        assert!(matches!(
            validate_properties("pkg", SCHEMA, &raw),
            Err(ConfigurationError::InvalidFieldValue { .. })
        ));
    }

    #[test]
    fn test_unknown_keys_pass_through() {
        let raw = props(&[
            ("pkgname", PropertyValue::Scalar("abc".into())),
            ("depends", PropertyValue::List(vec!["nodejs>=16".into()])),
        ]);
        let validated = validate_properties("pkg", SCHEMA, &raw).unwrap();
        assert_eq!(
            validated.get("depends"),
            Some(&PropertyValue::List(vec!["nodejs>=16".into()]))
        );
    }

    #[test]
    fn test_from_toml() {
        assert_eq!(
            PropertyValue::from_toml(&toml::Value::String("x".into())),
            Some(PropertyValue::Scalar("x".into()))
        );
        assert_eq!(
            PropertyValue::from_toml(&toml::Value::Integer(3)),
            Some(PropertyValue::Integer(3))
        );
        let arr = toml::Value::Array(vec![
            toml::Value::String("a".into()),
            toml::Value::String("b".into()),
        ]);
        assert_eq!(
            PropertyValue::from_toml(&arr),
            Some(PropertyValue::List(vec!["a".into(), "b".into()]))
        );
    }
}
