// src/core/schema.rs

use crate::models::Configuration;
use serde_json::{Value, json};

/// How a field combines across configuration layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Strings and booleans. A later layer always overrides an earlier one.
    Scalar,
    /// Lists merged by ordered union, earlier layers first, duplicates removed.
    ListUnion,
    /// Nested objects. Overridden as a whole during a merge, but walked
    /// recursively during a schema upgrade.
    Structured,
}

/// Declares one configuration field: its name, merge policy and compiled default.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub default: Value,
}

impl FieldSpec {
    pub fn new(name: &'static str, kind: FieldKind, default: Value) -> Self {
        Self {
            name,
            kind,
            default,
        }
    }
}

/// The single source of truth for which fields exist and what they default to.
///
/// A `Schema` is an immutable value built once and passed explicitly to the store
/// and the merger. Field order is the order in which fields are written to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    fields: Vec<FieldSpec>,
}

impl Schema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    /// The schema shipped with this version of `cva-create`.
    pub fn standard() -> Self {
        use FieldKind::*;

        let server = json!({ "host": "", "port": 0 });
        let proxy = json!({
            "useProxy": false,
            "useCredentials": false,
            "proxyUser": "",
            "proxyPassword": "",
            "secureProxyUsesHttp": false,
            "http": server,
            "https": server,
        });
        let empty_widget = json!([{ "elementName": "", "attributes": {}, "content": [] }]);

        Self::new(vec![
            FieldSpec::new("cordovaDebug", Scalar, json!(false)),
            FieldSpec::new("copyFrom", Scalar, json!("")),
            FieldSpec::new("linkTo", Scalar, json!("")),
            FieldSpec::new("createParms", Scalar, json!("")),
            FieldSpec::new("pluginSearchPath", Scalar, json!("")),
            FieldSpec::new("replaceTargetDir", Scalar, json!(false)),
            FieldSpec::new("runPrepare", Scalar, json!(false)),
            FieldSpec::new("pluginList", ListUnion, json!(default_plugins())),
            FieldSpec::new("platformList", Scalar, json!(default_platforms())),
            FieldSpec::new("proxy", Structured, proxy),
            FieldSpec::new("adjustConfigXml", Scalar, json!(false)),
            FieldSpec::new("configXmlWidget", ListUnion, empty_widget),
        ])
    }

    /// Field renames applied before the structural part of an upgrade.
    pub fn standard_renames() -> Vec<RenameRule> {
        vec![
            RenameRule::new("enableDebug", "cordovaDebug", |old| Ok(Some(old.clone()))),
            RenameRule::new("configXml", "configXmlWidget", extract_widget_from_blob),
        ]
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn kind_of(&self, name: &str) -> Option<FieldKind> {
        self.field(name).map(|f| f.kind)
    }

    /// A configuration holding exactly the compiled defaults, in schema order.
    pub fn defaults(&self) -> Configuration {
        self.fields
            .iter()
            .map(|f| (f.name.to_string(), f.default.clone()))
            .collect()
    }
}

/// Error returned by a rename transform when the legacy value cannot be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformError(pub String);

/// Maps a legacy value to the value of the new field.
/// `Ok(None)` means "nothing to carry over".
pub type TransformFn = fn(&Value) -> Result<Option<Value>, TransformError>;

/// Describes a single field rename between two schema versions.
#[derive(Debug, Clone)]
pub struct RenameRule {
    pub old_field: &'static str,
    pub new_field: &'static str,
    pub transform: TransformFn,
}

impl RenameRule {
    pub fn new(old_field: &'static str, new_field: &'static str, transform: TransformFn) -> Self {
        Self {
            old_field,
            new_field,
            transform,
        }
    }
}

fn default_plugins() -> Vec<&'static str> {
    vec![
        "org.apache.cordova.console",
        "org.apache.cordova.dialogs",
        "org.apache.cordova.device",
    ]
}

fn default_platforms() -> Vec<&'static str> {
    if cfg!(target_os = "windows") {
        vec!["android", "windows"]
    } else if cfg!(target_os = "macos") {
        vec!["android", "ios"]
    } else if cfg!(target_os = "linux") {
        vec!["ubuntu"]
    } else {
        vec!["android"]
    }
}

/// Older releases stored the widget directives as a JSON string that itself
/// contained a JSON-encoded `{"widget": [...]}` document.
fn extract_widget_from_blob(old: &Value) -> Result<Option<Value>, TransformError> {
    let outer = match old {
        Value::Null => return Ok(None),
        Value::String(s) if s.trim().is_empty() => return Ok(None),
        Value::String(s) => s,
        other => return Err(TransformError(format!("expected a string, found {}", other))),
    };

    let inner: Value =
        serde_json::from_str(outer).map_err(|e| TransformError(format!("first decode: {}", e)))?;
    let document: Value = match inner {
        Value::String(s) => {
            serde_json::from_str(&s).map_err(|e| TransformError(format!("second decode: {}", e)))?
        }
        _ => return Err(TransformError("expected a doubly-encoded string".to_string())),
    };

    Ok(document.get("widget").cloned())
}
