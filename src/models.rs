// src/models.rs

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

// --- RAW CONFIGURATION ---
// This is what lives on disk (global and local `cva-create.json`) and what the
// merge engine works on. Field order follows insertion order, which for files we
// generate is the schema declaration order.

/// A configuration document: a mapping from field name to JSON value.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct Configuration(Map<String, Value>);

impl Configuration {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn get_mut(&mut self, field: &str) -> Option<&mut Value> {
        self.0.get_mut(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Inserts or replaces a field, returning the previous value.
    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(field.into(), value)
    }

    /// Removes a field while keeping the order of the remaining ones.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.shift_remove(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Builds a configuration from a JSON value. Anything but an object yields `None`.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }
}

impl From<Map<String, Value>> for Configuration {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for Configuration {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// --- TYPED VIEW OF THE EFFECTIVE CONFIGURATION ---
// The merge engine only deals with `Configuration`. Once merged, the orchestrator
// reads the result through these structs.

/// Typed view of a merged configuration. Every field is guaranteed to be present
/// after a merge, but `#[serde(default)]` keeps the view usable on partial input.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub cordova_debug: bool,
    pub copy_from: String,
    pub link_to: String,
    pub create_parms: String,
    pub plugin_search_path: String,
    pub replace_target_dir: bool,
    pub run_prepare: bool,
    pub plugin_list: Vec<String>,
    pub platform_list: Vec<String>,
    pub proxy: ProxySettings,
    pub adjust_config_xml: bool,
    pub config_xml_widget: Vec<XmlElement>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ProxySettings {
    pub use_proxy: bool,
    pub use_credentials: bool,
    pub proxy_user: String,
    pub proxy_password: String,
    pub secure_proxy_uses_http: bool,
    pub http: ProxyServer,
    pub https: ProxyServer,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ProxyServer {
    pub host: String,
    pub port: u16,
}

/// A hand-writable XML element directive used to patch `config.xml`.
///
/// ```json
/// { "elementName": "author",
///   "attributes": { "email": "$git(user.email)" },
///   "content": ["$git(user.name)"] }
/// ```
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct XmlElement {
    pub element_name: String,
    pub attributes: BTreeMap<String, String>,
    pub content: XmlContent,
}

/// Element content: either a bare string or a list of text/element nodes.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum XmlContent {
    Text(String),
    Nodes(Vec<XmlNode>),
}

impl Default for XmlContent {
    fn default() -> Self {
        XmlContent::Nodes(Vec::new())
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum XmlNode {
    Text(String),
    Element(XmlElement),
}

// --- BUILD REQUEST ---

/// Everything the `build` action needs beyond the configuration files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    pub target_dir: String,
    pub app_id: String,
    pub app_name: String,
    pub platforms: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_configuration_remove_keeps_order() {
        let mut config = Configuration::from_value(json!({"a": 1, "b": 2, "c": 3})).unwrap();
        config.remove("b");
        let names: Vec<&str> = config.field_names().collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn test_settings_view_from_partial_configuration() {
        let settings: Settings = serde_json::from_value(json!({
            "cordovaDebug": true,
            "pluginList": ["cordova-plugin-device"],
            "proxy": { "useProxy": true, "http": { "host": "proxy", "port": 8080 } }
        }))
        .unwrap();

        assert!(settings.cordova_debug);
        assert_eq!(settings.plugin_list, vec!["cordova-plugin-device"]);
        assert_eq!(settings.proxy.http.port, 8080);
        assert_eq!(settings.proxy.https.port, 0);
        assert!(settings.platform_list.is_empty());
    }

    #[test]
    fn test_xml_element_accepts_string_or_node_content() {
        let simple: XmlElement =
            serde_json::from_value(json!({"elementName": "description", "content": "Hi"}))
                .unwrap();
        assert_eq!(simple.content, XmlContent::Text("Hi".to_string()));

        let nested: XmlElement = serde_json::from_value(json!({
            "elementName": "platform",
            "attributes": { "name": "android" },
            "content": [ { "elementName": "icon", "attributes": { "src": "a.png" }, "content": [] } ]
        }))
        .unwrap();
        match nested.content {
            XmlContent::Nodes(nodes) => {
                assert!(matches!(&nodes[0], XmlNode::Element(e) if e.element_name == "icon"))
            }
            other => panic!("unexpected content: {:?}", other),
        }
    }
}
