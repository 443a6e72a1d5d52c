//! Service definitions and shorthand normalization
//!
//! A service definition is a static JSON document:
//!
//! ```json
//! {
//!   "name": "Sys",
//!   "namespace": "http://mongoose-iot.com/fw",
//!   "methods": {
//!     "Reboot": {
//!       "doc": "Reboot the device",
//!       "args": { "delay_ms": "integer" },
//!       "required_args": [],
//!       "result": "boolean"
//!     }
//!   }
//! }
//! ```
//!
//! `args` entries and `result` may be written as a bare type name. [`normalize`]
//! rewrites each of those into `{"type": <name>}` so every argument has a full
//! schema before any validator is compiled.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DefinitionError;

/// Per-method part of a service definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodSpec {
    /// Argument name -> schema. `None` exempts the method from argument validation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Map<String, Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_args: Option<Vec<String>>,

    /// Keys this runtime does not interpret, kept for publication
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A normalized service definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    pub name: String,
    pub namespace: String,
    /// In authored order
    pub methods: IndexMap<String, MethodSpec>,

    /// Shared schemas reachable through `{"$ref": "#/definitions/<name>"}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definitions: Option<Map<String, Value>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ServiceDefinition {
    /// Parse, normalize and type a definition document
    pub fn from_source(source: &str) -> Result<Self, DefinitionError> {
        let document: Value = serde_json::from_str(source)?;
        Self::from_document(document)
    }

    /// Normalize and type an already parsed definition document
    pub fn from_document(mut document: Value) -> Result<Self, DefinitionError> {
        normalize(&mut document)?;
        Ok(serde_json::from_value(document)?)
    }

    /// The definition as a document, as published for discovery. Method order
    /// and keys the runtime does not interpret are kept as authored.
    pub fn to_document(&self) -> Value {
        // Plain maps and strings only; serialization cannot fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn method(&self, method: &str) -> Option<&MethodSpec> {
        self.methods.get(method)
    }

    /// Wire command name for a method, e.g. `Sys.Reboot`
    pub fn qualified_name(&self, method: &str) -> String {
        format!("{}.{}", self.name, method)
    }

    /// Synthetic top-level schema for a method's arguments:
    /// `{"type": "object", "properties": <args>, "required": <required_args>}`.
    ///
    /// Returns `None` for methods without `args`.
    pub fn args_schema(&self, method: &str) -> Option<Value> {
        let spec = self.methods.get(method)?;
        let args = spec.args.as_ref()?;

        let mut schema = Map::new();
        schema.insert("type".to_string(), Value::from("object"));
        schema.insert("properties".to_string(), Value::Object(args.clone()));
        if let Some(required) = &spec.required_args {
            schema.insert("required".to_string(), Value::from(required.clone()));
        }
        if let Some(definitions) = &self.definitions {
            schema.insert(
                "definitions".to_string(),
                Value::Object(definitions.clone()),
            );
        }
        Some(Value::Object(schema))
    }
}

/// Rewrite every shorthand schema in a definition document in place.
///
/// Idempotent: a normalized document is returned unchanged. Fails when the
/// document does not have the expected shape.
pub fn normalize(document: &mut Value) -> Result<(), DefinitionError> {
    let root = document
        .as_object_mut()
        .ok_or_else(|| unexpected("$", "an object"))?;
    let methods = root
        .get_mut("methods")
        .ok_or(DefinitionError::MissingMethods)?
        .as_object_mut()
        .ok_or_else(|| unexpected("$.methods", "an object"))?;

    for (name, method) in methods.iter_mut() {
        let path = format!("$.methods.{name}");
        let method = method
            .as_object_mut()
            .ok_or_else(|| unexpected(&path, "an object"))?;

        if let Some(result) = method.get_mut("result") {
            expand_shorthand(result, &format!("{path}.result"))?;
        }

        match method.get_mut("args") {
            None => {}
            Some(Value::Object(args)) => {
                for (arg, schema) in args.iter_mut() {
                    expand_shorthand(schema, &format!("{path}.args.{arg}"))?;
                }
            }
            Some(_) => return Err(unexpected(&format!("{path}.args"), "an object")),
        }
    }
    Ok(())
}

fn expand_shorthand(schema: &mut Value, path: &str) -> Result<(), DefinitionError> {
    match schema {
        Value::String(type_name) => {
            let mut expanded = Map::new();
            expanded.insert("type".to_string(), Value::String(std::mem::take(type_name)));
            *schema = Value::Object(expanded);
            Ok(())
        }
        Value::Object(_) => Ok(()),
        _ => Err(unexpected(path, "a type name or a schema object")),
    }
}

fn unexpected(path: &str, expected: &'static str) -> DefinitionError {
    DefinitionError::UnexpectedNode {
        path: path.to_string(),
        expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn shorthand_document() -> Value {
        json!({
            "name": "Calc",
            "namespace": "http://example.com/calc",
            "methods": {
                "Add": {
                    "args": {
                        "a": "number",
                        "b": {"type": "number", "doc": "Second operand"}
                    },
                    "required_args": ["a", "b"],
                    "result": "number"
                },
                "Ping": {
                    "doc": "No arguments"
                }
            }
        })
    }

    #[test]
    fn test_shorthand_is_expanded() {
        let mut document = shorthand_document();
        normalize(&mut document).unwrap();

        let add = &document["methods"]["Add"];
        assert_eq!(add["result"], json!({"type": "number"}));
        assert_eq!(add["args"]["a"], json!({"type": "number"}));
        assert_eq!(
            add["args"]["b"],
            json!({"type": "number", "doc": "Second operand"})
        );
        assert!(document["methods"]["Ping"].get("args").is_none());
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let mut once = shorthand_document();
        normalize(&mut once).unwrap();
        let mut twice = once.clone();
        normalize(&mut twice).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_missing_methods_is_rejected() {
        let mut document = json!({"name": "Sys", "namespace": "ns"});
        let err = normalize(&mut document).unwrap_err();
        assert!(matches!(err, DefinitionError::MissingMethods));
    }

    #[test]
    fn test_wrong_node_kind_is_rejected() {
        let mut document = json!({"methods": {"Reboot": {"args": "integer"}}});
        let err = normalize(&mut document).unwrap_err();
        let DefinitionError::UnexpectedNode { path, .. } = &err else {
            panic!("expected UnexpectedNode, got {err:?}");
        };
        assert_eq!(path, "$.methods.Reboot.args");

        let mut document = json!({"methods": {"Reboot": {"args": {"delay_ms": 100}}}});
        assert!(normalize(&mut document).is_err());

        let mut document = json!({"methods": ["Reboot"]});
        assert!(normalize(&mut document).is_err());
    }

    #[test]
    fn test_args_schema_is_synthesized() {
        let definition = ServiceDefinition::from_document(shorthand_document()).unwrap();

        let schema = definition.args_schema("Add").unwrap();
        assert_eq!(
            schema,
            json!({
                "type": "object",
                "properties": {
                    "a": {"type": "number"},
                    "b": {"type": "number", "doc": "Second operand"}
                },
                "required": ["a", "b"]
            })
        );
        assert!(definition.args_schema("Ping").is_none());
        assert!(definition.args_schema("Missing").is_none());
    }

    #[test]
    fn test_definitions_travel_with_args_schema() {
        let document = json!({
            "name": "Cfg",
            "namespace": "ns",
            "definitions": {"level": {"type": "string", "enum": ["debug", "info"]}},
            "methods": {"Set": {"args": {"level": {"$ref": "#/definitions/level"}}}}
        });
        let definition = ServiceDefinition::from_document(document).unwrap();
        let schema = definition.args_schema("Set").unwrap();
        assert_eq!(schema["definitions"]["level"]["enum"], json!(["debug", "info"]));
    }

    #[test]
    fn test_published_document_keeps_order_and_unknown_keys() {
        let document = json!({
            "name": "Sys",
            "namespace": "http://mongoose-iot.com/fw",
            "version": 2,
            "methods": {
                "Reboot": {"args": {"delay_ms": "integer"}, "deprecated": false},
                "GetInfo": {"result": "object"},
                "Attach": {}
            }
        });
        let published = ServiceDefinition::from_document(document)
            .unwrap()
            .to_document();

        let order: Vec<&String> = published["methods"].as_object().unwrap().keys().collect();
        assert_eq!(order, ["Reboot", "GetInfo", "Attach"]);
        assert_eq!(published["version"], json!(2));
        assert_eq!(published["methods"]["Reboot"]["deprecated"], json!(false));
        assert_eq!(
            published["methods"]["Reboot"]["args"]["delay_ms"],
            json!({"type": "integer"})
        );
    }

    #[test]
    fn test_qualified_name_and_round_trip() {
        let definition = ServiceDefinition::from_document(shorthand_document()).unwrap();
        assert_eq!(definition.qualified_name("Add"), "Calc.Add");

        let republished = ServiceDefinition::from_document(definition.to_document()).unwrap();
        assert_eq!(republished, definition);
    }
}
