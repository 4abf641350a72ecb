//! Parameter shape descriptors
//!
//! A [`ParamSchema`] is checked against the incoming parameters before a
//! handler runs. It only checks shape (presence and JSON type); value ranges
//! and cross-field rules belong to the handler.

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::error::CommandError;
use crate::protocol::Params;

/// Expected JSON type of one parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    Any,
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
    /// Array of exactly three numbers (`[x, y, z]`, `[roll, pitch, yaw]`)
    Vector3,
}

impl ParamKind {
    fn matches(self, value: &Value) -> bool {
        match self {
            ParamKind::Any => true,
            ParamKind::String => value.is_string(),
            ParamKind::Number => value.is_number(),
            ParamKind::Integer => value.is_i64() || value.is_u64(),
            ParamKind::Boolean => value.is_boolean(),
            ParamKind::Array => value.is_array(),
            ParamKind::Object => value.is_object(),
            ParamKind::Vector3 => value
                .as_array()
                .map(|items| items.len() == 3 && items.iter().all(Value::is_number))
                .unwrap_or(false),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            ParamKind::Any => "any value",
            ParamKind::String => "a string",
            ParamKind::Number => "a number",
            ParamKind::Integer => "an integer",
            ParamKind::Boolean => "a boolean",
            ParamKind::Array => "an array",
            ParamKind::Object => "an object",
            ParamKind::Vector3 => "an array of 3 numbers",
        }
    }

    fn json_schema(self) -> Value {
        match self {
            ParamKind::Any => json!({}),
            ParamKind::String => json!({ "type": "string" }),
            ParamKind::Number => json!({ "type": "number" }),
            ParamKind::Integer => json!({ "type": "integer" }),
            ParamKind::Boolean => json!({ "type": "boolean" }),
            ParamKind::Array => json!({ "type": "array" }),
            ParamKind::Object => json!({ "type": "object" }),
            ParamKind::Vector3 => json!({
                "type": "array",
                "items": { "type": "number" },
                "minItems": 3,
                "maxItems": 3
            }),
        }
    }
}

/// One declared parameter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamField {
    pub name: String,
    pub kind: ParamKind,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Ordered set of declared parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParamSchema {
    fields: Vec<ParamField>,
}

impl ParamSchema {
    /// Schema with no declared parameters (anything is accepted)
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(self, name: &str, kind: ParamKind, description: &str) -> Self {
        self.field(name, kind, true, description)
    }

    pub fn optional(self, name: &str, kind: ParamKind, description: &str) -> Self {
        self.field(name, kind, false, description)
    }

    fn field(mut self, name: &str, kind: ParamKind, required: bool, description: &str) -> Self {
        self.fields.push(ParamField {
            name: name.to_string(),
            kind,
            required,
            description: (!description.is_empty()).then(|| description.to_string()),
        });
        self
    }

    pub fn fields(&self) -> &[ParamField] {
        &self.fields
    }

    /// Check `params` and report the first offending field in declaration order
    ///
    /// Undeclared extra parameters are accepted. An explicit `null` counts
    /// as absent.
    pub fn validate(&self, params: &Params) -> Result<(), CommandError> {
        for field in &self.fields {
            match params.get(&field.name) {
                None | Some(Value::Null) => {
                    if field.required {
                        return Err(CommandError::validation(
                            &field.name,
                            format!("missing required parameter: {}", field.name),
                        ));
                    }
                }
                Some(value) => {
                    if !field.kind.matches(value) {
                        return Err(CommandError::validation(
                            &field.name,
                            format!(
                                "invalid parameter '{}': expected {}",
                                field.name,
                                field.kind.describe()
                            ),
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// JSON Schema object describing these parameters
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for field in &self.fields {
            let mut prop = field.kind.json_schema();
            if let (Some(desc), Some(obj)) = (&field.description, prop.as_object_mut()) {
                obj.insert("description".to_string(), Value::String(desc.clone()));
            }
            properties.insert(field.name.clone(), prop);
            if field.required {
                required.push(Value::String(field.name.clone()));
            }
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}
