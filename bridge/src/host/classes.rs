//! Actor class lookup
//!
//! Class names arriving in commands are resolved through an explicit table
//! populated at startup. Each class maps to a factory producing the
//! class-specific default properties of a new actor.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

use crate::error::HandlerError;

/// Builds the default property bag for a freshly spawned actor
pub type ActorFactory = fn() -> Map<String, Value>;

#[derive(Debug, Clone, Default)]
pub struct ActorClassTable {
    factories: BTreeMap<String, ActorFactory>,
}

impl ActorClassTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with the stock classes
    pub fn with_defaults() -> Self {
        let mut table = Self::new();
        table.insert("StaticMeshActor", static_mesh_defaults);
        table.insert("PointLight", point_light_defaults);
        table.insert("CameraActor", camera_defaults);
        table.insert("PlayerStart", Map::new);
        table
    }

    /// Add or replace a class
    pub fn insert(&mut self, class: &str, factory: ActorFactory) {
        self.factories.insert(class.to_string(), factory);
    }

    pub fn contains(&self, class: &str) -> bool {
        self.factories.contains_key(class)
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Default properties for `class`, or `class not found: <class>`
    pub fn instantiate(&self, class: &str) -> Result<Map<String, Value>, HandlerError> {
        self.factories
            .get(class)
            .map(|factory| factory())
            .ok_or_else(|| HandlerError::new(format!("class not found: {class}")))
    }
}

fn static_mesh_defaults() -> Map<String, Value> {
    into_map(json!({ "mesh": "/Engine/BasicShapes/Cube" }))
}

fn point_light_defaults() -> Map<String, Value> {
    into_map(json!({ "intensity": 5000.0, "color": [1.0, 1.0, 1.0] }))
}

fn camera_defaults() -> Map<String, Value> {
    into_map(json!({ "fov": 90.0 }))
}

fn into_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
