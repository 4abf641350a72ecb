//! In-memory level used by the reference host

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use super::classes::ActorClassTable;
use crate::error::HandlerError;

pub type Vector3 = [f64; 3];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub name: String,
    pub class: String,
    pub location: Vector3,
    /// Roll, pitch, yaw in degrees
    pub rotation: Vector3,
    pub scale: Vector3,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
}

/// Requested spawn; unset fields take the identity transform
#[derive(Debug, Clone, Default)]
pub struct SpawnRequest {
    pub class: String,
    pub name: Option<String>,
    pub location: Option<Vector3>,
    pub rotation: Option<Vector3>,
    pub scale: Option<Vector3>,
    pub folder: Option<String>,
}

/// Requested change; `None` leaves the field as is
#[derive(Debug, Clone, Default)]
pub struct ActorChanges {
    pub location: Option<Vector3>,
    pub rotation: Option<Vector3>,
    pub scale: Option<Vector3>,
    pub folder: Option<String>,
}

#[derive(Debug)]
pub struct Scene {
    level: String,
    classes: ActorClassTable,
    actors: BTreeMap<String, Actor>,
    /// Per-class counter for generated names
    spawned: BTreeMap<String, u64>,
}

impl Scene {
    pub fn new(level: impl Into<String>, classes: ActorClassTable) -> Self {
        Self {
            level: level.into(),
            classes,
            actors: BTreeMap::new(),
            spawned: BTreeMap::new(),
        }
    }

    pub fn level(&self) -> &str {
        &self.level
    }

    pub fn classes(&self) -> &ActorClassTable {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Actor> {
        self.actors.get(name)
    }

    pub fn spawn(&mut self, request: SpawnRequest) -> Result<&Actor, HandlerError> {
        let properties = self.classes.instantiate(&request.class)?;

        let name = match request.name.filter(|n| !n.trim().is_empty()) {
            Some(name) if self.actors.contains_key(&name) => {
                return Err(HandlerError::new(format!("actor already exists: {name}")));
            }
            Some(name) => name,
            None => self.next_name(&request.class),
        };

        let actor = Actor {
            name: name.clone(),
            class: request.class,
            location: request.location.unwrap_or([0.0; 3]),
            rotation: request.rotation.unwrap_or([0.0; 3]),
            scale: request.scale.unwrap_or([1.0; 3]),
            folder: request.folder,
            properties,
        };
        Ok(self.actors.entry(name).or_insert(actor))
    }

    pub fn delete(&mut self, name: &str) -> Result<Actor, HandlerError> {
        self.actors
            .remove(name)
            .ok_or_else(|| not_found(name))
    }

    pub fn modify(&mut self, name: &str, changes: ActorChanges) -> Result<&Actor, HandlerError> {
        let actor = self.actors.get_mut(name).ok_or_else(|| not_found(name))?;
        if let Some(location) = changes.location {
            actor.location = location;
        }
        if let Some(rotation) = changes.rotation {
            actor.rotation = rotation;
        }
        if let Some(scale) = changes.scale {
            actor.scale = scale;
        }
        if let Some(folder) = changes.folder {
            actor.folder = (!folder.is_empty()).then_some(folder);
        }
        Ok(actor)
    }

    /// Actors whose class matches `class` (exact) and whose name or class
    /// contains `filter` (case-insensitive), in name order
    pub fn actors<'a>(
        &'a self,
        class: Option<&'a str>,
        filter: Option<&'a str>,
    ) -> impl Iterator<Item = &'a Actor> + 'a {
        let filter = filter.map(str::to_lowercase);
        self.actors.values().filter(move |actor| {
            class.map_or(true, |c| actor.class == c)
                && filter.as_deref().map_or(true, |f| {
                    actor.name.to_lowercase().contains(f) || actor.class.to_lowercase().contains(f)
                })
        })
    }

    fn next_name(&mut self, class: &str) -> String {
        let counter = self.spawned.entry(class.to_string()).or_insert(0);
        loop {
            *counter += 1;
            let candidate = format!("{}_{}", class, counter);
            if !self.actors.contains_key(&candidate) {
                return candidate;
            }
        }
    }
}

fn not_found(name: &str) -> HandlerError {
    HandlerError::new(format!("actor not found: {name}"))
}
