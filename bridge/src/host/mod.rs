//! Reference host
//!
//! A small in-memory stand-in for the editor: a level of actors plus the
//! commands that operate on it. `editor-bridge serve` runs it behind a real
//! listener, and the integration tests use it as the far end of the bridge.

mod classes;
mod scene;

pub use classes::{ActorClassTable, ActorFactory};
pub use scene::{Actor, ActorChanges, Scene, SpawnRequest, Vector3};

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{BridgeError, HandlerError};
use crate::protocol::Params;
use crate::registry::{CommandRegistry, ParamKind, ParamSchema};

pub type SharedScene = Arc<Mutex<Scene>>;

/// Default cap on `list_actors` results
const DEFAULT_LIST_LIMIT: usize = 30;

/// Static facts reported by `project_info`
#[derive(Debug, Clone)]
pub struct HostInfo {
    pub project_name: String,
    pub engine_version: String,
}

impl Default for HostInfo {
    fn default() -> Self {
        Self {
            project_name: "ReferenceProject".to_string(),
            engine_version: "5.4".to_string(),
        }
    }
}

#[derive(Deserialize)]
struct SpawnParams {
    class: String,
    name: Option<String>,
    location: Option<Vector3>,
    rotation: Option<Vector3>,
    scale: Option<Vector3>,
    folder: Option<String>,
}

#[derive(Deserialize)]
struct NameParams {
    name: String,
}

#[derive(Deserialize)]
struct ModifyParams {
    name: String,
    location: Option<Vector3>,
    rotation: Option<Vector3>,
    scale: Option<Vector3>,
    folder: Option<String>,
}

#[derive(Deserialize)]
struct ListParams {
    class: Option<String>,
    filter: Option<String>,
    limit: Option<usize>,
}

fn parse<T: serde::de::DeserializeOwned>(params: &Params) -> Result<T, HandlerError> {
    Ok(serde_json::from_value(Value::Object(params.clone()))?)
}

/// Registry preloaded with the reference commands over a fresh scene
pub fn reference_registry() -> Result<(CommandRegistry, SharedScene), BridgeError> {
    let scene = Arc::new(Mutex::new(Scene::new(
        "Main",
        ActorClassTable::with_defaults(),
    )));
    let registry = CommandRegistry::new();
    register_commands(&registry, scene.clone(), HostInfo::default())?;
    Ok((registry, scene))
}

/// Register `echo`, `project_info` and the actor commands
pub fn register_commands(
    registry: &CommandRegistry,
    scene: SharedScene,
    info: HostInfo,
) -> Result<(), BridgeError> {
    let vector = ParamKind::Vector3;

    registry.register(
        "echo",
        "Return the parameters unchanged",
        ParamSchema::new(),
        |params: &Params| Ok(Value::Object(params.clone())),
    )?;

    let s = scene.clone();
    registry.register(
        "project_info",
        "Project name, engine version and current level",
        ParamSchema::new(),
        move |_params: &Params| {
            let scene = s.lock();
            Ok(json!({
                "projectName": info.project_name,
                "engineVersion": info.engine_version,
                "currentLevel": scene.level(),
                "actorCount": scene.len(),
                "actorClasses": scene.classes().classes().collect::<Vec<_>>(),
            }))
        },
    )?;

    let s = scene.clone();
    registry.register(
        "spawn_actor",
        "Spawn an actor of a registered class",
        ParamSchema::new()
            .required("class", ParamKind::String, "Actor class name")
            .optional("name", ParamKind::String, "Actor label; generated if omitted")
            .optional("location", vector, "World position [x, y, z]")
            .optional("rotation", vector, "Rotation [roll, pitch, yaw] in degrees")
            .optional("scale", vector, "Scale [x, y, z]")
            .optional("folder", ParamKind::String, "Outliner folder"),
        move |params: &Params| {
            let p: SpawnParams = parse(params)?;
            let mut scene = s.lock();
            let actor = scene.spawn(SpawnRequest {
                class: p.class,
                name: p.name,
                location: p.location,
                rotation: p.rotation,
                scale: p.scale,
                folder: p.folder,
            })?;
            Ok(json!({
                "actorName": actor.name,
                "actor": actor,
                "message": format!("Created {} at {:?}", actor.name, actor.location),
            }))
        },
    )?;

    let s = scene.clone();
    registry.register(
        "delete_actor",
        "Delete an actor by name",
        ParamSchema::new().required("name", ParamKind::String, "Actor label"),
        move |params: &Params| {
            let p: NameParams = parse(params)?;
            let actor = s.lock().delete(&p.name)?;
            Ok(json!({
                "deleted": actor.name,
                "message": format!("Deleted actor: {}", actor.name),
            }))
        },
    )?;

    let s = scene.clone();
    registry.register(
        "modify_actor",
        "Change an actor's transform or folder",
        ParamSchema::new()
            .required("name", ParamKind::String, "Actor label")
            .optional("location", vector, "World position [x, y, z]")
            .optional("rotation", vector, "Rotation [roll, pitch, yaw] in degrees")
            .optional("scale", vector, "Scale [x, y, z]")
            .optional("folder", ParamKind::String, "Outliner folder; empty clears it"),
        move |params: &Params| {
            let p: ModifyParams = parse(params)?;
            let mut scene = s.lock();
            let actor = scene.modify(
                &p.name,
                ActorChanges {
                    location: p.location,
                    rotation: p.rotation,
                    scale: p.scale,
                    folder: p.folder,
                },
            )?;
            Ok(json!({
                "actorName": actor.name,
                "actor": actor,
                "message": format!("Modified actor: {}", actor.name),
            }))
        },
    )?;

    registry.register(
        "list_actors",
        "List actors in the current level",
        ParamSchema::new()
            .optional("class", ParamKind::String, "Only actors of this class")
            .optional("filter", ParamKind::String, "Substring of name or class")
            .optional("limit", ParamKind::Integer, "Maximum actors returned (default 30)"),
        move |params: &Params| {
            let p: ListParams = parse(params)?;
            let scene = scene.lock();
            let matching: Vec<&Actor> = scene
                .actors(p.class.as_deref(), p.filter.as_deref())
                .collect();
            let limit = p.limit.unwrap_or(DEFAULT_LIST_LIMIT);
            Ok(json!({
                "actors": matching.iter().take(limit).collect::<Vec<_>>(),
                "totalCount": matching.len(),
                "currentLevel": scene.level(),
            }))
        },
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(value: Value) -> Params {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_spawn_list_delete_flow() {
        let (registry, scene) = reference_registry().unwrap();

        let res = registry.dispatch(
            "spawn_actor",
            &params(json!({ "class": "PointLight", "location": [0, 0, 200] })),
        );
        assert!(res.is_success(), "{:?}", res.error());
        assert_eq!(res.data().unwrap()["actorName"], "PointLight_1");
        assert_eq!(res.data().unwrap()["actor"]["location"], json!([0.0, 0.0, 200.0]));

        let res = registry.dispatch("list_actors", &params(json!({ "class": "PointLight" })));
        assert_eq!(res.data().unwrap()["totalCount"], 1);

        let res = registry.dispatch("delete_actor", &params(json!({ "name": "PointLight_1" })));
        assert!(res.is_success());
        assert!(scene.lock().is_empty());
    }

    #[test]
    fn test_unknown_class_is_readable_failure() {
        let (registry, _scene) = reference_registry().unwrap();
        let res = registry.dispatch("spawn_actor", &params(json!({ "class": "Dragon" })));
        assert_eq!(res.error(), Some("class not found: Dragon"));
    }

    #[test]
    fn test_bad_vector_rejected_by_schema() {
        let (registry, _scene) = reference_registry().unwrap();
        let res = registry.dispatch(
            "spawn_actor",
            &params(json!({ "class": "PointLight", "location": [0, 0] })),
        );
        assert!(res.error().unwrap().contains("location"));
    }

    #[test]
    fn test_modify_missing_actor() {
        let (registry, _scene) = reference_registry().unwrap();
        let res = registry.dispatch("modify_actor", &params(json!({ "name": "Ghost" })));
        assert_eq!(res.error(), Some("actor not found: Ghost"));
    }

    #[test]
    fn test_list_limit_keeps_total() {
        let (registry, _scene) = reference_registry().unwrap();
        for _ in 0..5 {
            registry.dispatch("spawn_actor", &params(json!({ "class": "StaticMeshActor" })));
        }
        let res = registry.dispatch("list_actors", &params(json!({ "limit": 2 })));
        let data = res.data().unwrap();
        assert_eq!(data["actors"].as_array().unwrap().len(), 2);
        assert_eq!(data["totalCount"], 5);
    }

    #[test]
    fn test_project_info() {
        let (registry, _scene) = reference_registry().unwrap();
        let res = registry.dispatch("project_info", &Params::new());
        let data = res.data().unwrap();
        assert_eq!(data["projectName"], "ReferenceProject");
        assert_eq!(data["currentLevel"], "Main");
        assert_eq!(data["actorCount"], 0);
    }
}
