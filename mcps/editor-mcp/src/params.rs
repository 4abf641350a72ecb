//! Parameter types for editor MCP tools
//!
//! Optional fields are skipped when serializing so the editor sees only what
//! the caller supplied.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct ListCommandsParams {
    #[schemars(description = "Show only this command's parameters (optional)")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RunCommandParams {
    #[schemars(description = "Registered command name, see list_commands")]
    pub command: String,

    #[schemars(description = "Command parameters as a JSON object")]
    #[serde(default)]
    pub params: Option<Map<String, Value>>,

    #[schemars(description = "Timeout in milliseconds (optional, uses the configured default)")]
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ActorSpawnParams {
    #[schemars(description = "Actor class, e.g. StaticMeshActor, PointLight, CameraActor")]
    pub class: String,

    #[schemars(description = "Actor label (optional, generated if omitted)")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[schemars(description = "World position [x, y, z]")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<[f64; 3]>,

    #[schemars(description = "Rotation [roll, pitch, yaw] in degrees")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<[f64; 3]>,

    #[schemars(description = "Scale [x, y, z]")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<[f64; 3]>,

    #[schemars(description = "Outliner folder (optional)")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ActorDeleteParams {
    #[schemars(description = "Label of the actor to delete")]
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ActorModifyParams {
    #[schemars(description = "Label of the actor to modify")]
    pub name: String,

    #[schemars(description = "New world position [x, y, z]")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<[f64; 3]>,

    #[schemars(description = "New rotation [roll, pitch, yaw] in degrees")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<[f64; 3]>,

    #[schemars(description = "New scale [x, y, z]")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<[f64; 3]>,

    #[schemars(description = "New outliner folder; empty string clears it")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct LevelActorsParams {
    #[schemars(description = "Only actors of this exact class")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,

    #[schemars(description = "Case-insensitive substring of actor name or class")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,

    #[schemars(description = "Maximum number of actors returned (default 30)")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}
