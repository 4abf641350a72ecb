//! Command registry
//!
//! Maps command names to handlers. Registration and dispatch never observe a
//! half-updated table: the table is an immutable `Arc<BTreeMap>` that writers
//! copy, modify and swap under the write lock, while dispatch clones the
//! entry it needs under the read lock and runs the handler after releasing
//! it. A handler may therefore call back into the registry (as `help` does).

mod schema;

pub use schema::{ParamField, ParamKind, ParamSchema};

use std::collections::BTreeMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use std::time::Instant;

use parking_lot::RwLock;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::{BridgeError, CommandError, HandlerError};
use crate::protocol::{Params, ResultEnvelope, BATCH_COMMAND, HELP_COMMAND, PING_COMMAND};

/// A synchronous command handler
///
/// Handlers run on the host's tick and must not block.
pub type HandlerFn = Arc<dyn Fn(&Params) -> Result<Value, HandlerError> + Send + Sync>;

type Table = Arc<BTreeMap<String, HandlerEntry>>;

/// Names owned by the registry itself
const RESERVED: [&str; 3] = [PING_COMMAND, HELP_COMMAND, BATCH_COMMAND];

/// A registered command
#[derive(Clone)]
pub struct HandlerEntry {
    pub name: String,
    pub description: String,
    pub schema: ParamSchema,
    handler: HandlerFn,
}

impl HandlerEntry {
    pub fn new<F>(
        name: impl Into<String>,
        description: impl Into<String>,
        schema: ParamSchema,
        handler: F,
    ) -> Self
    where
        F: Fn(&Params) -> Result<Value, HandlerError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            schema,
            handler: Arc::new(handler),
        }
    }

    pub fn info(&self) -> CommandInfo {
        CommandInfo {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.schema.to_json_schema(),
        }
    }
}

impl fmt::Debug for HandlerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerEntry")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// Public description of a command, as returned by `help`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandInfo {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Thread-safe command table, cheap to clone
#[derive(Clone)]
pub struct CommandRegistry {
    inner: Arc<RwLock<Table>>,
}

impl CommandRegistry {
    /// Registry holding only the built-in `ping`, `help` and
    /// `batch_operations` commands
    pub fn new() -> Self {
        let inner = Arc::new(RwLock::new(Table::default()));
        let builtins = builtin_entries(Arc::downgrade(&inner));
        {
            let mut guard = inner.write();
            let table = Arc::make_mut(&mut guard);
            for entry in builtins {
                table.insert(entry.name.clone(), entry);
            }
        }
        Self { inner }
    }

    /// Add a command
    ///
    /// Fails with [`BridgeError::DuplicateCommand`] if the name is taken,
    /// including by a built-in. Existing entries are never overwritten.
    pub fn register<F>(
        &self,
        name: &str,
        description: &str,
        schema: ParamSchema,
        handler: F,
    ) -> Result<(), BridgeError>
    where
        F: Fn(&Params) -> Result<Value, HandlerError> + Send + Sync + 'static,
    {
        self.register_entry(HandlerEntry::new(name, description, schema, handler))
    }

    pub fn register_entry(&self, entry: HandlerEntry) -> Result<(), BridgeError> {
        let mut guard = self.inner.write();
        if guard.contains_key(&entry.name) {
            return Err(BridgeError::DuplicateCommand(entry.name));
        }
        debug!(command = %entry.name, "Registered command");
        Arc::make_mut(&mut guard).insert(entry.name.clone(), entry);
        Ok(())
    }

    /// Replace every non-built-in command in one atomic swap
    ///
    /// The new table is built first; on a duplicate (within `entries` or
    /// against a built-in) the current table is left untouched.
    pub fn replace_all(
        &self,
        entries: impl IntoIterator<Item = HandlerEntry>,
    ) -> Result<(), BridgeError> {
        let mut next: BTreeMap<String, HandlerEntry> = {
            let current = self.inner.read();
            current
                .iter()
                .filter(|(name, _)| RESERVED.contains(&name.as_str()))
                .map(|(name, entry)| (name.clone(), entry.clone()))
                .collect()
        };
        for entry in entries {
            if next.contains_key(&entry.name) {
                return Err(BridgeError::DuplicateCommand(entry.name));
            }
            next.insert(entry.name.clone(), entry);
        }

        let count = next.len();
        *self.inner.write() = Arc::new(next);
        debug!(commands = count, "Reloaded command table");
        Ok(())
    }

    /// Run a command and render the outcome as a result envelope
    pub fn dispatch(&self, name: &str, params: &Params) -> ResultEnvelope {
        match self.try_dispatch(name, params) {
            Ok(data) => ResultEnvelope::ok(data),
            Err(err) => {
                warn!(command = %name, error = %err, "Command failed");
                ResultEnvelope::failure(err.to_string())
            }
        }
    }

    /// Run a command, keeping the failure typed
    pub fn try_dispatch(&self, name: &str, params: &Params) -> Result<Params, CommandError> {
        let entry = self
            .inner
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| CommandError::UnknownCommand(name.to_string()))?;

        entry.schema.validate(params)?;
        debug!(command = %name, "Dispatching command");

        match panic::catch_unwind(AssertUnwindSafe(|| (entry.handler)(params))) {
            Ok(Ok(value)) => Ok(into_data(value)),
            Ok(Err(err)) => Err(err.into()),
            Err(payload) => Err(CommandError::Handler(format!(
                "handler panicked: {}",
                panic_message(payload.as_ref())
            ))),
        }
    }

    /// All commands, ordered by name
    pub fn list(&self) -> Vec<CommandInfo> {
        snapshot_list(&self.inner.read())
    }

    pub fn names(&self) -> Vec<String> {
        self.inner.read().keys().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.names())
            .finish()
    }
}

fn snapshot_list(table: &Table) -> Vec<CommandInfo> {
    table.values().map(HandlerEntry::info).collect()
}

/// Object results become `data` as is; `null` becomes `{}`; anything else is
/// wrapped as `{"result": value}`
fn into_data(value: Value) -> Params {
    match value {
        Value::Object(map) => map,
        Value::Null => Params::new(),
        other => {
            let mut map = Params::new();
            map.insert("result".to_string(), other);
            map
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn builtin_entries(table: Weak<RwLock<Table>>) -> Vec<HandlerEntry> {
    let ping = HandlerEntry::new(
        PING_COMMAND,
        "Liveness check; always succeeds",
        ParamSchema::new(),
        |_params: &Params| {
            Ok(json!({
                "pong": true,
                "version": env!("CARGO_PKG_VERSION"),
            }))
        },
    );

    let help_table = table.clone();
    let help = HandlerEntry::new(
        HELP_COMMAND,
        "List available commands, or describe one",
        ParamSchema::new().optional("command", ParamKind::String, "Command to describe"),
        move |params: &Params| {
            let table = help_table
                .upgrade()
                .ok_or_else(|| HandlerError::new("registry is gone"))?;
            let snapshot = table.read().clone();
            let commands = match params.get("command").and_then(Value::as_str) {
                Some(name) => {
                    let entry = snapshot
                        .get(name)
                        .ok_or_else(|| HandlerError::new(format!("unknown command: {name}")))?;
                    vec![entry.info()]
                }
                None => snapshot_list(&snapshot),
            };
            Ok(json!({ "commands": commands }))
        },
    );

    let batch = HandlerEntry::new(
        BATCH_COMMAND,
        "Run several commands in order; each entry reports its own outcome",
        ParamSchema::new().required(
            "operations",
            ParamKind::Array,
            "Entries of {operation, params?, id?}",
        ),
        move |params: &Params| {
            let inner = table
                .upgrade()
                .ok_or_else(|| HandlerError::new("registry is gone"))?;
            let registry = CommandRegistry { inner };
            let operations = params
                .get("operations")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            Ok(run_batch(&registry, operations))
        },
    );

    vec![ping, help, batch]
}

/// Run each entry through the registry; failures are reported per entry
fn run_batch(registry: &CommandRegistry, operations: &[Value]) -> Value {
    let started = Instant::now();
    let mut results = Vec::with_capacity(operations.len());
    let mut succeeded = 0usize;

    for (index, op) in operations.iter().enumerate() {
        let id = op
            .get("id")
            .filter(|id| !id.is_null())
            .cloned()
            .unwrap_or_else(|| json!(format!("op_{index}")));
        let name = op.get("operation").and_then(Value::as_str);
        let outcome = match (name, op.get("params")) {
            (None, _) => Err("missing operation name".to_string()),
            (Some(BATCH_COMMAND), _) => Err("batch_operations cannot be nested".to_string()),
            (Some(name), None | Some(Value::Null)) => registry
                .try_dispatch(name, &Params::new())
                .map_err(|e| e.to_string()),
            (Some(name), Some(Value::Object(args))) => {
                registry.try_dispatch(name, args).map_err(|e| e.to_string())
            }
            (Some(_), Some(_)) => Err("invalid params: must be an object".to_string()),
        };

        let operation = name.unwrap_or("unknown");
        results.push(match outcome {
            Ok(data) => {
                succeeded += 1;
                json!({ "id": id, "operation": operation, "success": true, "result": data })
            }
            Err(error) => {
                debug!(operation, error = %error, "Batch entry failed");
                json!({ "id": id, "operation": operation, "success": false, "error": error })
            }
        });
    }

    json!({
        "operations": results,
        "successCount": succeeded,
        "failureCount": operations.len() - succeeded,
        "executionTime": started.elapsed().as_secs_f64(),
    })
}
