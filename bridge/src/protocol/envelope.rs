//! Command and result envelopes exchanged over the bridge

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

/// Parameters of a command: a JSON object
pub type Params = Map<String, Value>;

/// Error text of a call that hit its deadline
pub const ERROR_TIMEOUT: &str = "timeout";

/// Error text of a call that could not reach the listener
pub const ERROR_UNREACHABLE: &str = "unreachable";

/// Structural violations found while turning wire JSON into an envelope
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("command envelope is missing `name`")]
    MissingName,

    #[error("failed result must carry a non-empty `error`")]
    MissingError,

    #[error("successful result must not carry an `error`")]
    UnexpectedError,
}

// ============================================================================
// Command envelope
// ============================================================================

/// A named command with its parameters
///
/// On the wire the canonical field names are `name` and `params`. The
/// `intent`/`parameters` shape used by the in-editor TCP server and the
/// `type`/`params` shape used by the HTTP listener decode to the same value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawCommand")]
pub struct CommandEnvelope {
    /// Correlation id, echoed back in the result
    pub id: Option<u64>,
    pub name: String,
    pub params: Params,
}

#[derive(Deserialize)]
struct RawCommand {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default, alias = "intent", alias = "command", alias = "type")]
    name: Option<String>,
    #[serde(default, alias = "parameters")]
    params: Option<Params>,
}

impl TryFrom<RawCommand> for CommandEnvelope {
    type Error = EnvelopeError;

    fn try_from(raw: RawCommand) -> Result<Self, Self::Error> {
        let name = raw
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or(EnvelopeError::MissingName)?;
        Ok(Self {
            id: raw.id,
            name,
            params: raw.params.unwrap_or_default(),
        })
    }
}

impl CommandEnvelope {
    pub fn new(name: impl Into<String>, params: Params) -> Self {
        Self {
            id: None,
            name: name.into(),
            params,
        }
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    /// Canonical JSON form of this envelope
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        if let Some(id) = self.id {
            obj.insert("id".to_string(), Value::from(id));
        }
        obj.insert("name".to_string(), Value::String(self.name.clone()));
        obj.insert("params".to_string(), Value::Object(self.params.clone()));
        Value::Object(obj)
    }
}

impl Serialize for CommandEnvelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

// ============================================================================
// Result envelope
// ============================================================================

/// Outcome of one command
///
/// Either `success` with a `data` object, or failure with a non-empty
/// `error`. The fields are private so the invariant cannot be broken after
/// construction.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawResult")]
pub struct ResultEnvelope {
    id: Option<u64>,
    success: bool,
    data: Option<Params>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct RawResult {
    #[serde(default)]
    id: Option<u64>,
    success: bool,
    #[serde(default)]
    data: Option<Params>,
    #[serde(default)]
    error: Option<String>,
}

impl TryFrom<RawResult> for ResultEnvelope {
    type Error = EnvelopeError;

    fn try_from(raw: RawResult) -> Result<Self, Self::Error> {
        if raw.success {
            if raw.error.is_some() {
                return Err(EnvelopeError::UnexpectedError);
            }
            Ok(Self {
                id: raw.id,
                success: true,
                data: Some(raw.data.unwrap_or_default()),
                error: None,
            })
        } else {
            // An empty `data` next to the error is tolerated and dropped
            let error = raw
                .error
                .filter(|e| !e.is_empty())
                .ok_or(EnvelopeError::MissingError)?;
            Ok(Self {
                id: raw.id,
                success: false,
                data: None,
                error: Some(error),
            })
        }
    }
}

impl ResultEnvelope {
    /// Successful result carrying `data`
    pub fn ok(data: Params) -> Self {
        Self {
            id: None,
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Failed result; an empty message is replaced so `error` is never empty
    pub fn failure(error: impl Into<String>) -> Self {
        let mut error = error.into();
        if error.is_empty() {
            error = "command failed".to_string();
        }
        Self {
            id: None,
            success: false,
            data: None,
            error: Some(error),
        }
    }

    pub fn timeout() -> Self {
        Self::failure(ERROR_TIMEOUT)
    }

    pub fn unreachable() -> Self {
        Self::failure(ERROR_UNREACHABLE)
    }

    pub fn with_id(mut self, id: Option<u64>) -> Self {
        self.id = id;
        self
    }

    pub fn id(&self) -> Option<u64> {
        self.id
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn data(&self) -> Option<&Params> {
        self.data.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_timeout(&self) -> bool {
        self.error() == Some(ERROR_TIMEOUT)
    }

    pub fn is_unreachable(&self) -> bool {
        self.error() == Some(ERROR_UNREACHABLE)
    }

    /// Split into the data on success or the error message on failure
    pub fn into_result(self) -> Result<Params, String> {
        if self.success {
            Ok(self.data.unwrap_or_default())
        } else {
            Err(self.error.unwrap_or_default())
        }
    }

    /// Canonical JSON form of this envelope
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("success".to_string(), Value::Bool(self.success));
        if let Some(data) = &self.data {
            obj.insert("data".to_string(), Value::Object(data.clone()));
        }
        if let Some(error) = &self.error {
            obj.insert("error".to_string(), Value::String(error.clone()));
        }
        if let Some(id) = self.id {
            obj.insert("id".to_string(), Value::from(id));
        }
        Value::Object(obj)
    }
}

impl Serialize for ResultEnvelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}
