//! Wire protocol for the editor bridge
//!
//! Defines the envelopes exchanged between the bridge client and the
//! listener running inside the editor, and the newline-delimited JSON framing
//! used to carry them over TCP.
//!
//! ```text
//! → {"id":1,"name":"spawn_actor","params":{"class":"PointLight","location":[0,0,200]}}
//! ← {"success":true,"data":{"name":"PointLight_1"},"id":1}
//! ← {"success":false,"error":"class not found: Missing","id":2}
//! ```

mod codec;
mod envelope;

pub use codec::{
    decode_command, decode_result, encode_command, encode_result, parse_command, parse_result,
    DecodeError, Decoded, FrameDecoder, DEFAULT_MAX_FRAME_BYTES,
};
pub use envelope::{
    CommandEnvelope, EnvelopeError, Params, ResultEnvelope, ERROR_TIMEOUT, ERROR_UNREACHABLE,
};

/// Reserved no-op command used for liveness probes
pub const PING_COMMAND: &str = "ping";

/// Reserved command returning the registry listing
pub const HELP_COMMAND: &str = "help";

/// Reserved command running a list of commands in one round trip
pub const BATCH_COMMAND: &str = "batch_operations";
