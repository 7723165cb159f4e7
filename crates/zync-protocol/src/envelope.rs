//! Response envelope.
//!
//! Every enveloped endpoint answers with `{"code": <int>, "response": <any>}`.
//! `code == 0` means success and `response` carries the payload; any other
//! code means failure and `response` carries a human-readable message.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtocolError;
use crate::SUCCESS_CODE;

/// The `{code, response}` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Status code, zero on success
    pub code: i64,

    /// Payload on success, message on failure
    #[serde(default)]
    pub response: Value,
}

impl Envelope {
    /// Create a successful envelope
    pub fn success(response: Value) -> Self {
        Self {
            code: SUCCESS_CODE,
            response,
        }
    }

    /// Create a failure envelope
    pub fn failure(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            response: Value::String(message.into()),
        }
    }

    /// Returns true if the code signals success
    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }

    /// Unwrap the payload, or turn a failure code into `ProtocolError::Remote`.
    pub fn into_result(self) -> Result<Value, ProtocolError> {
        if self.is_success() {
            Ok(self.response)
        } else {
            Err(ProtocolError::Remote {
                code: self.code,
                message: message_of(&self.response),
            })
        }
    }
}

/// Render a failure payload as a single message string.
fn message_of(response: &Value) -> String {
    match response {
        Value::String(s) => s.clone(),
        Value::Null => "no message".to_string(),
        other => other.to_string(),
    }
}
