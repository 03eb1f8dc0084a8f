// SPDX-License-Identifier: MIT OR Apache-2.0
//! Wire format for the ORB JSON-RPC bridge.
//!
//! Requests arrive as `{"id", "method", "params", "fixups"?}` and results
//! leave as `{"id", "result", "fixups"?}` or `{"id", "error"}`.  The
//! transport shell is external: it hands the bridge a decoded request tree
//! and writes back the serialized envelope — sockets never appear here.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod ascii;
mod fixups;
mod method;

pub use ascii::to_ascii_json;
pub use fixups::{fixups_to_value, parse_fixup_string, parse_fixups};
pub use method::{MethodName, SYSTEM_LIST_METHODS};

use orb_core::FixUp;
use orb_error::RpcError;
use serde_json::{Map, Value};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors arising from envelope validation or wire-syntax parsing.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The request is not a well-formed JSON-RPC call.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The method string does not match the call grammar.
    #[error("invalid method name: {0}")]
    BadMethodName(String),

    /// The fixups field could not be parsed.
    #[error("invalid fixups: {0}")]
    BadFixups(String),

    /// Underlying JSON failure.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// A decoded JSON-RPC request.
#[derive(Debug, Clone)]
pub struct JsonRpcRequest {
    /// Caller-chosen scalar echoed in the result envelope.
    pub id: Value,
    /// Encoded method name; see [`MethodName`] for the grammar.
    pub method: String,
    /// Positional arguments.
    pub params: Vec<Value>,
    /// Inbound fixup script, already parsed to structured form.
    pub fixups: Vec<FixUp>,
}

impl JsonRpcRequest {
    /// Assemble a request (client side and tests).
    pub fn new(id: impl Into<Value>, method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            id: id.into(),
            method: method.into(),
            params,
            fixups: Vec::new(),
        }
    }

    /// Attach fixups.
    #[must_use]
    pub fn with_fixups(mut self, fixups: Vec<FixUp>) -> Self {
        self.fixups = fixups;
        self
    }

    /// Validate and decode a request tree.
    ///
    /// The `fixups` field is accepted in both legacy forms: the
    /// semicolon-joined string and the structured array of pairs.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::InvalidRequest`] when `method` or `params` is
    /// missing or of the wrong shape, [`ProtocolError::BadFixups`] when the
    /// fixup script does not parse.
    pub fn from_value(value: &Value) -> Result<Self, ProtocolError> {
        let object = value
            .as_object()
            .ok_or_else(|| ProtocolError::InvalidRequest("request is not an object".into()))?;
        let method = object
            .get("method")
            .and_then(Value::as_str)
            .ok_or_else(|| ProtocolError::InvalidRequest("missing string field method".into()))?
            .to_owned();
        let params = object
            .get("params")
            .and_then(Value::as_array)
            .ok_or_else(|| ProtocolError::InvalidRequest("missing array field params".into()))?
            .clone();
        let fixups = match object.get("fixups") {
            None | Some(Value::Null) => Vec::new(),
            Some(raw) => parse_fixups(raw)?,
        };
        Ok(Self {
            id: object.get("id").cloned().unwrap_or(Value::Null),
            method,
            params,
            fixups,
        })
    }

    /// Encode back to a request tree, emitting structured fixups.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut out = Map::new();
        out.insert("id".into(), self.id.clone());
        out.insert("method".into(), Value::String(self.method.clone()));
        out.insert("params".into(), Value::Array(self.params.clone()));
        if !self.fixups.is_empty() {
            out.insert("fixups".into(), fixups_to_value(&self.fixups));
        }
        Value::Object(out)
    }
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// A result envelope: success with an optional fixup script, or an error.
#[derive(Debug, Clone)]
pub struct JsonRpcResult {
    /// Echo of the request id.
    pub id: Value,
    /// Marshalled return value on success.
    pub result: Option<Value>,
    /// Error object on failure.
    pub error: Option<RpcError>,
    /// Outbound fixup script.
    pub fixups: Vec<FixUp>,
}

impl JsonRpcResult {
    /// A success envelope.
    #[must_use]
    pub fn success(id: Value, result: Value, fixups: Vec<FixUp>) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
            fixups,
        }
    }

    /// An error envelope.
    #[must_use]
    pub fn failure(id: Value, error: RpcError) -> Self {
        Self {
            id,
            result: None,
            error: Some(error),
            fixups: Vec::new(),
        }
    }

    /// Whether this envelope carries a result.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Encode to the wire tree.  The `fixups` field appears only when the
    /// marshal produced any.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut out = Map::new();
        out.insert("id".into(), self.id.clone());
        match &self.error {
            Some(error) => {
                let error = serde_json::to_value(error).unwrap_or_else(|_| {
                    // RpcError is plain data; serialization cannot fail, but
                    // a diagnostic envelope beats a panic if it ever does.
                    serde_json::json!({"code": orb_error::ErrorCode::Marshal.code(),
                                       "msg": "error envelope serialization failed"})
                });
                out.insert("error".into(), error);
            }
            None => {
                out.insert(
                    "result".into(),
                    self.result.clone().unwrap_or(Value::Null),
                );
                if !self.fixups.is_empty() {
                    out.insert("fixups".into(), fixups_to_value(&self.fixups));
                }
            }
        }
        Value::Object(out)
    }

    /// Render as an ASCII-clean JSON string for the transport.
    #[must_use]
    pub fn to_ascii_string(&self) -> String {
        to_ascii_json(&self.to_value())
    }

    /// Decode a result tree (client side and tests).
    ///
    /// # Errors
    ///
    /// [`ProtocolError::InvalidRequest`] when the tree is not an envelope,
    /// [`ProtocolError::BadFixups`] when the fixup script does not parse.
    pub fn from_value(value: &Value) -> Result<Self, ProtocolError> {
        let object = value
            .as_object()
            .ok_or_else(|| ProtocolError::InvalidRequest("result is not an object".into()))?;
        let error = match object.get("error") {
            Some(raw) => Some(
                serde_json::from_value::<RpcError>(raw.clone())
                    .map_err(|e| ProtocolError::InvalidRequest(format!("bad error object: {e}")))?,
            ),
            None => None,
        };
        if error.is_none() && !object.contains_key("result") {
            return Err(ProtocolError::InvalidRequest(
                "envelope has neither result nor error".into(),
            ));
        }
        let fixups = match object.get("fixups") {
            None | Some(Value::Null) => Vec::new(),
            Some(raw) => parse_fixups(raw)?,
        };
        Ok(Self {
            id: object.get("id").cloned().unwrap_or(Value::Null),
            result: object.get("result").cloned(),
            error,
            fixups,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use orb_core::PathToken;
    use orb_error::ErrorCode;
    use serde_json::json;

    #[test]
    fn request_roundtrip() {
        let req = JsonRpcRequest::new(1, "svc.echo", vec![json!(42), json!("hi")]);
        let tree = req.to_value();
        let back = JsonRpcRequest::from_value(&tree).unwrap();
        assert_eq!(back.id, json!(1));
        assert_eq!(back.method, "svc.echo");
        assert_eq!(back.params, vec![json!(42), json!("hi")]);
        assert!(back.fixups.is_empty());
    }

    #[test]
    fn request_requires_method_and_params() {
        assert!(JsonRpcRequest::from_value(&json!({"id": 1, "params": []})).is_err());
        assert!(JsonRpcRequest::from_value(&json!({"id": 1, "method": "a.b"})).is_err());
        assert!(JsonRpcRequest::from_value(&json!({"id": 1, "method": "a.b", "params": {}})).is_err());
        assert!(JsonRpcRequest::from_value(&json!([1, 2])).is_err());
    }

    #[test]
    fn request_id_defaults_to_null() {
        let req =
            JsonRpcRequest::from_value(&json!({"method": "a.b", "params": []})).unwrap();
        assert_eq!(req.id, Value::Null);
    }

    #[test]
    fn request_accepts_string_fixups() {
        let tree = json!({
            "id": 7,
            "method": "svc.identity",
            "params": [{"v": 1}, null],
            "fixups": "params[1]=params[0];"
        });
        let req = JsonRpcRequest::from_value(&tree).unwrap();
        assert_eq!(req.fixups.len(), 1);
        assert_eq!(
            req.fixups[0].target,
            vec![PathToken::key("params"), PathToken::index(1)]
        );
    }

    #[test]
    fn success_envelope_shape() {
        let out = JsonRpcResult::success(json!(1), json!(42), vec![]).to_value();
        assert_eq!(out, json!({"id": 1, "result": 42}));
    }

    #[test]
    fn success_envelope_with_fixups() {
        let fix = FixUp::new(
            vec![PathToken::key("result"), PathToken::index(1)],
            vec![PathToken::key("result"), PathToken::index(0)],
        );
        let out = JsonRpcResult::success(json!(1), json!([5, null]), vec![fix]).to_value();
        assert_eq!(out["fixups"], json!([[["result", "[1]"], ["result", "[0]"]]]));
    }

    #[test]
    fn error_envelope_shape() {
        let out = JsonRpcResult::failure(
            json!(3),
            RpcError::new(ErrorCode::NoMethod, "svc.missing"),
        )
        .to_value();
        assert_eq!(out, json!({"id": 3, "error": {"code": 591, "msg": "svc.missing"}}));
    }

    #[test]
    fn result_roundtrip() {
        let fix = FixUp::new(
            vec![PathToken::key("result"), PathToken::key("next")],
            vec![PathToken::key("result")],
        );
        let env = JsonRpcResult::success(json!(9), json!({"next": null}), vec![fix.clone()]);
        let back = JsonRpcResult::from_value(&env.to_value()).unwrap();
        assert!(back.is_success());
        assert_eq!(back.fixups, vec![fix]);
    }

    #[test]
    fn envelope_without_result_or_error_is_invalid() {
        assert!(JsonRpcResult::from_value(&json!({"id": 1})).is_err());
    }
}
