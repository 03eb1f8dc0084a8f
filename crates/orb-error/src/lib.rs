// SPDX-License-Identifier: MIT OR Apache-2.0
//! Stable wire error taxonomy for the ORB JSON-RPC bridge.
//!
//! Every failure that crosses the wire carries a numeric [`ErrorCode`] that is
//! guaranteed never to change, plus a human-readable message and an optional
//! trace text.  [`RpcError`] is the serializable error object embedded in a
//! result envelope.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use std::fmt;

/// Wire code of a successful result envelope.
///
/// Success envelopes do not carry an error object; the constant exists so
/// transports and clients can compare against a named value instead of a
/// bare zero.
pub const CODE_SUCCESS: i64 = 0;

// ---------------------------------------------------------------------------
// ErrorCategory
// ---------------------------------------------------------------------------

/// Broad family that an [`ErrorCode`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The invoked method itself threw.
    Invocation,
    /// Client-side connection or transport failure.
    Transport,
    /// The request envelope was malformed.
    Protocol,
    /// Method lookup, overload resolution, or arity matching failed.
    Dispatch,
    /// A codec rejected a value in either direction.
    Codec,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Invocation => "invocation",
            Self::Transport => "transport",
            Self::Protocol => "protocol",
            Self::Dispatch => "dispatch",
            Self::Codec => "codec",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// ErrorCode
// ---------------------------------------------------------------------------

/// Stable numeric error codes understood by legacy bridge clients.
///
/// The integer values are part of the wire contract and never change across
/// releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The invoked method threw; the message and trace are surfaced verbatim.
    RemoteException,
    /// Client-side connection or transport failure (never produced by the
    /// server; reserved for clients reporting their own failures).
    Transport,
    /// The request was not well-formed JSON-RPC, or a fixup script failed to
    /// apply.
    Parse,
    /// Lookup, overload resolution, or arity matching failed.
    NoMethod,
    /// A codec rejected an inbound value.
    Unmarshal,
    /// A return value had no applicable codec.
    Marshal,
}

impl ErrorCode {
    /// The stable wire integer for this code.
    #[must_use]
    pub fn code(self) -> i64 {
        match self {
            Self::RemoteException => 490,
            Self::Transport => 550,
            Self::Parse => 590,
            Self::NoMethod => 591,
            Self::Unmarshal => 592,
            Self::Marshal => 593,
        }
    }

    /// Reverse lookup from a wire integer.
    #[must_use]
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            490 => Some(Self::RemoteException),
            550 => Some(Self::Transport),
            590 => Some(Self::Parse),
            591 => Some(Self::NoMethod),
            592 => Some(Self::Unmarshal),
            593 => Some(Self::Marshal),
            _ => None,
        }
    }

    /// Stable string tag (e.g. `"no_method"`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RemoteException => "remote_exception",
            Self::Transport => "transport",
            Self::Parse => "parse",
            Self::NoMethod => "no_method",
            Self::Unmarshal => "unmarshal",
            Self::Marshal => "marshal",
        }
    }

    /// The broad [`ErrorCategory`] this code belongs to.
    #[must_use]
    pub fn category(self) -> ErrorCategory {
        match self {
            Self::RemoteException => ErrorCategory::Invocation,
            Self::Transport => ErrorCategory::Transport,
            Self::Parse => ErrorCategory::Protocol,
            Self::NoMethod => ErrorCategory::Dispatch,
            Self::Unmarshal | Self::Marshal => ErrorCategory::Codec,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RpcError
// ---------------------------------------------------------------------------

/// Serializable error object carried inside an error result envelope.
///
/// Wire shape: `{"code": <int>, "msg": <string>, "trace"?: <string>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    /// Stable numeric code (see [`ErrorCode::code`]).
    pub code: i64,
    /// Human-readable description.
    pub msg: String,
    /// Stack/trace text for remote exceptions, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

impl RpcError {
    /// Create an error with the given code and message.
    pub fn new(code: ErrorCode, msg: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            msg: msg.into(),
            trace: None,
        }
    }

    /// Attach trace text.
    #[must_use]
    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.trace = Some(trace.into());
        self
    }

    /// The typed [`ErrorCode`], when the numeric code is a known one.
    #[must_use]
    pub fn kind(&self) -> Option<ErrorCode> {
        ErrorCode::from_code(self.code)
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.msg)
    }
}

impl std::error::Error for RpcError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const ALL_CODES: &[ErrorCode] = &[
        ErrorCode::RemoteException,
        ErrorCode::Transport,
        ErrorCode::Parse,
        ErrorCode::NoMethod,
        ErrorCode::Unmarshal,
        ErrorCode::Marshal,
    ];

    // -- Wire integers ---------------------------------------------------

    #[test]
    fn wire_integers_are_stable() {
        assert_eq!(ErrorCode::RemoteException.code(), 490);
        assert_eq!(ErrorCode::Transport.code(), 550);
        assert_eq!(ErrorCode::Parse.code(), 590);
        assert_eq!(ErrorCode::NoMethod.code(), 591);
        assert_eq!(ErrorCode::Unmarshal.code(), 592);
        assert_eq!(ErrorCode::Marshal.code(), 593);
        assert_eq!(CODE_SUCCESS, 0);
    }

    #[test]
    fn from_code_roundtrip() {
        for code in ALL_CODES {
            assert_eq!(ErrorCode::from_code(code.code()), Some(*code));
        }
        assert_eq!(ErrorCode::from_code(0), None);
        assert_eq!(ErrorCode::from_code(9999), None);
    }

    #[test]
    fn all_codes_have_unique_integers() {
        let mut seen = HashSet::new();
        for code in ALL_CODES {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    // -- Categories ------------------------------------------------------

    #[test]
    fn codec_codes_categorised() {
        assert_eq!(ErrorCode::Unmarshal.category(), ErrorCategory::Codec);
        assert_eq!(ErrorCode::Marshal.category(), ErrorCategory::Codec);
    }

    #[test]
    fn remaining_codes_categorised() {
        assert_eq!(
            ErrorCode::RemoteException.category(),
            ErrorCategory::Invocation
        );
        assert_eq!(ErrorCode::Transport.category(), ErrorCategory::Transport);
        assert_eq!(ErrorCode::Parse.category(), ErrorCategory::Protocol);
        assert_eq!(ErrorCode::NoMethod.category(), ErrorCategory::Dispatch);
    }

    // -- RpcError --------------------------------------------------------

    #[test]
    fn rpc_error_display() {
        let err = RpcError::new(ErrorCode::NoMethod, "svc.missing");
        assert_eq!(err.to_string(), "[591] svc.missing");
    }

    #[test]
    fn rpc_error_serializes_without_absent_trace() {
        let err = RpcError::new(ErrorCode::Unmarshal, "arg 0: bad value");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"code": 592, "msg": "arg 0: bad value"})
        );
    }

    #[test]
    fn rpc_error_serializes_trace_when_present() {
        let err = RpcError::new(ErrorCode::RemoteException, "boom").with_trace("at svc.echo");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], 490);
        assert_eq!(json["trace"], "at svc.echo");
    }

    #[test]
    fn rpc_error_kind() {
        let err = RpcError::new(ErrorCode::Marshal, "no codec");
        assert_eq!(err.kind(), Some(ErrorCode::Marshal));
        let unknown = RpcError {
            code: 123,
            msg: "?".into(),
            trace: None,
        };
        assert_eq!(unknown.kind(), None);
    }

    #[test]
    fn rpc_error_deserializes_both_shapes() {
        let with_trace: RpcError =
            serde_json::from_str(r#"{"code":490,"msg":"x","trace":"t"}"#).unwrap();
        assert_eq!(with_trace.trace.as_deref(), Some("t"));
        let without: RpcError = serde_json::from_str(r#"{"code":591,"msg":"y"}"#).unwrap();
        assert!(without.trace.is_none());
    }
}
