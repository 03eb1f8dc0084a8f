// SPDX-License-Identifier: MIT OR Apache-2.0
//! Registration and dispatch core of the ORB JSON-RPC bridge.
//!
//! A [`Bridge`] owns the registration tables — named objects, classes with
//! static methods, reference class sets, and the handle map for
//! reference-substituted instances — and dispatches decoded requests:
//! fixup application, method-name parsing, overload resolution, argument
//! unmarshalling, context injection, hook rounds, invocation, and result
//! marshalling, all recovered into an error envelope at the boundary.
//!
//! One process-wide [global bridge](Bridge::global) holds default
//! registrations; any number of [session bridges](Bridge::session) shadow
//! it and delegate unresolved object/class lookups to it exactly once.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod analyzer;
mod bridge;
mod callbacks;
mod local_args;
mod resolve;

pub use analyzer::{ClassAnalyzer, ClassData, MethodEntry, MethodKey};
pub use bridge::{Bridge, ObjectInstance};
pub use callbacks::{CallbackController, InvocationCallback};
pub use local_args::{LocalArgController, LocalArgResolver};

use orb_error::{ErrorCode, RpcError};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures recovered into an error envelope during dispatch.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The request was not a well-formed call.
    #[error("parse error: {0}")]
    Parse(String),

    /// Lookup, overload resolution, or arity matching failed.
    #[error("no method: {0}")]
    NoMethod(String),

    /// An argument could not be unmarshalled.
    #[error("unmarshal error: {0}")]
    Unmarshal(String),

    /// The return value could not be marshalled.
    #[error("marshal error: {0}")]
    Marshal(String),

    /// An inbound fixup script was malformed or did not apply.
    #[error("fixup error: {0}")]
    Fixup(String),

    /// The invoked method (or a pre/post hook) threw.
    #[error("remote exception: {msg}")]
    Remote {
        /// The throwable's message, verbatim.
        msg: String,
        /// Trace text, when available.
        trace: Option<String>,
    },
}

impl BridgeError {
    /// Convert into the wire error object.  Fixup failures surface with the
    /// parse code: the wire code set is closed and a broken fixup script
    /// means the request never decoded into a usable call.
    #[must_use]
    pub fn to_rpc_error(&self) -> RpcError {
        match self {
            Self::Parse(msg) => RpcError::new(ErrorCode::Parse, msg.clone()),
            Self::Fixup(msg) => RpcError::new(ErrorCode::Parse, format!("fixup error: {msg}")),
            Self::NoMethod(msg) => RpcError::new(ErrorCode::NoMethod, msg.clone()),
            Self::Unmarshal(msg) => RpcError::new(ErrorCode::Unmarshal, msg.clone()),
            Self::Marshal(msg) => RpcError::new(ErrorCode::Marshal, msg.clone()),
            Self::Remote { msg, trace } => {
                let error = RpcError::new(ErrorCode::RemoteException, msg.clone());
                match trace {
                    Some(trace) => error.with_trace(trace.clone()),
                    None => error,
                }
            }
        }
    }
}

/// Failures of the registration API.  These propagate to the caller of the
/// admin surface and are never emitted on the wire.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// The name is already bound to a different class.
    #[error("name conflict: {name} is already bound to a different class")]
    NameConflict {
        /// The contested registration name.
        name: String,
    },

    /// Reference registration was attempted on the global bridge.
    #[error("reference classes cannot be registered on the global bridge")]
    ScopeError,

    /// The declared interface is not assignable from the instance's class.
    #[error("interface {interface} is not assignable from class {class}")]
    InterfaceMismatch {
        /// Declared interface name.
        interface: String,
        /// The instance's class name.
        class: String,
    },
}
