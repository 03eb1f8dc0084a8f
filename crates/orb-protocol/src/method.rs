// SPDX-License-Identifier: MIT OR Apache-2.0
//! The encoded method-name grammar.
//!
//! ```text
//! <objectName> "." <methodName>
//! "system.listMethods"
//! ".obj#" <handle> "." <methodName>
//! ```

use crate::ProtocolError;

/// The reserved system call listing every resolvable method.
pub const SYSTEM_LIST_METHODS: &str = "system.listMethods";

const OBJECT_PREFIX: &str = ".obj#";

/// A parsed method name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodName {
    /// `system.listMethods`.
    SystemListMethods,
    /// `.obj#<handle>.<method>` — a call on a referenced object.
    Object {
        /// The opaque handle minted when the reference was marshalled.
        handle: i64,
        /// Method name on the referenced object's class.
        method: String,
    },
    /// `<target>.<method>` — a call on a named object or class.
    Named {
        /// Registered object or class name.
        target: String,
        /// Method name.
        method: String,
    },
}

impl MethodName {
    /// Parse an encoded method name.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::BadMethodName`] when the string does not match the
    /// grammar.
    pub fn parse(encoded: &str) -> Result<Self, ProtocolError> {
        if encoded == SYSTEM_LIST_METHODS {
            return Ok(Self::SystemListMethods);
        }
        if let Some(rest) = encoded.strip_prefix(OBJECT_PREFIX) {
            let (handle, method) = rest.split_once('.').ok_or_else(|| {
                ProtocolError::BadMethodName(format!("{encoded:?} lacks a method segment"))
            })?;
            let handle = handle.parse::<i64>().map_err(|_| {
                ProtocolError::BadMethodName(format!("{handle:?} is not a numeric handle"))
            })?;
            if method.is_empty() {
                return Err(ProtocolError::BadMethodName(format!(
                    "{encoded:?} has an empty method segment"
                )));
            }
            return Ok(Self::Object {
                handle,
                method: method.to_owned(),
            });
        }
        let (target, method) = encoded.split_once('.').ok_or_else(|| {
            ProtocolError::BadMethodName(format!(
                "{encoded:?} is not of the form <target>.<method>"
            ))
        })?;
        if target.is_empty() || method.is_empty() {
            return Err(ProtocolError::BadMethodName(format!(
                "{encoded:?} has an empty segment"
            )));
        }
        Ok(Self::Named {
            target: target.to_owned(),
            method: method.to_owned(),
        })
    }
}
