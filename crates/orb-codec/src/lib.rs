// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pluggable type codecs for the ORB bridge.
//!
//! A [`Serializer`] converts between [`NativeValue`]s and `serde_json`
//! trees.  The [`SerializerRegistry`] indexes codecs in both directions —
//! by native kind for marshalling and by declared target type plus JSON
//! shape for unmarshalling — and drives the per-call graph tracking that
//! turns duplicate and cyclic graph edges into [fixups](orb_core::FixUp).
//!
//! Three operations per codec:
//!
//! - [`Serializer::try_unmarshal`] — a cheap compatibility probe used by
//!   overload resolution; returns an [`ObjectMatch`] score and must not
//!   materialize heavyweight values.
//! - [`Serializer::unmarshal`] — actually construct the native value.
//! - [`Serializer::marshal`] — produce the JSON node.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod codecs;
mod config;
mod fixup;
mod object_match;
mod state;

pub use config::{ConfigError, ConfigWarning, SerializerConfig};
pub use fixup::FixupApplier;
pub use object_match::ObjectMatch;
pub use state::{RefKind, ReferenceBinder, SerializerState};

use orb_core::{NativeValue, PathToken, TypeDesc, TypeRegistry, ValueKind, render_path};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures raised by codecs and the fixup machinery.
#[derive(Debug, Error)]
pub enum CodecError {
    /// No codec accepts the (target, shape) pair; used by overload
    /// resolution to discard a candidate.
    #[error("no serializer matched: {0}")]
    Mismatch(String),

    /// A codec matched but the value could not be converted.
    #[error("bad value for {target}: {reason}")]
    BadValue {
        /// Declared target type.
        target: String,
        /// Conversion failure detail.
        reason: String,
    },

    /// A native value has no applicable codec.
    #[error("no serializer can marshal {0}")]
    Unsupported(String),

    /// A reference shape named a handle this bridge does not know.
    #[error("stale object handle {0}")]
    StaleHandle(i64),

    /// A cycle was found while cycle fixups are disabled.
    #[error("circular reference detected")]
    CircularReference,

    /// A fixup source path resolved to nothing.
    #[error("fixup source missing at {0}")]
    MissingSource(String),

    /// A fixup path was malformed or pointed through a non-container.
    #[error("malformed fixup path: {0}")]
    BadPath(String),
}

impl CodecError {
    fn bad_value(target: &TypeDesc, reason: impl Into<String>) -> Self {
        Self::BadValue {
            target: target.to_string(),
            reason: reason.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// JSON shapes
// ---------------------------------------------------------------------------

/// The shape of a JSON node, as exposed by the parse tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsonShape {
    /// `null`
    Null,
    /// `true` / `false`
    Bool,
    /// Any numeric literal.
    Number,
    /// String literal.
    String,
    /// Array.
    Array,
    /// Object.
    Object,
}

impl JsonShape {
    /// Classify a node.
    #[must_use]
    pub fn of(node: &Value) -> Self {
        match node {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Bool,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
        }
    }
}

// ---------------------------------------------------------------------------
// Serializer
// ---------------------------------------------------------------------------

/// One pluggable type codec.
///
/// Codecs are stateless; all per-call bookkeeping lives in the
/// [`SerializerState`] threaded through each operation.  Recursion into
/// child values goes back through the registry so graph tracking sees every
/// node.
pub trait Serializer: Send + Sync {
    /// Short codec name for diagnostics.
    fn name(&self) -> &'static str;

    /// Native kinds this codec can marshal.
    fn serializable_kinds(&self) -> &'static [ValueKind];

    /// JSON shapes this codec can unmarshal from.  Empty means any shape.
    fn json_shapes(&self) -> &'static [JsonShape];

    /// Whether this codec matches the declared target and (when known) the
    /// JSON node.  A `None` node matches on the target alone.  The registry
    /// is available for cheap declaration lookups (e.g. "is this hint a
    /// declared bean class").
    fn can_serialize(
        &self,
        registry: &SerializerRegistry,
        target: &TypeDesc,
        node: Option<&Value>,
    ) -> bool;

    /// Whether this codec can marshal the given native value.
    fn can_marshal(&self, value: &NativeValue) -> bool {
        self.serializable_kinds().contains(&value.kind())
    }

    /// Cheap type-compatibility probe.
    ///
    /// # Errors
    ///
    /// [`CodecError::Mismatch`] when the value cannot possibly convert.
    fn try_unmarshal(
        &self,
        registry: &SerializerRegistry,
        state: &mut SerializerState,
        target: &TypeDesc,
        node: &Value,
    ) -> Result<ObjectMatch, CodecError>;

    /// Construct the native value.
    ///
    /// # Errors
    ///
    /// [`CodecError::BadValue`] on conversion failure.
    fn unmarshal(
        &self,
        registry: &SerializerRegistry,
        state: &mut SerializerState,
        target: &TypeDesc,
        node: &Value,
    ) -> Result<NativeValue, CodecError>;

    /// Produce the JSON node for a native value.
    ///
    /// # Errors
    ///
    /// [`CodecError::Unsupported`] for values outside this codec's kinds.
    fn marshal(
        &self,
        registry: &SerializerRegistry,
        state: &mut SerializerState,
        value: &NativeValue,
    ) -> Result<Value, CodecError>;
}

// ---------------------------------------------------------------------------
// SerializerRegistry
// ---------------------------------------------------------------------------

/// Ordered codec registry.
///
/// Populated at bridge construction and immutable afterwards; lookups walk
/// the registration order, so more discriminating codecs (reference, date,
/// containers) are registered before the generic fallbacks.
pub struct SerializerRegistry {
    types: Arc<TypeRegistry>,
    codecs: Vec<Arc<dyn Serializer>>,
}

impl SerializerRegistry {
    /// An empty registry sharing the given type declarations.
    #[must_use]
    pub fn new(types: Arc<TypeRegistry>) -> Self {
        Self {
            types,
            codecs: Vec::new(),
        }
    }

    /// A registry pre-loaded with every built-in codec.
    #[must_use]
    pub fn with_defaults(types: Arc<TypeRegistry>) -> Self {
        let mut reg = Self::new(types);
        reg.register(Arc::new(codecs::ReferenceCodec));
        reg.register(Arc::new(codecs::DateCodec));
        reg.register(Arc::new(codecs::EnumCodec));
        reg.register(Arc::new(codecs::BeanCodec));
        reg.register(Arc::new(codecs::ListCodec));
        reg.register(Arc::new(codecs::SetCodec));
        reg.register(Arc::new(codecs::MapCodec));
        reg.register(Arc::new(codecs::ArrayCodec));
        reg.register(Arc::new(codecs::RawJsonCodec));
        reg.register(Arc::new(codecs::StringCodec));
        reg.register(Arc::new(codecs::NumberCodec));
        reg.register(Arc::new(codecs::BooleanCodec));
        reg
    }

    /// Append a codec.  Construction-time only.
    pub fn register(&mut self, codec: Arc<dyn Serializer>) {
        self.codecs.push(codec);
    }

    /// The shared type declarations.
    #[must_use]
    pub fn types(&self) -> &Arc<TypeRegistry> {
        &self.types
    }

    fn find_unmarshaler(&self, target: &TypeDesc, node: &Value) -> Option<&Arc<dyn Serializer>> {
        self.codecs
            .iter()
            .find(|c| c.can_serialize(self, target, Some(node)))
    }

    fn find_marshaler(&self, value: &NativeValue) -> Option<&Arc<dyn Serializer>> {
        self.codecs.iter().find(|c| c.can_marshal(value))
    }

    /// Probe whether `node` can convert into `target`, without building it.
    ///
    /// # Errors
    ///
    /// [`CodecError::Mismatch`] when no codec applies.
    pub fn try_unmarshal(
        &self,
        state: &mut SerializerState,
        target: &TypeDesc,
        node: &Value,
    ) -> Result<ObjectMatch, CodecError> {
        let target = match target {
            TypeDesc::Option(inner) => {
                if node.is_null() {
                    return Ok(ObjectMatch::OKAY);
                }
                inner.as_ref()
            }
            other => other,
        };
        if node.is_null() {
            return if target.nullable() {
                Ok(ObjectMatch::OKAY)
            } else {
                Err(CodecError::Mismatch(format!(
                    "null is not acceptable for {target}"
                )))
            };
        }
        match self.find_unmarshaler(target, node) {
            Some(codec) => codec.try_unmarshal(self, state, target, node),
            None => Err(CodecError::Mismatch(format!(
                "no serializer accepts {:?} for target {target}",
                JsonShape::of(node)
            ))),
        }
    }

    /// Convert `node` into a native value of `target`.
    ///
    /// # Errors
    ///
    /// [`CodecError::Mismatch`] when no codec applies,
    /// [`CodecError::BadValue`] when conversion fails.
    pub fn unmarshal(
        &self,
        state: &mut SerializerState,
        target: &TypeDesc,
        node: &Value,
    ) -> Result<NativeValue, CodecError> {
        let target = match target {
            TypeDesc::Option(inner) => {
                if node.is_null() {
                    return Ok(NativeValue::Null);
                }
                inner.as_ref()
            }
            other => other,
        };
        if node.is_null() {
            return if target.nullable() {
                Ok(NativeValue::Null)
            } else {
                Err(CodecError::Mismatch(format!(
                    "null is not acceptable for {target}"
                )))
            };
        }
        match self.find_unmarshaler(target, node) {
            Some(codec) => codec.unmarshal(self, state, target, node),
            None => Err(CodecError::Mismatch(format!(
                "no serializer accepts {:?} for target {target}",
                JsonShape::of(node)
            ))),
        }
    }

    /// Marshal a native value, tracking graph identity.
    ///
    /// A node visited for the second time becomes a `null` placeholder plus
    /// a fixup — or, depending on configuration, a re-expansion (duplicates)
    /// or an error (cycles).
    ///
    /// # Errors
    ///
    /// [`CodecError::Unsupported`] for values without a codec,
    /// [`CodecError::CircularReference`] when a cycle is found and cycle
    /// fixups are disabled.
    pub fn marshal(
        &self,
        state: &mut SerializerState,
        value: &NativeValue,
    ) -> Result<Value, CodecError> {
        if matches!(value, NativeValue::Null) {
            return Ok(Value::Null);
        }
        let Some(id) = value.identity() else {
            return self.dispatch_marshal(state, value);
        };
        if let Some(original) = state.first_occurrence(id) {
            let original = original.clone();
            if state.is_ancestor(id) {
                // Cycle: the ancestor chain contains this node.
                return if state.config().fixup_circular_refs {
                    tracing::trace!(
                        target: "orb.codec",
                        path = %render_path(state.current_path()),
                        "cycle detected, emitting fixup"
                    );
                    state.record_fixup(original);
                    Ok(Value::Null)
                } else {
                    Err(CodecError::CircularReference)
                };
            }
            if state.config().fixup_duplicates {
                state.record_fixup(original);
                return Ok(Value::Null);
            }
            // Duplicate fixups disabled: re-expand, but keep the node on the
            // ancestor stack so a cycle inside the re-expansion still trips.
            state.reenter(id);
            let result = self.dispatch_marshal(state, value);
            state.leave();
            return result;
        }
        state.mark_visited(id);
        let result = self.dispatch_marshal(state, value);
        state.leave();
        result
    }

    /// Marshal a child value at `token` below the current path.
    ///
    /// # Errors
    ///
    /// Propagates the child's marshal failure.
    pub fn marshal_child(
        &self,
        state: &mut SerializerState,
        token: PathToken,
        value: &NativeValue,
    ) -> Result<Value, CodecError> {
        state.push_path(token);
        let result = self.marshal(state, value);
        state.pop_path();
        result
    }

    fn dispatch_marshal(
        &self,
        state: &mut SerializerState,
        value: &NativeValue,
    ) -> Result<Value, CodecError> {
        match self.find_marshaler(value) {
            Some(codec) => codec.marshal(self, state, value),
            None => Err(CodecError::Unsupported(format!("{value:?}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
