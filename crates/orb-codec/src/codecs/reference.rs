// SPDX-License-Identifier: MIT OR Apache-2.0
//! Reference and callable-reference codec.
//!
//! Instances of classes registered for reference substitution are replaced
//! on the wire by an opaque handle:
//! `{"javaClass": "<class>", "objectID": <handle>, "JSONRPCType": "Reference"|"CallableReference"}`.
//! On unmarshal the same shape re-binds to the original instance by handle.

use orb_core::{NativeValue, TypeDesc, ValueKind};
use serde_json::{Value, json};

use crate::codecs::CLASS_HINT;
use crate::state::RefKind;
use crate::{CodecError, JsonShape, ObjectMatch, Serializer, SerializerRegistry, SerializerState};

/// Wire field naming the reference flavor.
pub(crate) const RPC_TYPE: &str = "JSONRPCType";
/// Wire field carrying the handle.
pub(crate) const OBJECT_ID: &str = "objectID";

/// Codec for reference-substituted instances.
pub struct ReferenceCodec;

fn is_reference_shape(node: &Value) -> bool {
    node.as_object().is_some_and(|o| {
        matches!(
            o.get(RPC_TYPE).and_then(Value::as_str),
            Some("Reference" | "CallableReference")
        ) && o.contains_key(OBJECT_ID)
    })
}

impl Serializer for ReferenceCodec {
    fn name(&self) -> &'static str {
        "reference"
    }

    fn serializable_kinds(&self) -> &'static [ValueKind] {
        &[ValueKind::Instance]
    }

    fn json_shapes(&self) -> &'static [JsonShape] {
        &[JsonShape::Object]
    }

    fn can_serialize(
        &self,
        _registry: &SerializerRegistry,
        target: &TypeDesc,
        node: Option<&Value>,
    ) -> bool {
        matches!(target, TypeDesc::Object(_) | TypeDesc::Any)
            && node.is_none_or(is_reference_shape)
    }

    fn try_unmarshal(
        &self,
        registry: &SerializerRegistry,
        _state: &mut SerializerState,
        target: &TypeDesc,
        node: &Value,
    ) -> Result<ObjectMatch, CodecError> {
        if !is_reference_shape(node) {
            return Err(CodecError::Mismatch(format!(
                "{node} is not a reference shape for {target}"
            )));
        }
        match target {
            TypeDesc::Any => Ok(ObjectMatch::EXACT),
            TypeDesc::Object(want) => {
                let class = node.get(CLASS_HINT).and_then(Value::as_str).unwrap_or("");
                if registry.types().class_assignable(class, want) {
                    Ok(ObjectMatch::EXACT)
                } else {
                    Err(CodecError::Mismatch(format!(
                        "referenced class {class} is not assignable to {want}"
                    )))
                }
            }
            _ => Err(CodecError::Mismatch(format!("{target} is not a reference target"))),
        }
    }

    fn unmarshal(
        &self,
        _registry: &SerializerRegistry,
        state: &mut SerializerState,
        target: &TypeDesc,
        node: &Value,
    ) -> Result<NativeValue, CodecError> {
        let handle = node
            .get(OBJECT_ID)
            .and_then(Value::as_i64)
            .ok_or_else(|| CodecError::bad_value(target, "missing numeric objectID"))?;
        let binder = state
            .binder()
            .ok_or_else(|| CodecError::bad_value(target, "no reference binder attached"))?;
        binder
            .resolve_handle(handle)
            .map(NativeValue::Instance)
            .ok_or(CodecError::StaleHandle(handle))
    }

    fn marshal(
        &self,
        _registry: &SerializerRegistry,
        state: &mut SerializerState,
        value: &NativeValue,
    ) -> Result<Value, CodecError> {
        let NativeValue::Instance(instance) = value else {
            return Err(CodecError::Unsupported(format!("{value:?}")));
        };
        let class = instance.class().name.clone();
        let Some(binder) = state.binder() else {
            return Err(CodecError::Unsupported(format!(
                "instance of {class} with no reference binder"
            )));
        };
        let Some(kind) = binder.reference_kind(&class) else {
            return Err(CodecError::Unsupported(format!(
                "class {class} is not registered as a reference"
            )));
        };
        let handle = binder.bind_handle(instance);
        let rpc_type = match kind {
            RefKind::Reference => "Reference",
            RefKind::Callable => "CallableReference",
        };
        Ok(json!({
            CLASS_HINT: class,
            OBJECT_ID: handle,
            RPC_TYPE: rpc_type,
        }))
    }
}
