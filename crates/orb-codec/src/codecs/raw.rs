// SPDX-License-Identifier: MIT OR Apache-2.0
//! Raw JSON pass-through codec.
//!
//! Declared `TypeDesc::Json` slots carry the node verbatim in both
//! directions, bypassing graph tracking: the payload is opaque data, not
//! part of the object graph.

use orb_core::{NativeValue, TypeDesc, ValueKind};
use serde_json::Value;

use crate::{CodecError, JsonShape, ObjectMatch, Serializer, SerializerRegistry, SerializerState};

/// Codec for raw JSON slots.
pub struct RawJsonCodec;

impl Serializer for RawJsonCodec {
    fn name(&self) -> &'static str {
        "raw-json"
    }

    fn serializable_kinds(&self) -> &'static [ValueKind] {
        &[ValueKind::Json]
    }

    fn json_shapes(&self) -> &'static [JsonShape] {
        &[]
    }

    fn can_serialize(
        &self,
        _registry: &SerializerRegistry,
        target: &TypeDesc,
        _node: Option<&Value>,
    ) -> bool {
        matches!(target, TypeDesc::Json)
    }

    fn try_unmarshal(
        &self,
        _registry: &SerializerRegistry,
        _state: &mut SerializerState,
        _target: &TypeDesc,
        _node: &Value,
    ) -> Result<ObjectMatch, CodecError> {
        Ok(ObjectMatch::EXACT)
    }

    fn unmarshal(
        &self,
        _registry: &SerializerRegistry,
        _state: &mut SerializerState,
        _target: &TypeDesc,
        node: &Value,
    ) -> Result<NativeValue, CodecError> {
        Ok(NativeValue::Json(node.clone()))
    }

    fn marshal(
        &self,
        _registry: &SerializerRegistry,
        _state: &mut SerializerState,
        value: &NativeValue,
    ) -> Result<Value, CodecError> {
        match value {
            NativeValue::Json(v) => Ok(v.clone()),
            other => Err(CodecError::Unsupported(format!("{other:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orb_core::TypeRegistry;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn any_shape_passes_through() {
        let reg = SerializerRegistry::with_defaults(Arc::new(TypeRegistry::new()));
        let mut st = SerializerState::new(crate::SerializerConfig::default());
        let node = json!({"arbitrary": [1, {"deep": true}]});
        let m = reg.try_unmarshal(&mut st, &TypeDesc::Json, &node).unwrap();
        assert_eq!(m, ObjectMatch::EXACT);
        let native = reg.unmarshal(&mut st, &TypeDesc::Json, &node).unwrap();
        assert_eq!(reg.marshal(&mut st, &native).unwrap(), node);
    }
}
