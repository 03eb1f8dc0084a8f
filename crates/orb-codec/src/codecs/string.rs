// SPDX-License-Identifier: MIT OR Apache-2.0
//! String codec: a trivial pass-through.

use orb_core::{NativeValue, TypeDesc, ValueKind};
use serde_json::Value;

use crate::{CodecError, JsonShape, ObjectMatch, Serializer, SerializerRegistry, SerializerState};

/// Codec for strings.
pub struct StringCodec;

impl Serializer for StringCodec {
    fn name(&self) -> &'static str {
        "string"
    }

    fn serializable_kinds(&self) -> &'static [ValueKind] {
        &[ValueKind::String]
    }

    fn json_shapes(&self) -> &'static [JsonShape] {
        &[JsonShape::String]
    }

    fn can_serialize(
        &self,
        _registry: &SerializerRegistry,
        target: &TypeDesc,
        node: Option<&Value>,
    ) -> bool {
        matches!(target, TypeDesc::String | TypeDesc::Any)
            && node.is_none_or(Value::is_string)
    }

    fn try_unmarshal(
        &self,
        _registry: &SerializerRegistry,
        _state: &mut SerializerState,
        target: &TypeDesc,
        node: &Value,
    ) -> Result<ObjectMatch, CodecError> {
        match (target, node) {
            (TypeDesc::String, Value::String(_)) => Ok(ObjectMatch::EXACT),
            (TypeDesc::Any, Value::String(_)) => Ok(ObjectMatch::OKAY),
            _ => Err(CodecError::Mismatch(format!("{node} is not a string"))),
        }
    }

    fn unmarshal(
        &self,
        _registry: &SerializerRegistry,
        _state: &mut SerializerState,
        target: &TypeDesc,
        node: &Value,
    ) -> Result<NativeValue, CodecError> {
        match node {
            Value::String(s) => Ok(NativeValue::String(s.clone())),
            _ => Err(CodecError::bad_value(target, format!("{node} is not a string"))),
        }
    }

    fn marshal(
        &self,
        _registry: &SerializerRegistry,
        _state: &mut SerializerState,
        value: &NativeValue,
    ) -> Result<Value, CodecError> {
        match value {
            NativeValue::String(s) => Ok(Value::String(s.clone())),
            other => Err(CodecError::Unsupported(format!("{other:?}"))),
        }
    }
}
