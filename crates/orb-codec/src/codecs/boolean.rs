// SPDX-License-Identifier: MIT OR Apache-2.0
//! Boolean codec.  Accepts the strings `"true"` / `"false"` as a weaker
//! match for legacy clients that stringify form values.

use orb_core::{NativeValue, TypeDesc, ValueKind};
use serde_json::Value;

use crate::{CodecError, JsonShape, ObjectMatch, Serializer, SerializerRegistry, SerializerState};

/// Codec for booleans.
pub struct BooleanCodec;

impl Serializer for BooleanCodec {
    fn name(&self) -> &'static str {
        "boolean"
    }

    fn serializable_kinds(&self) -> &'static [ValueKind] {
        &[ValueKind::Bool]
    }

    fn json_shapes(&self) -> &'static [JsonShape] {
        &[JsonShape::Bool, JsonShape::String]
    }

    fn can_serialize(
        &self,
        _registry: &SerializerRegistry,
        target: &TypeDesc,
        node: Option<&Value>,
    ) -> bool {
        match target {
            TypeDesc::Bool => node.is_none_or(|n| self.json_shapes().contains(&JsonShape::of(n))),
            TypeDesc::Any => node.is_some_and(Value::is_boolean),
            _ => false,
        }
    }

    fn try_unmarshal(
        &self,
        _registry: &SerializerRegistry,
        _state: &mut SerializerState,
        target: &TypeDesc,
        node: &Value,
    ) -> Result<ObjectMatch, CodecError> {
        match node {
            Value::Bool(_) => Ok(ObjectMatch::EXACT),
            Value::String(s) if s == "true" || s == "false" => Ok(ObjectMatch::SIMILAR),
            _ => Err(CodecError::Mismatch(format!("{node} is not a boolean for {target}"))),
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
            Value::Bool(b) => Ok(NativeValue::Bool(*b)),
            Value::String(s) if s == "true" => Ok(NativeValue::Bool(true)),
            Value::String(s) if s == "false" => Ok(NativeValue::Bool(false)),
            _ => Err(CodecError::bad_value(target, format!("{node} is not a boolean"))),
        }
    }

    fn marshal(
        &self,
        _registry: &SerializerRegistry,
        _state: &mut SerializerState,
        value: &NativeValue,
    ) -> Result<Value, CodecError> {
        match value {
            NativeValue::Bool(b) => Ok(Value::Bool(*b)),
            other => Err(CodecError::Unsupported(format!("{other:?}"))),
        }
    }
}
