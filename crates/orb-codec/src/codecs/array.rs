// SPDX-License-Identifier: MIT OR Apache-2.0
//! Typed-array codec.
//!
//! Native typed arrays marshal element-by-element through the element's
//! codec and appear on the wire as a plain JSON array — no class hint, the
//! dimension and component type live in the declared target.

use orb_core::{NativeValue, PathToken, TypeDesc, ValueKind};
use serde_json::Value;

use crate::{CodecError, JsonShape, ObjectMatch, Serializer, SerializerRegistry, SerializerState};

/// Codec for declared `TypeDesc::Array` targets.
pub struct ArrayCodec;

impl Serializer for ArrayCodec {
    fn name(&self) -> &'static str {
        "array"
    }

    fn serializable_kinds(&self) -> &'static [ValueKind] {
        &[ValueKind::Array]
    }

    fn json_shapes(&self) -> &'static [JsonShape] {
        &[JsonShape::Array]
    }

    fn can_serialize(
        &self,
        _registry: &SerializerRegistry,
        target: &TypeDesc,
        node: Option<&Value>,
    ) -> bool {
        matches!(target, TypeDesc::Array(_)) && node.is_none_or(Value::is_array)
    }

    fn try_unmarshal(
        &self,
        registry: &SerializerRegistry,
        state: &mut SerializerState,
        target: &TypeDesc,
        node: &Value,
    ) -> Result<ObjectMatch, CodecError> {
        let (TypeDesc::Array(elem), Value::Array(items)) = (target, node) else {
            return Err(CodecError::Mismatch(format!("{node} is not an array")));
        };
        let mut combined = ObjectMatch::EXACT;
        for item in items {
            combined = combined.max(registry.try_unmarshal(state, elem, item)?);
        }
        Ok(combined)
    }

    fn unmarshal(
        &self,
        registry: &SerializerRegistry,
        state: &mut SerializerState,
        target: &TypeDesc,
        node: &Value,
    ) -> Result<NativeValue, CodecError> {
        let (TypeDesc::Array(elem), Value::Array(items)) = (target, node) else {
            return Err(CodecError::bad_value(target, format!("{node} is not an array")));
        };
        let natives = items
            .iter()
            .map(|item| registry.unmarshal(state, elem, item))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(NativeValue::array((**elem).clone(), natives))
    }

    fn marshal(
        &self,
        registry: &SerializerRegistry,
        state: &mut SerializerState,
        value: &NativeValue,
    ) -> Result<Value, CodecError> {
        let NativeValue::Array { items, .. } = value else {
            return Err(CodecError::Unsupported(format!("{value:?}")));
        };
        let items = items.borrow();
        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            out.push(registry.marshal_child(state, PathToken::index(i), item)?);
        }
        Ok(Value::Array(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orb_core::{IntWidth, TypeRegistry};
    use serde_json::json;
    use std::sync::Arc;

    fn fixture() -> (SerializerRegistry, SerializerState) {
        (
            SerializerRegistry::with_defaults(Arc::new(TypeRegistry::new())),
            SerializerState::with_root(crate::SerializerConfig::default(), "result"),
        )
    }

    fn int_array() -> TypeDesc {
        TypeDesc::Array(Box::new(TypeDesc::Int(IntWidth::I32)))
    }

    #[test]
    fn roundtrip_preserves_elements() {
        let (reg, mut st) = fixture();
        let node = json!([1, 2, 3]);
        let native = reg.unmarshal(&mut st, &int_array(), &node).unwrap();
        assert_eq!(reg.marshal(&mut st, &native).unwrap(), node);
    }

    #[test]
    fn element_scores_combine_worst_wins() {
        let (reg, mut st) = fixture();
        // "2" parses as an int but scores weaker, dragging the whole array.
        let m = reg.try_unmarshal(&mut st, &int_array(), &json!([1, "2"])).unwrap();
        assert_eq!(m, ObjectMatch::SIMILAR);
    }

    #[test]
    fn bad_element_rejects_the_array() {
        let (reg, mut st) = fixture();
        assert!(reg.try_unmarshal(&mut st, &int_array(), &json!([1, "x"])).is_err());
    }

    #[test]
    fn nested_arrays() {
        let (reg, mut st) = fixture();
        let target = TypeDesc::Array(Box::new(int_array()));
        let node = json!([[1], [2, 3]]);
        let native = reg.unmarshal(&mut st, &target, &node).unwrap();
        assert_eq!(reg.marshal(&mut st, &native).unwrap(), node);
    }
}
