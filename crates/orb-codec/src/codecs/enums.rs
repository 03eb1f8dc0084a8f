// SPDX-License-Identifier: MIT OR Apache-2.0
//! Enum-by-name codec: variants cross the wire as their name string.

use orb_core::{NativeValue, TypeDesc, ValueKind};
use serde_json::Value;

use crate::{CodecError, JsonShape, ObjectMatch, Serializer, SerializerRegistry, SerializerState};

/// Codec for declared enum classes.
pub struct EnumCodec;

impl Serializer for EnumCodec {
    fn name(&self) -> &'static str {
        "enum"
    }

    fn serializable_kinds(&self) -> &'static [ValueKind] {
        &[ValueKind::Enum]
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
        matches!(target, TypeDesc::Enum(_)) && node.is_none_or(Value::is_string)
    }

    fn try_unmarshal(
        &self,
        registry: &SerializerRegistry,
        _state: &mut SerializerState,
        target: &TypeDesc,
        node: &Value,
    ) -> Result<ObjectMatch, CodecError> {
        let (TypeDesc::Enum(class), Value::String(variant)) = (target, node) else {
            return Err(CodecError::Mismatch(format!("{node} is not an enum name")));
        };
        let decl = registry
            .types()
            .enum_class(class)
            .ok_or_else(|| CodecError::Mismatch(format!("enum class {class} is not declared")))?;
        if decl.has_variant(variant) {
            Ok(ObjectMatch::EXACT)
        } else {
            Err(CodecError::Mismatch(format!("{variant:?} is not a variant of {class}")))
        }
    }

    fn unmarshal(
        &self,
        registry: &SerializerRegistry,
        _state: &mut SerializerState,
        target: &TypeDesc,
        node: &Value,
    ) -> Result<NativeValue, CodecError> {
        let (TypeDesc::Enum(class), Value::String(variant)) = (target, node) else {
            return Err(CodecError::bad_value(target, format!("{node} is not a string")));
        };
        let decl = registry
            .types()
            .enum_class(class)
            .ok_or_else(|| CodecError::bad_value(target, "enum class is not declared"))?;
        if decl.has_variant(variant) {
            Ok(NativeValue::Enum {
                class: class.clone(),
                variant: variant.clone(),
            })
        } else {
            Err(CodecError::bad_value(target, format!("unknown variant {variant:?}")))
        }
    }

    fn marshal(
        &self,
        _registry: &SerializerRegistry,
        _state: &mut SerializerState,
        value: &NativeValue,
    ) -> Result<Value, CodecError> {
        match value {
            NativeValue::Enum { variant, .. } => Ok(Value::String(variant.clone())),
            other => Err(CodecError::Unsupported(format!("{other:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orb_core::{EnumClass, TypeRegistry};
    use serde_json::json;
    use std::sync::Arc;

    fn fixture() -> (SerializerRegistry, SerializerState) {
        let types = Arc::new(TypeRegistry::new());
        types.register_enum(EnumClass::new("Color", vec!["Red", "Green"]));
        (
            SerializerRegistry::with_defaults(types),
            SerializerState::new(crate::SerializerConfig::default()),
        )
    }

    #[test]
    fn known_variant_roundtrips() {
        let (reg, mut st) = fixture();
        let target = TypeDesc::Enum("Color".into());
        assert_eq!(
            reg.try_unmarshal(&mut st, &target, &json!("Red")).unwrap(),
            ObjectMatch::EXACT
        );
        let native = reg.unmarshal(&mut st, &target, &json!("Red")).unwrap();
        assert_eq!(reg.marshal(&mut st, &native).unwrap(), json!("Red"));
    }

    #[test]
    fn unknown_variant_fails() {
        let (reg, mut st) = fixture();
        let target = TypeDesc::Enum("Color".into());
        assert!(reg.try_unmarshal(&mut st, &target, &json!("Blue")).is_err());
        assert!(matches!(
            reg.unmarshal(&mut st, &target, &json!("Blue")),
            Err(CodecError::BadValue { .. })
        ));
    }

    #[test]
    fn undeclared_class_is_a_mismatch() {
        let (reg, mut st) = fixture();
        let target = TypeDesc::Enum("Shape".into());
        assert!(reg.try_unmarshal(&mut st, &target, &json!("Red")).is_err());
    }
}
