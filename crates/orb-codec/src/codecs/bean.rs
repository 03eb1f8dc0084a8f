// SPDX-License-Identifier: MIT OR Apache-2.0
//! Bean codec: declared property-bag objects.
//!
//! Marshals declared, non-null properties recursively; null properties are
//! omitted to keep the wire compact (zero, empty string, and false are
//! serialized faithfully).  Unmarshals by constructing an empty bean and
//! assigning declared properties; unknown JSON keys are ignored.  A
//! resolvable and assignable `javaClass` hint overrides the static target.

use orb_core::{Bean, BeanClass, NativeValue, PathToken, TypeDesc, ValueKind};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::codecs::CLASS_HINT;
use crate::{CodecError, JsonShape, ObjectMatch, Serializer, SerializerRegistry, SerializerState};

/// Codec for declared bean classes.
pub struct BeanCodec;

impl BeanCodec {
    /// Resolve the effective bean class: the `javaClass` hint when it is
    /// declared and assignable to the target, else the declared target.
    fn resolve(
        registry: &SerializerRegistry,
        target: &TypeDesc,
        node: &Value,
    ) -> Option<Arc<BeanClass>> {
        let hint = node
            .get(CLASS_HINT)
            .and_then(Value::as_str)
            .and_then(|name| registry.types().bean(name));
        match target {
            TypeDesc::Bean(name) => match hint {
                Some(hinted) if registry.types().bean_assignable(&hinted.name, name) => {
                    Some(hinted)
                }
                _ => registry.types().bean(name),
            },
            TypeDesc::Any => hint,
            _ => None,
        }
    }

    fn is_plain_object(node: &Value) -> bool {
        node.as_object()
            .is_some_and(|o| !o.contains_key("JSONRPCType"))
    }
}

impl Serializer for BeanCodec {
    fn name(&self) -> &'static str {
        "bean"
    }

    fn serializable_kinds(&self) -> &'static [ValueKind] {
        &[ValueKind::Bean]
    }

    fn json_shapes(&self) -> &'static [JsonShape] {
        &[JsonShape::Object]
    }

    fn can_serialize(
        &self,
        registry: &SerializerRegistry,
        target: &TypeDesc,
        node: Option<&Value>,
    ) -> bool {
        match target {
            TypeDesc::Bean(_) => node.is_none_or(Self::is_plain_object),
            TypeDesc::Any => node.is_some_and(|n| {
                Self::is_plain_object(n)
                    && n.get(CLASS_HINT)
                        .and_then(Value::as_str)
                        .is_some_and(|name| registry.types().bean(name).is_some())
            }),
            _ => false,
        }
    }

    fn try_unmarshal(
        &self,
        registry: &SerializerRegistry,
        state: &mut SerializerState,
        target: &TypeDesc,
        node: &Value,
    ) -> Result<ObjectMatch, CodecError> {
        let Some(object) = node.as_object() else {
            return Err(CodecError::Mismatch(format!("{node} is not an object")));
        };
        let class = Self::resolve(registry, target, node)
            .ok_or_else(|| CodecError::Mismatch(format!("no declared bean class for {target}")))?;
        let mut combined = ObjectMatch::OKAY;
        for prop in &class.props {
            if let Some(child) = object.get(&prop.name) {
                combined = combined.max(registry.try_unmarshal(state, &prop.ty, child)?);
            }
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
        let Some(object) = node.as_object() else {
            return Err(CodecError::bad_value(target, format!("{node} is not an object")));
        };
        let class = Self::resolve(registry, target, node)
            .ok_or_else(|| CodecError::Mismatch(format!("no declared bean class for {target}")))?;
        let mut bean = Bean::new(class.name.clone());
        for prop in &class.props {
            let value = match object.get(&prop.name) {
                Some(child) => registry.unmarshal(state, &prop.ty, child)?,
                None => NativeValue::Null,
            };
            bean.props.insert(prop.name.clone(), value);
        }
        Ok(NativeValue::bean(bean))
    }

    fn marshal(
        &self,
        registry: &SerializerRegistry,
        state: &mut SerializerState,
        value: &NativeValue,
    ) -> Result<Value, CodecError> {
        let NativeValue::Bean(rc) = value else {
            return Err(CodecError::Unsupported(format!("{value:?}")));
        };
        let bean = rc.borrow();
        let mut out = Map::new();
        if state.config().marshal_class_hints {
            out.insert(CLASS_HINT.into(), Value::String(bean.class.clone()));
        }
        for (name, prop) in &bean.props {
            if matches!(prop, NativeValue::Null) {
                if state.config().marshal_null_props {
                    out.insert(name.clone(), Value::Null);
                }
                continue;
            }
            let child = registry.marshal_child(state, PathToken::key(name.clone()), prop)?;
            out.insert(name.clone(), child);
        }
        Ok(Value::Object(out))
    }
}
