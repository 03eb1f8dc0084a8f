// SPDX-License-Identifier: MIT OR Apache-2.0
//! Container codecs: list, set, and string-keyed map.
//!
//! Wire shape: `{"javaClass": "<concrete>", "list"|"set"|"map": <payload>}`
//! with an array payload for sequences and a string-keyed object for maps.
//! Unmarshalling honors an assignable declared `javaClass` and otherwise
//! falls back to the default concrete type for the requested interface; a
//! bare JSON array (or object) is also accepted as a weaker match, which is
//! what untyped legacy clients send.

use orb_core::{NativeValue, PathToken, TypeDesc, ValueKind};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::codecs::CLASS_HINT;
use crate::{CodecError, JsonShape, ObjectMatch, Serializer, SerializerRegistry, SerializerState};

/// Default concrete class name for lists.
pub(crate) const LIST_CLASS: &str = "Vec";
/// Default concrete class name for sets.
pub(crate) const SET_CLASS: &str = "BTreeSet";
/// Default concrete class name for maps.
pub(crate) const MAP_CLASS: &str = "BTreeMap";

fn wrapper_payload<'a>(node: &'a Value, key: &str) -> Option<&'a Value> {
    node.as_object().and_then(|o| o.get(key))
}

fn element_target(target: &TypeDesc) -> TypeDesc {
    match target {
        TypeDesc::List(e) | TypeDesc::Set(e) | TypeDesc::Map(e) => (**e).clone(),
        _ => TypeDesc::Any,
    }
}

// ---------------------------------------------------------------------------
// ListCodec
// ---------------------------------------------------------------------------

/// Codec for list containers.
pub struct ListCodec;

impl ListCodec {
    fn payload<'a>(node: &'a Value, target: &TypeDesc) -> Result<(&'a [Value], bool), CodecError> {
        if let Some(payload) = wrapper_payload(node, "list") {
            let items = payload
                .as_array()
                .ok_or_else(|| CodecError::bad_value(target, "list payload is not an array"))?;
            return Ok((items, true));
        }
        match node {
            Value::Array(items) => Ok((items, false)),
            _ => Err(CodecError::Mismatch(format!("{node} is not a list"))),
        }
    }
}

impl Serializer for ListCodec {
    fn name(&self) -> &'static str {
        "list"
    }

    fn serializable_kinds(&self) -> &'static [ValueKind] {
        &[ValueKind::List]
    }

    fn json_shapes(&self) -> &'static [JsonShape] {
        &[JsonShape::Array, JsonShape::Object]
    }

    fn can_serialize(
        &self,
        _registry: &SerializerRegistry,
        target: &TypeDesc,
        node: Option<&Value>,
    ) -> bool {
        match target {
            TypeDesc::List(_) => node.is_none_or(|n| {
                n.is_array() || wrapper_payload(n, "list").is_some_and(Value::is_array)
            }),
            TypeDesc::Any => node.is_some_and(|n| {
                n.is_array() || wrapper_payload(n, "list").is_some_and(Value::is_array)
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
        let (items, wrapped) = Self::payload(node, target)?;
        let elem = element_target(target);
        let mut combined = if wrapped { ObjectMatch::EXACT } else { ObjectMatch::OKAY };
        for item in items {
            combined = combined.max(registry.try_unmarshal(state, &elem, item)?);
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
        let (items, _) = Self::payload(node, target)?;
        let elem = element_target(target);
        let natives = items
            .iter()
            .map(|item| registry.unmarshal(state, &elem, item))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(NativeValue::list(natives))
    }

    fn marshal(
        &self,
        registry: &SerializerRegistry,
        state: &mut SerializerState,
        value: &NativeValue,
    ) -> Result<Value, CodecError> {
        let NativeValue::List(rc) = value else {
            return Err(CodecError::Unsupported(format!("{value:?}")));
        };
        let items = rc.borrow();
        let mut payload = Vec::with_capacity(items.len());
        state.push_path(PathToken::key("list"));
        for (i, item) in items.iter().enumerate() {
            payload.push(registry.marshal_child(state, PathToken::index(i), item)?);
        }
        state.pop_path();
        let mut out = Map::new();
        if state.config().marshal_class_hints {
            out.insert(CLASS_HINT.into(), Value::String(LIST_CLASS.into()));
        }
        out.insert("list".into(), Value::Array(payload));
        Ok(Value::Object(out))
    }
}

// ---------------------------------------------------------------------------
// SetCodec
// ---------------------------------------------------------------------------

/// Codec for set containers.
pub struct SetCodec;

impl SetCodec {
    fn payload<'a>(node: &'a Value, target: &TypeDesc) -> Result<(&'a [Value], bool), CodecError> {
        if let Some(payload) = wrapper_payload(node, "set") {
            let items = payload
                .as_array()
                .ok_or_else(|| CodecError::bad_value(target, "set payload is not an array"))?;
            return Ok((items, true));
        }
        match node {
            Value::Array(items) => Ok((items, false)),
            _ => Err(CodecError::Mismatch(format!("{node} is not a set"))),
        }
    }
}

impl Serializer for SetCodec {
    fn name(&self) -> &'static str {
        "set"
    }

    fn serializable_kinds(&self) -> &'static [ValueKind] {
        &[ValueKind::Set]
    }

    fn json_shapes(&self) -> &'static [JsonShape] {
        &[JsonShape::Array, JsonShape::Object]
    }

    fn can_serialize(
        &self,
        _registry: &SerializerRegistry,
        target: &TypeDesc,
        node: Option<&Value>,
    ) -> bool {
        match target {
            TypeDesc::Set(_) => node.is_none_or(|n| {
                n.is_array() || wrapper_payload(n, "set").is_some_and(Value::is_array)
            }),
            TypeDesc::Any => {
                node.is_some_and(|n| wrapper_payload(n, "set").is_some_and(Value::is_array))
            }
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
        let (items, wrapped) = Self::payload(node, target)?;
        let elem = element_target(target);
        let mut combined = if wrapped { ObjectMatch::EXACT } else { ObjectMatch::OKAY };
        for item in items {
            combined = combined.max(registry.try_unmarshal(state, &elem, item)?);
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
        let (items, _) = Self::payload(node, target)?;
        let elem = element_target(target);
        let natives = items
            .iter()
            .map(|item| registry.unmarshal(state, &elem, item))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(NativeValue::set(natives))
    }

    fn marshal(
        &self,
        registry: &SerializerRegistry,
        state: &mut SerializerState,
        value: &NativeValue,
    ) -> Result<Value, CodecError> {
        let NativeValue::Set(rc) = value else {
            return Err(CodecError::Unsupported(format!("{value:?}")));
        };
        let items = rc.borrow();
        let mut payload = Vec::with_capacity(items.len());
        state.push_path(PathToken::key("set"));
        for (i, item) in items.iter().enumerate() {
            payload.push(registry.marshal_child(state, PathToken::index(i), item)?);
        }
        state.pop_path();
        let mut out = Map::new();
        if state.config().marshal_class_hints {
            out.insert(CLASS_HINT.into(), Value::String(SET_CLASS.into()));
        }
        out.insert("set".into(), Value::Array(payload));
        Ok(Value::Object(out))
    }
}

// ---------------------------------------------------------------------------
// MapCodec
// ---------------------------------------------------------------------------

/// Codec for string-keyed map containers (also covering the legacy
/// dictionary interface).
pub struct MapCodec;

impl MapCodec {
    fn payload<'a>(
        node: &'a Value,
        target: &TypeDesc,
    ) -> Result<(&'a Map<String, Value>, bool), CodecError> {
        if let Some(payload) = wrapper_payload(node, "map") {
            let entries = payload
                .as_object()
                .ok_or_else(|| CodecError::bad_value(target, "map payload is not an object"))?;
            return Ok((entries, true));
        }
        match node {
            Value::Object(entries) => Ok((entries, false)),
            _ => Err(CodecError::Mismatch(format!("{node} is not a map"))),
        }
    }
}

impl Serializer for MapCodec {
    fn name(&self) -> &'static str {
        "map"
    }

    fn serializable_kinds(&self) -> &'static [ValueKind] {
        &[ValueKind::Map]
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
        matches!(target, TypeDesc::Map(_) | TypeDesc::Any) && node.is_none_or(Value::is_object)
    }

    fn try_unmarshal(
        &self,
        registry: &SerializerRegistry,
        state: &mut SerializerState,
        target: &TypeDesc,
        node: &Value,
    ) -> Result<ObjectMatch, CodecError> {
        let (entries, wrapped) = Self::payload(node, target)?;
        let elem = element_target(target);
        let mut combined = if wrapped { ObjectMatch::EXACT } else { ObjectMatch::OKAY };
        for (key, item) in entries {
            if !wrapped && key == CLASS_HINT {
                continue;
            }
            combined = combined.max(registry.try_unmarshal(state, &elem, item)?);
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
        let (entries, wrapped) = Self::payload(node, target)?;
        let elem = element_target(target);
        let mut natives = BTreeMap::new();
        for (key, item) in entries {
            if !wrapped && key == CLASS_HINT {
                continue;
            }
            natives.insert(key.clone(), registry.unmarshal(state, &elem, item)?);
        }
        Ok(NativeValue::map(natives))
    }

    fn marshal(
        &self,
        registry: &SerializerRegistry,
        state: &mut SerializerState,
        value: &NativeValue,
    ) -> Result<Value, CodecError> {
        let NativeValue::Map(rc) = value else {
            return Err(CodecError::Unsupported(format!("{value:?}")));
        };
        let entries = rc.borrow();
        let mut payload = Map::new();
        state.push_path(PathToken::key("map"));
        for (key, item) in entries.iter() {
            payload.insert(
                key.clone(),
                registry.marshal_child(state, PathToken::key(key.clone()), item)?,
            );
        }
        state.pop_path();
        let mut out = Map::new();
        if state.config().marshal_class_hints {
            out.insert(CLASS_HINT.into(), Value::String(MAP_CLASS.into()));
        }
        out.insert("map".into(), Value::Object(payload));
        Ok(Value::Object(out))
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

    fn int_list() -> TypeDesc {
        TypeDesc::List(Box::new(TypeDesc::Int(IntWidth::I32)))
    }

    // -- List -------------------------------------------------------------

    #[test]
    fn list_wrapper_roundtrip() {
        let (reg, mut st) = fixture();
        let native = reg
            .unmarshal(&mut st, &int_list(), &json!({"javaClass": "Vec", "list": [1, 2]}))
            .unwrap();
        let out = reg.marshal(&mut st, &native).unwrap();
        assert_eq!(out, json!({"javaClass": "Vec", "list": [1, 2]}));
    }

    #[test]
    fn plain_array_accepted_as_weaker_match() {
        let (reg, mut st) = fixture();
        let wrapped = reg
            .try_unmarshal(&mut st, &int_list(), &json!({"list": [1]}))
            .unwrap();
        let plain = reg.try_unmarshal(&mut st, &int_list(), &json!([1])).unwrap();
        assert!(wrapped < plain);
    }

    #[test]
    fn class_hints_can_be_disabled() {
        let (reg, _) = fixture();
        let cfg = crate::SerializerConfig {
            marshal_class_hints: false,
            ..crate::SerializerConfig::default()
        };
        let mut st = SerializerState::with_root(cfg, "result");
        let out = reg
            .marshal(&mut st, &NativeValue::list(vec![NativeValue::Int(1)]))
            .unwrap();
        assert_eq!(out, json!({"list": [1]}));
    }

    // -- Set --------------------------------------------------------------

    #[test]
    fn set_roundtrip_deduplicates() {
        let (reg, mut st) = fixture();
        let target = TypeDesc::Set(Box::new(TypeDesc::Int(IntWidth::I32)));
        let native = reg
            .unmarshal(&mut st, &target, &json!({"set": [1, 2, 1]}))
            .unwrap();
        let out = reg.marshal(&mut st, &native).unwrap();
        assert_eq!(out["set"], json!([1, 2]));
        assert_eq!(out[CLASS_HINT], json!(SET_CLASS));
    }

    // -- Map --------------------------------------------------------------

    #[test]
    fn map_wrapper_roundtrip() {
        let (reg, mut st) = fixture();
        let target = TypeDesc::Map(Box::new(TypeDesc::String));
        let node = json!({"javaClass": "BTreeMap", "map": {"a": "x", "b": "y"}});
        let native = reg.unmarshal(&mut st, &target, &node).unwrap();
        assert_eq!(reg.marshal(&mut st, &native).unwrap(), node);
    }

    #[test]
    fn plain_object_accepted_for_map_target() {
        let (reg, mut st) = fixture();
        let target = TypeDesc::Map(Box::new(TypeDesc::Int(IntWidth::I64)));
        let native = reg.unmarshal(&mut st, &target, &json!({"n": 3})).unwrap();
        if let NativeValue::Map(rc) = &native {
            assert!(rc.borrow()["n"].deep_eq(&NativeValue::Int(3)));
        } else {
            panic!("expected a map");
        }
    }

    #[test]
    fn any_target_with_plain_object_falls_to_map() {
        let (reg, mut st) = fixture();
        let native = reg.unmarshal(&mut st, &TypeDesc::Any, &json!({"k": 1})).unwrap();
        assert!(matches!(native, NativeValue::Map(_)));
    }

    #[test]
    fn bad_element_fails_the_container() {
        let (reg, mut st) = fixture();
        assert!(reg
            .try_unmarshal(&mut st, &int_list(), &json!({"list": [1, "x"]}))
            .is_err());
    }
}
