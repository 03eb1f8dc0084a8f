// SPDX-License-Identifier: MIT OR Apache-2.0
//! Numeric codec.
//!
//! A JSON number is compatible with any numeric target: exact when it fits
//! the target family without loss, compatible otherwise.  A JSON string
//! that parses as the target numeric is a weaker match, so overloads taking
//! strings win over numeric coercions on string input.

use orb_core::{NativeValue, TypeDesc, ValueKind};
use serde_json::Value;

use crate::{CodecError, JsonShape, ObjectMatch, Serializer, SerializerRegistry, SerializerState};

/// Codec for integral and floating numerics.
pub struct NumberCodec;

impl NumberCodec {
    fn mismatch(target: &TypeDesc, node: &Value) -> CodecError {
        CodecError::Mismatch(format!("{node} does not fit {target}"))
    }
}

impl Serializer for NumberCodec {
    fn name(&self) -> &'static str {
        "number"
    }

    fn serializable_kinds(&self) -> &'static [ValueKind] {
        &[ValueKind::Int, ValueKind::Float]
    }

    fn json_shapes(&self) -> &'static [JsonShape] {
        &[JsonShape::Number, JsonShape::String]
    }

    fn can_serialize(
        &self,
        _registry: &SerializerRegistry,
        target: &TypeDesc,
        node: Option<&Value>,
    ) -> bool {
        match target {
            TypeDesc::Int(_) | TypeDesc::Float(_) => {
                node.is_none_or(|n| self.json_shapes().contains(&JsonShape::of(n)))
            }
            TypeDesc::Any => node.is_some_and(Value::is_number),
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
        match (target, node) {
            (TypeDesc::Int(w), Value::Number(n)) => {
                if let Some(i) = n.as_i64() {
                    if w.fits(i) {
                        Ok(ObjectMatch::EXACT)
                    } else {
                        Err(Self::mismatch(target, node))
                    }
                } else if n.as_f64().is_some_and(|f| f.fract() == 0.0) {
                    Ok(ObjectMatch::OKAY)
                } else {
                    Err(Self::mismatch(target, node))
                }
            }
            (TypeDesc::Int(w), Value::String(s)) => match s.trim().parse::<i64>() {
                Ok(i) if w.fits(i) => Ok(ObjectMatch::SIMILAR),
                _ => Err(Self::mismatch(target, node)),
            },
            (TypeDesc::Float(w), Value::Number(n)) => {
                if n.as_i64().is_some() {
                    Ok(ObjectMatch::OKAY)
                } else if n.as_f64().is_some() {
                    Ok(match w {
                        orb_core::FloatWidth::F64 => ObjectMatch::EXACT,
                        orb_core::FloatWidth::F32 => ObjectMatch::OKAY,
                    })
                } else {
                    Err(Self::mismatch(target, node))
                }
            }
            (TypeDesc::Float(_), Value::String(s)) => match s.trim().parse::<f64>() {
                Ok(_) => Ok(ObjectMatch::SIMILAR),
                Err(_) => Err(Self::mismatch(target, node)),
            },
            (TypeDesc::Any, Value::Number(_)) => Ok(ObjectMatch::OKAY),
            _ => Err(Self::mismatch(target, node)),
        }
    }

    fn unmarshal(
        &self,
        _registry: &SerializerRegistry,
        _state: &mut SerializerState,
        target: &TypeDesc,
        node: &Value,
    ) -> Result<NativeValue, CodecError> {
        match (target, node) {
            (TypeDesc::Int(w), Value::Number(n)) => {
                if let Some(i) = n.as_i64() {
                    if w.fits(i) {
                        return Ok(NativeValue::Int(i));
                    }
                    return Err(CodecError::bad_value(target, format!("{i} out of range")));
                }
                let f = n
                    .as_f64()
                    .ok_or_else(|| CodecError::bad_value(target, "unrepresentable number"))?;
                let integral = f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64;
                if integral && w.fits(f as i64) {
                    Ok(NativeValue::Int(f as i64))
                } else {
                    Err(CodecError::bad_value(target, format!("{f} does not fit")))
                }
            }
            (TypeDesc::Int(w), Value::String(s)) => match s.trim().parse::<i64>() {
                Ok(i) if w.fits(i) => Ok(NativeValue::Int(i)),
                _ => Err(CodecError::bad_value(target, format!("cannot parse {s:?}"))),
            },
            (TypeDesc::Float(_), Value::Number(n)) => n
                .as_f64()
                .map(NativeValue::Float)
                .ok_or_else(|| CodecError::bad_value(target, "unrepresentable number")),
            (TypeDesc::Float(_), Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .map(NativeValue::Float)
                .map_err(|_| CodecError::bad_value(target, format!("cannot parse {s:?}"))),
            (TypeDesc::Any, Value::Number(n)) => {
                if let Some(i) = n.as_i64() {
                    Ok(NativeValue::Int(i))
                } else {
                    n.as_f64()
                        .map(NativeValue::Float)
                        .ok_or_else(|| CodecError::bad_value(target, "unrepresentable number"))
                }
            }
            _ => Err(Self::mismatch(target, node)),
        }
    }

    fn marshal(
        &self,
        _registry: &SerializerRegistry,
        _state: &mut SerializerState,
        value: &NativeValue,
    ) -> Result<Value, CodecError> {
        match value {
            NativeValue::Int(i) => Ok(Value::from(*i)),
            NativeValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .ok_or_else(|| CodecError::Unsupported(format!("non-finite float {f}"))),
            other => Err(CodecError::Unsupported(format!("{other:?}"))),
        }
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
            SerializerState::new(crate::SerializerConfig::default()),
        )
    }

    #[test]
    fn integer_fits_are_exact() {
        let (reg, mut st) = fixture();
        let m = reg
            .try_unmarshal(&mut st, &TypeDesc::Int(IntWidth::I32), &json!(42))
            .unwrap();
        assert_eq!(m, ObjectMatch::EXACT);
    }

    #[test]
    fn integer_overflow_is_a_mismatch() {
        let (reg, mut st) = fixture();
        assert!(reg
            .try_unmarshal(&mut st, &TypeDesc::Int(IntWidth::I8), &json!(1000))
            .is_err());
    }

    #[test]
    fn string_coercion_is_weaker() {
        let (reg, mut st) = fixture();
        let m = reg
            .try_unmarshal(&mut st, &TypeDesc::Int(IntWidth::I32), &json!("3"))
            .unwrap();
        assert_eq!(m, ObjectMatch::SIMILAR);
        let out = reg
            .unmarshal(&mut st, &TypeDesc::Int(IntWidth::I32), &json!("3"))
            .unwrap();
        assert!(out.deep_eq(&NativeValue::Int(3)));
    }

    #[test]
    fn unparsable_string_is_a_mismatch() {
        let (reg, mut st) = fixture();
        assert!(reg
            .try_unmarshal(&mut st, &TypeDesc::Int(IntWidth::I32), &json!("three"))
            .is_err());
    }

    #[test]
    fn int_node_into_float_target() {
        let (reg, mut st) = fixture();
        let m = reg
            .try_unmarshal(&mut st, &TypeDesc::Float(orb_core::FloatWidth::F64), &json!(3))
            .unwrap();
        assert_eq!(m, ObjectMatch::OKAY);
        let out = reg
            .unmarshal(&mut st, &TypeDesc::Float(orb_core::FloatWidth::F64), &json!(3))
            .unwrap();
        assert!(out.deep_eq(&NativeValue::Float(3.0)));
    }

    #[test]
    fn float_node_into_int_target_requires_integral() {
        let (reg, mut st) = fixture();
        assert!(reg
            .try_unmarshal(&mut st, &TypeDesc::Int(IntWidth::I32), &json!(2.5))
            .is_err());
        let m = reg
            .try_unmarshal(&mut st, &TypeDesc::Int(IntWidth::I32), &json!(2.0))
            .unwrap();
        assert_eq!(m, ObjectMatch::OKAY);
    }

    #[test]
    fn marshal_roundtrip() {
        let (reg, mut st) = fixture();
        assert_eq!(reg.marshal(&mut st, &NativeValue::Int(-5)).unwrap(), json!(-5));
        assert_eq!(
            reg.marshal(&mut st, &NativeValue::Float(1.5)).unwrap(),
            json!(1.5)
        );
    }

    #[test]
    fn non_finite_floats_do_not_marshal() {
        let (reg, mut st) = fixture();
        assert!(matches!(
            reg.marshal(&mut st, &NativeValue::Float(f64::NAN)),
            Err(CodecError::Unsupported(_))
        ));
    }
}
