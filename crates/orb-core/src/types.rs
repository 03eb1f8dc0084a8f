// SPDX-License-Identifier: MIT OR Apache-2.0
//! Declared type descriptors and the assignability relation.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::registry::TypeRegistry;

/// Width of an integral target type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntWidth {
    /// 8-bit signed.
    I8,
    /// 16-bit signed.
    I16,
    /// 32-bit signed.
    I32,
    /// 64-bit signed.
    I64,
}

impl IntWidth {
    /// Whether `v` is representable at this width.
    #[must_use]
    pub fn fits(self, v: i64) -> bool {
        match self {
            Self::I8 => i8::try_from(v).is_ok(),
            Self::I16 => i16::try_from(v).is_ok(),
            Self::I32 => i32::try_from(v).is_ok(),
            Self::I64 => true,
        }
    }
}

/// Width of a floating-point target type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FloatWidth {
    /// 32-bit float.
    F32,
    /// 64-bit float.
    F64,
}

/// A declared type: the static knowledge the bridge has about a method
/// parameter, return value, or bean property.
///
/// Descriptors drive codec lookup, overload scoring, and the specificity
/// tie-break.  Bean, enum, and object descriptors name classes declared in a
/// [`TypeRegistry`] or registered with a bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeDesc {
    /// Accepts any value; codec is chosen from the JSON shape.
    Any,
    /// Bare boolean; `null` is not acceptable.
    Bool,
    /// Bare integral numeric; `null` is not acceptable.
    Int(IntWidth),
    /// Bare floating numeric; `null` is not acceptable.
    Float(FloatWidth),
    /// UTF-8 string.
    String,
    /// Calendar timestamp.
    Date,
    /// Raw JSON pass-through.
    Json,
    /// Nullable wrapper; `null` unmarshals to [`crate::NativeValue::Null`].
    Option(Box<TypeDesc>),
    /// Fixed-element-type array (plain JSON array on the wire).
    Array(Box<TypeDesc>),
    /// Ordered list container.
    List(Box<TypeDesc>),
    /// Deduplicated set container.
    Set(Box<TypeDesc>),
    /// String-keyed map container.
    Map(Box<TypeDesc>),
    /// Declared bean class, by name.
    Bean(String),
    /// Declared enum class, by name.
    Enum(String),
    /// Exported class, by name.  Also the key under which context-resolved
    /// parameter classes are registered.
    Object(String),
}

impl TypeDesc {
    /// Whether JSON `null` is an acceptable value for this target.
    ///
    /// Bare primitives reject `null`; everything else accepts it.
    #[must_use]
    pub fn nullable(&self) -> bool {
        !matches!(self, Self::Bool | Self::Int(_) | Self::Float(_))
    }

    /// Assignability: can a value declared as `other` flow into a slot
    /// declared as `self` without coercion?
    ///
    /// This is the relation behind the overload resolver's specificity
    /// tie-break: a parameter type is *narrower* than another when the other
    /// is assignable from it and not vice versa.
    #[must_use]
    pub fn is_assignable_from(&self, other: &TypeDesc, types: &TypeRegistry) -> bool {
        match (self, other) {
            (Self::Any, _) => true,
            (Self::Option(inner), Self::Option(other_inner)) => {
                inner.is_assignable_from(other_inner, types)
            }
            (Self::Option(inner), _) => inner.is_assignable_from(other, types),
            (Self::Int(w), Self::Int(v)) => v <= w,
            (Self::Float(w), Self::Float(v)) => v <= w,
            (Self::Array(a), Self::Array(b))
            | (Self::List(a), Self::List(b))
            | (Self::Set(a), Self::Set(b))
            | (Self::Map(a), Self::Map(b)) => a.is_assignable_from(b, types),
            (Self::Bean(a), Self::Bean(b)) => a == b || types.bean_assignable(b, a),
            (Self::Object(a), Self::Object(b)) => a == b || types.class_assignable(b, a),
            _ => self == other,
        }
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("any"),
            Self::Bool => f.write_str("bool"),
            Self::Int(w) => write!(f, "int{}", int_bits(*w)),
            Self::Float(FloatWidth::F32) => f.write_str("float32"),
            Self::Float(FloatWidth::F64) => f.write_str("float64"),
            Self::String => f.write_str("string"),
            Self::Date => f.write_str("date"),
            Self::Json => f.write_str("json"),
            Self::Option(inner) => write!(f, "option<{inner}>"),
            Self::Array(e) => write!(f, "array<{e}>"),
            Self::List(e) => write!(f, "list<{e}>"),
            Self::Set(e) => write!(f, "set<{e}>"),
            Self::Map(v) => write!(f, "map<{v}>"),
            Self::Bean(n) => write!(f, "bean {n}"),
            Self::Enum(n) => write!(f, "enum {n}"),
            Self::Object(n) => write!(f, "object {n}"),
        }
    }
}

fn int_bits(w: IntWidth) -> u8 {
    match w {
        IntWidth::I8 => 8,
        IntWidth::I16 => 16,
        IntWidth::I32 => 32,
        IntWidth::I64 => 64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{BeanClass, TypeRegistry};

    fn i32_desc() -> TypeDesc {
        TypeDesc::Int(IntWidth::I32)
    }

    fn i64_desc() -> TypeDesc {
        TypeDesc::Int(IntWidth::I64)
    }

    #[test]
    fn any_accepts_everything() {
        let types = TypeRegistry::new();
        assert!(TypeDesc::Any.is_assignable_from(&TypeDesc::String, &types));
        assert!(TypeDesc::Any.is_assignable_from(&i32_desc(), &types));
        assert!(!TypeDesc::String.is_assignable_from(&TypeDesc::Any, &types));
    }

    #[test]
    fn wider_int_accepts_narrower() {
        let types = TypeRegistry::new();
        assert!(i64_desc().is_assignable_from(&i32_desc(), &types));
        assert!(!i32_desc().is_assignable_from(&i64_desc(), &types));
        assert!(i32_desc().is_assignable_from(&i32_desc(), &types));
    }

    #[test]
    fn option_accepts_bare_inner() {
        let types = TypeRegistry::new();
        let opt = TypeDesc::Option(Box::new(TypeDesc::String));
        assert!(opt.is_assignable_from(&TypeDesc::String, &types));
        assert!(!TypeDesc::String.is_assignable_from(&opt, &types));
    }

    #[test]
    fn containers_compare_element_types() {
        let types = TypeRegistry::new();
        let any_list = TypeDesc::List(Box::new(TypeDesc::Any));
        let str_list = TypeDesc::List(Box::new(TypeDesc::String));
        assert!(any_list.is_assignable_from(&str_list, &types));
        assert!(!str_list.is_assignable_from(&any_list, &types));
        // Differing container kinds never match.
        let str_set = TypeDesc::Set(Box::new(TypeDesc::String));
        assert!(!str_list.is_assignable_from(&str_set, &types));
    }

    #[test]
    fn bean_assignability_follows_declared_interfaces() {
        let types = TypeRegistry::new();
        types.register_bean(BeanClass::new("Shape", vec![]));
        types.register_bean(BeanClass::new("Circle", vec![]).implementing("Shape"));
        let shape = TypeDesc::Bean("Shape".into());
        let circle = TypeDesc::Bean("Circle".into());
        assert!(shape.is_assignable_from(&circle, &types));
        assert!(!circle.is_assignable_from(&shape, &types));
    }

    #[test]
    fn nullability() {
        assert!(!TypeDesc::Bool.nullable());
        assert!(!i32_desc().nullable());
        assert!(!TypeDesc::Float(FloatWidth::F64).nullable());
        assert!(TypeDesc::String.nullable());
        assert!(TypeDesc::Bean("B".into()).nullable());
        assert!(TypeDesc::Option(Box::new(TypeDesc::Bool)).nullable());
    }

    #[test]
    fn int_width_fits() {
        assert!(IntWidth::I8.fits(127));
        assert!(!IntWidth::I8.fits(128));
        assert!(IntWidth::I16.fits(-32768));
        assert!(!IntWidth::I16.fits(40000));
        assert!(IntWidth::I64.fits(i64::MAX));
    }

    #[test]
    fn display_is_readable() {
        assert_eq!(i32_desc().to_string(), "int32");
        assert_eq!(
            TypeDesc::List(Box::new(TypeDesc::Any)).to_string(),
            "list<any>"
        );
        assert_eq!(TypeDesc::Bean("Node".into()).to_string(), "bean Node");
    }
}
