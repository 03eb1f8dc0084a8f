// SPDX-License-Identifier: MIT OR Apache-2.0
//! Declared bean and enum classes.
//!
//! The registry is the reflection substitute: applications declare up front
//! which property-bag classes and enumerations cross the wire, and codecs
//! look the declarations up by name.  It also records the interface facts of
//! exported classes so the assignability relation can reason about them.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::types::TypeDesc;

/// One declared bean property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropDef {
    /// Property name (JSON key).
    pub name: String,
    /// Declared property type.
    pub ty: TypeDesc,
}

/// A declared bean class: named, with an ordered property list and the
/// interface names it implements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeanClass {
    /// Class name (the wire `javaClass` value).
    pub name: String,
    /// Interface class names this bean can stand in for.
    pub implements: Vec<String>,
    /// Declared properties.
    pub props: Vec<PropDef>,
}

impl BeanClass {
    /// Declare a bean class from `(name, type)` property pairs.
    pub fn new(name: impl Into<String>, props: Vec<(&str, TypeDesc)>) -> Self {
        Self {
            name: name.into(),
            implements: Vec::new(),
            props: props
                .into_iter()
                .map(|(n, ty)| PropDef { name: n.into(), ty })
                .collect(),
        }
    }

    /// Builder-style interface declaration.
    #[must_use]
    pub fn implementing(mut self, iface: impl Into<String>) -> Self {
        self.implements.push(iface.into());
        self
    }

    /// Look up a declared property by name.
    #[must_use]
    pub fn prop(&self, name: &str) -> Option<&PropDef> {
        self.props.iter().find(|p| p.name == name)
    }
}

/// A declared enumeration: a class name and its variant names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumClass {
    /// Class name.
    pub name: String,
    /// Variant names, in declaration order.
    pub variants: Vec<String>,
}

impl EnumClass {
    /// Declare an enum class.
    pub fn new(name: impl Into<String>, variants: Vec<&str>) -> Self {
        Self {
            name: name.into(),
            variants: variants.into_iter().map(String::from).collect(),
        }
    }

    /// Whether `variant` is a declared variant.
    #[must_use]
    pub fn has_variant(&self, variant: &str) -> bool {
        self.variants.iter().any(|v| v == variant)
    }
}

#[derive(Default)]
struct Inner {
    beans: BTreeMap<String, Arc<BeanClass>>,
    enums: BTreeMap<String, Arc<EnumClass>>,
    // Exported class name → declared interface names.
    class_facts: BTreeMap<String, Vec<String>>,
}

/// Shared registry of declared wire classes.
///
/// Registration is an upsert; lookups clone out `Arc`s so readers never hold
/// the lock across codec work.
#[derive(Default)]
pub struct TypeRegistry {
    inner: RwLock<Inner>,
}

impl TypeRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare (or replace) a bean class.
    pub fn register_bean(&self, bean: BeanClass) {
        let mut inner = self.inner.write().expect("type registry poisoned");
        inner.beans.insert(bean.name.clone(), Arc::new(bean));
    }

    /// Declare (or replace) an enum class.
    pub fn register_enum(&self, decl: EnumClass) {
        let mut inner = self.inner.write().expect("type registry poisoned");
        inner.enums.insert(decl.name.clone(), Arc::new(decl));
    }

    /// Record the interface names of an exported class.
    pub fn record_class(&self, name: impl Into<String>, implements: Vec<String>) {
        let mut inner = self.inner.write().expect("type registry poisoned");
        inner.class_facts.insert(name.into(), implements);
    }

    /// Look up a declared bean class.
    #[must_use]
    pub fn bean(&self, name: &str) -> Option<Arc<BeanClass>> {
        self.inner
            .read()
            .expect("type registry poisoned")
            .beans
            .get(name)
            .cloned()
    }

    /// Look up a declared enum class.
    #[must_use]
    pub fn enum_class(&self, name: &str) -> Option<Arc<EnumClass>> {
        self.inner
            .read()
            .expect("type registry poisoned")
            .enums
            .get(name)
            .cloned()
    }

    /// Whether bean class `from` may stand in for bean class `to`, walking
    /// declared interfaces transitively.
    #[must_use]
    pub fn bean_assignable(&self, from: &str, to: &str) -> bool {
        if from == to {
            return true;
        }
        let inner = self.inner.read().expect("type registry poisoned");
        let mut stack = vec![from.to_owned()];
        let mut seen = Vec::new();
        while let Some(name) = stack.pop() {
            if seen.contains(&name) {
                continue;
            }
            if let Some(bean) = inner.beans.get(&name) {
                if bean.implements.iter().any(|i| i == to) {
                    return true;
                }
                stack.extend(bean.implements.iter().cloned());
            }
            seen.push(name);
        }
        false
    }

    /// Whether exported class `from` may stand in for exported class `to`.
    #[must_use]
    pub fn class_assignable(&self, from: &str, to: &str) -> bool {
        if from == to {
            return true;
        }
        self.inner
            .read()
            .expect("type registry poisoned")
            .class_facts
            .get(from)
            .is_some_and(|ifaces| ifaces.iter().any(|i| i == to))
    }
}
