// SPDX-License-Identifier: MIT OR Apache-2.0
//! The dynamic native value model.
//!
//! Shareable graph nodes (containers, beans) are `Rc<RefCell<…>>` so that one
//! node can appear in several slots of a graph and refer back to an ancestor.
//! Cloning a [`NativeValue`] clones the handle, not the node; pointer
//! identity is graph identity.  Values never cross threads — the bridge
//! pipeline is synchronous per request and graphs live for one call.

use chrono::{DateTime, Utc};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use crate::schema::Instance;
use crate::types::TypeDesc;

/// Discriminant of a [`NativeValue`], used for codec lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// JSON null / absent value.
    Null,
    /// Boolean.
    Bool,
    /// Integral numeric.
    Int,
    /// Floating numeric.
    Float,
    /// String.
    String,
    /// Timestamp.
    Date,
    /// Raw JSON pass-through.
    Json,
    /// Typed array.
    Array,
    /// List container.
    List,
    /// Set container.
    Set,
    /// String-keyed map container.
    Map,
    /// Declared bean.
    Bean,
    /// Enum variant.
    Enum,
    /// Exported object instance.
    Instance,
}

/// A bean: a named class plus its property values.
#[derive(Clone)]
pub struct Bean {
    /// Declared class name.
    pub class: String,
    /// Property values, keyed by property name.
    pub props: BTreeMap<String, NativeValue>,
}

impl Bean {
    /// An empty bean of the given class.
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            props: BTreeMap::new(),
        }
    }

    /// Builder-style property assignment.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: NativeValue) -> Self {
        self.props.insert(name.into(), value);
        self
    }
}

/// Dynamic native value crossing the codec boundary.
#[derive(Clone)]
pub enum NativeValue {
    /// Null / absent.
    Null,
    /// Boolean scalar.
    Bool(bool),
    /// Integral scalar.
    Int(i64),
    /// Floating scalar.
    Float(f64),
    /// String scalar.  Strings are scalars: they are never deduplicated.
    String(String),
    /// Timestamp.
    Date(DateTime<Utc>),
    /// Raw JSON carried through unchanged.
    Json(serde_json::Value),
    /// Typed array with a declared element type.
    Array {
        /// Declared element type.
        elem: TypeDesc,
        /// Shared element storage.
        items: Rc<RefCell<Vec<NativeValue>>>,
    },
    /// Ordered list.
    List(Rc<RefCell<Vec<NativeValue>>>),
    /// Insertion-ordered set (deduplicated on construction).
    Set(Rc<RefCell<Vec<NativeValue>>>),
    /// String-keyed map.
    Map(Rc<RefCell<BTreeMap<String, NativeValue>>>),
    /// Bean node.
    Bean(Rc<RefCell<Bean>>),
    /// Enum variant.
    Enum {
        /// Declared enum class name.
        class: String,
        /// Variant name.
        variant: String,
    },
    /// Live exported object.  `Arc`-shared because reference handles outlive
    /// a single call.
    Instance(Arc<Instance>),
}

impl NativeValue {
    /// Build a list node.
    pub fn list(items: Vec<NativeValue>) -> Self {
        Self::List(Rc::new(RefCell::new(items)))
    }

    /// Build a typed-array node.
    pub fn array(elem: TypeDesc, items: Vec<NativeValue>) -> Self {
        Self::Array {
            elem,
            items: Rc::new(RefCell::new(items)),
        }
    }

    /// Build a set node, deduplicating by deep equality and keeping first
    /// occurrences in insertion order.
    pub fn set(items: Vec<NativeValue>) -> Self {
        let mut unique: Vec<NativeValue> = Vec::new();
        for item in items {
            if !unique.iter().any(|u| u.deep_eq(&item)) {
                unique.push(item);
            }
        }
        Self::Set(Rc::new(RefCell::new(unique)))
    }

    /// Build a map node.
    pub fn map(entries: BTreeMap<String, NativeValue>) -> Self {
        Self::Map(Rc::new(RefCell::new(entries)))
    }

    /// Build a bean node.
    pub fn bean(bean: Bean) -> Self {
        Self::Bean(Rc::new(RefCell::new(bean)))
    }

    /// The discriminant of this value.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Null,
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::Float(_) => ValueKind::Float,
            Self::String(_) => ValueKind::String,
            Self::Date(_) => ValueKind::Date,
            Self::Json(_) => ValueKind::Json,
            Self::Array { .. } => ValueKind::Array,
            Self::List(_) => ValueKind::List,
            Self::Set(_) => ValueKind::Set,
            Self::Map(_) => ValueKind::Map,
            Self::Bean(_) => ValueKind::Bean,
            Self::Enum { .. } => ValueKind::Enum,
            Self::Instance(_) => ValueKind::Instance,
        }
    }

    /// Pointer identity of a shareable node; `None` for scalars.
    ///
    /// Two values with the same identity are the same graph node.  Keys are
    /// live allocation addresses: they are only meaningful while the graph is
    /// alive, which is the per-call lifetime the serializer state has anyway.
    #[must_use]
    pub fn identity(&self) -> Option<usize> {
        match self {
            Self::Array { items, .. } => Some(Rc::as_ptr(items) as usize),
            Self::List(rc) | Self::Set(rc) => Some(Rc::as_ptr(rc) as usize),
            Self::Map(rc) => Some(Rc::as_ptr(rc) as usize),
            Self::Bean(rc) => Some(Rc::as_ptr(rc) as usize),
            Self::Instance(arc) => Some(Arc::as_ptr(arc) as usize),
            _ => None,
        }
    }

    /// Whether two values are the same node or, for scalars, equal.
    #[must_use]
    pub fn same_node(&self, other: &NativeValue) -> bool {
        match (self.identity(), other.identity()) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self.deep_eq(other),
            _ => false,
        }
    }

    /// Structural deep equality.
    ///
    /// Safe on cyclic graphs: a pair of nodes already under comparison is
    /// taken as equal, which is the coinductive reading of graph equality.
    #[must_use]
    pub fn deep_eq(&self, other: &NativeValue) -> bool {
        let mut visiting = Vec::new();
        deep_eq_inner(self, other, &mut visiting)
    }
}

fn deep_eq_inner(a: &NativeValue, b: &NativeValue, visiting: &mut Vec<(usize, usize)>) -> bool {
    if let (Some(ia), Some(ib)) = (a.identity(), b.identity()) {
        if ia == ib {
            return true;
        }
        if visiting.contains(&(ia, ib)) {
            return true;
        }
        visiting.push((ia, ib));
        let result = deep_eq_shape(a, b, visiting);
        visiting.pop();
        return result;
    }
    deep_eq_shape(a, b, visiting)
}

fn deep_eq_shape(a: &NativeValue, b: &NativeValue, visiting: &mut Vec<(usize, usize)>) -> bool {
    match (a, b) {
        (NativeValue::Null, NativeValue::Null) => true,
        (NativeValue::Bool(x), NativeValue::Bool(y)) => x == y,
        (NativeValue::Int(x), NativeValue::Int(y)) => x == y,
        (NativeValue::Float(x), NativeValue::Float(y)) => x == y,
        (NativeValue::String(x), NativeValue::String(y)) => x == y,
        (NativeValue::Date(x), NativeValue::Date(y)) => x == y,
        (NativeValue::Json(x), NativeValue::Json(y)) => x == y,
        (
            NativeValue::Array {
                elem: ea, items: xa, ..
            },
            NativeValue::Array {
                elem: eb, items: xb, ..
            },
        ) => ea == eb && vec_eq(&xa.borrow(), &xb.borrow(), visiting),
        (NativeValue::List(xa), NativeValue::List(xb))
        | (NativeValue::Set(xa), NativeValue::Set(xb)) => {
            vec_eq(&xa.borrow(), &xb.borrow(), visiting)
        }
        (NativeValue::Map(xa), NativeValue::Map(xb)) => {
            let (ma, mb) = (xa.borrow(), xb.borrow());
            ma.len() == mb.len()
                && ma.iter().all(|(k, va)| {
                    mb.get(k)
                        .is_some_and(|vb| deep_eq_inner(va, vb, visiting))
                })
        }
        (NativeValue::Bean(xa), NativeValue::Bean(xb)) => {
            let (ba, bb) = (xa.borrow(), xb.borrow());
            ba.class == bb.class
                && ba.props.len() == bb.props.len()
                && ba.props.iter().all(|(k, va)| {
                    bb.props
                        .get(k)
                        .is_some_and(|vb| deep_eq_inner(va, vb, visiting))
                })
        }
        (
            NativeValue::Enum { class: ca, variant: va },
            NativeValue::Enum { class: cb, variant: vb },
        ) => ca == cb && va == vb,
        (NativeValue::Instance(xa), NativeValue::Instance(xb)) => Arc::ptr_eq(xa, xb),
        _ => false,
    }
}

fn vec_eq(a: &[NativeValue], b: &[NativeValue], visiting: &mut Vec<(usize, usize)>) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b.iter())
            .all(|(x, y)| deep_eq_inner(x, y, visiting))
}

// Shallow on purpose: derived Debug would recurse forever on cyclic graphs.
impl fmt::Debug for NativeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Bool(b) => write!(f, "Bool({b})"),
            Self::Int(i) => write!(f, "Int({i})"),
            Self::Float(x) => write!(f, "Float({x})"),
            Self::String(s) => write!(f, "String({s:?})"),
            Self::Date(d) => write!(f, "Date({d})"),
            Self::Json(v) => write!(f, "Json({v})"),
            Self::Array { items, .. } => write!(f, "Array(len={})", items.borrow().len()),
            Self::List(rc) => write!(f, "List(len={})", rc.borrow().len()),
            Self::Set(rc) => write!(f, "Set(len={})", rc.borrow().len()),
            Self::Map(rc) => write!(f, "Map(len={})", rc.borrow().len()),
            Self::Bean(rc) => write!(f, "Bean({})", rc.borrow().class),
            Self::Enum { class, variant } => write!(f, "Enum({class}::{variant})"),
            Self::Instance(inst) => write!(f, "Instance({})", inst.class().name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_have_no_identity() {
        assert!(NativeValue::Int(1).identity().is_none());
        assert!(NativeValue::String("x".into()).identity().is_none());
        assert!(NativeValue::Null.identity().is_none());
    }

    #[test]
    fn clone_shares_the_node() {
        let list = NativeValue::list(vec![NativeValue::Int(1)]);
        let alias = list.clone();
        assert_eq!(list.identity(), alias.identity());
        if let NativeValue::List(rc) = &alias {
            rc.borrow_mut().push(NativeValue::Int(2));
        }
        if let NativeValue::List(rc) = &list {
            assert_eq!(rc.borrow().len(), 2);
        }
    }

    #[test]
    fn distinct_nodes_have_distinct_identity() {
        let a = NativeValue::list(vec![]);
        let b = NativeValue::list(vec![]);
        assert_ne!(a.identity(), b.identity());
        assert!(a.deep_eq(&b));
        assert!(!a.same_node(&b));
    }

    #[test]
    fn set_deduplicates_on_construction() {
        let set = NativeValue::set(vec![
            NativeValue::Int(1),
            NativeValue::Int(2),
            NativeValue::Int(1),
        ]);
        if let NativeValue::Set(rc) = &set {
            assert_eq!(rc.borrow().len(), 2);
        } else {
            panic!("expected a set");
        }
    }

    #[test]
    fn deep_eq_on_beans() {
        let a = NativeValue::bean(Bean::new("P").with("x", NativeValue::Int(1)));
        let b = NativeValue::bean(Bean::new("P").with("x", NativeValue::Int(1)));
        let c = NativeValue::bean(Bean::new("P").with("x", NativeValue::Int(2)));
        assert!(a.deep_eq(&b));
        assert!(!a.deep_eq(&c));
    }

    #[test]
    fn deep_eq_terminates_on_cycles() {
        let a = NativeValue::bean(Bean::new("Node"));
        if let NativeValue::Bean(rc) = &a {
            rc.borrow_mut().props.insert("next".into(), a.clone());
        }
        let b = NativeValue::bean(Bean::new("Node"));
        if let NativeValue::Bean(rc) = &b {
            rc.borrow_mut().props.insert("next".into(), b.clone());
        }
        assert!(a.deep_eq(&b));
        assert!(a.deep_eq(&a));
    }

    #[test]
    fn debug_is_shallow_and_cycle_safe() {
        let a = NativeValue::bean(Bean::new("Node"));
        if let NativeValue::Bean(rc) = &a {
            rc.borrow_mut().props.insert("next".into(), a.clone());
        }
        assert_eq!(format!("{a:?}"), "Bean(Node)");
    }
}
