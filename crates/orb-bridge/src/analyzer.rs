// SPDX-License-Identifier: MIT OR Apache-2.0
//! Class analysis: method maps keyed by `(name, arity)`.
//!
//! A [`ClassSchema`] declares flat method lists; dispatch wants them keyed
//! for lookup and with overloads grouped.  Analysis is memoized
//! process-wide by schema identity — schemas are built once and shared, so
//! the `Arc` address is the class identity, and holding the analyzed data
//! keeps the address valid.

use orb_core::{ClassSchema, MethodDef};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, OnceLock};

/// Lookup key for a method map.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MethodKey {
    /// Method name.
    pub name: String,
    /// Declared arity, counting context-resolved slots.
    pub arity: usize,
}

impl MethodKey {
    /// Build a key.
    pub fn new(name: impl Into<String>, arity: usize) -> Self {
        Self {
            name: name.into(),
            arity,
        }
    }
}

/// Value of a method map entry: a single method, or the overload list when
/// `(name, arity)` collides.
#[derive(Debug, Clone)]
pub enum MethodEntry {
    /// The only method under this key.
    Single(Arc<MethodDef>),
    /// All methods sharing this key, in declaration order.
    Overloaded(Vec<Arc<MethodDef>>),
}

impl MethodEntry {
    /// Iterate the methods under this key in declaration order.
    pub fn iter(&self) -> std::slice::Iter<'_, Arc<MethodDef>> {
        match self {
            Self::Single(method) => std::slice::from_ref(method).iter(),
            Self::Overloaded(methods) => methods.iter(),
        }
    }

    fn push(&mut self, method: Arc<MethodDef>) {
        match self {
            Self::Single(existing) => {
                *self = Self::Overloaded(vec![existing.clone(), method]);
            }
            Self::Overloaded(methods) => methods.push(method),
        }
    }
}

/// The analyzed view of a class: instance and static method maps.
#[derive(Debug)]
pub struct ClassData {
    schema: Arc<ClassSchema>,
    method_map: BTreeMap<MethodKey, MethodEntry>,
    static_method_map: BTreeMap<MethodKey, MethodEntry>,
}

impl ClassData {
    /// The analyzed schema.
    #[must_use]
    pub fn schema(&self) -> &Arc<ClassSchema> {
        &self.schema
    }

    /// Instance methods keyed by `(name, arity)`.
    #[must_use]
    pub fn method_map(&self) -> &BTreeMap<MethodKey, MethodEntry> {
        &self.method_map
    }

    /// Static methods keyed by `(name, arity)`.
    #[must_use]
    pub fn static_method_map(&self) -> &BTreeMap<MethodKey, MethodEntry> {
        &self.static_method_map
    }

    /// Sorted unique instance method names.
    #[must_use]
    pub fn instance_method_names(&self) -> BTreeSet<String> {
        self.method_map.keys().map(|k| k.name.clone()).collect()
    }

    /// Sorted unique static method names.
    #[must_use]
    pub fn static_method_names(&self) -> BTreeSet<String> {
        self.static_method_map
            .keys()
            .map(|k| k.name.clone())
            .collect()
    }
}

/// Process-wide, populate-once class analysis.
pub struct ClassAnalyzer;

impl ClassAnalyzer {
    /// Analyze `schema`, returning the memoized result when available.
    ///
    /// The memo is keyed by `Arc` address; the first writer wins and every
    /// later call observes the same `ClassData`.
    pub fn analyze(schema: &Arc<ClassSchema>) -> Arc<ClassData> {
        static MEMO: OnceLock<Mutex<HashMap<usize, Arc<ClassData>>>> = OnceLock::new();
        let memo = MEMO.get_or_init(|| Mutex::new(HashMap::new()));
        let key = Arc::as_ptr(schema) as usize;
        let mut guard = memo.lock().expect("analyzer memo poisoned");
        if let Some(data) = guard.get(&key) {
            return data.clone();
        }
        let data = Arc::new(Self::build(schema));
        guard.insert(key, data.clone());
        data
    }

    fn build(schema: &Arc<ClassSchema>) -> ClassData {
        ClassData {
            schema: schema.clone(),
            method_map: Self::key_methods(&schema.methods),
            static_method_map: Self::key_methods(&schema.static_methods),
        }
    }

    fn key_methods(methods: &[Arc<MethodDef>]) -> BTreeMap<MethodKey, MethodEntry> {
        let mut map: BTreeMap<MethodKey, MethodEntry> = BTreeMap::new();
        for method in methods {
            let key = MethodKey::new(method.name.clone(), method.arity());
            match map.get_mut(&key) {
                Some(entry) => entry.push(method.clone()),
                None => {
                    map.insert(key, MethodEntry::Single(method.clone()));
                }
            }
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orb_core::{ClassBuilder, NativeValue, TypeDesc};

    fn sample_schema() -> Arc<ClassSchema> {
        ClassBuilder::new("Svc")
            .method("echo", vec![TypeDesc::Any], |_, _, mut a| Ok(a.remove(0)))
            .method("echo", vec![TypeDesc::String], |_, _, mut a| Ok(a.remove(0)))
            .method("ping", vec![], |_, _, _| Ok(NativeValue::Null))
            .static_method("version", vec![], |_, _, _| {
                Ok(NativeValue::String("1".into()))
            })
            .build()
    }

    #[test]
    fn overloads_share_a_key() {
        let data = ClassAnalyzer::analyze(&sample_schema());
        let entry = data
            .method_map()
            .get(&MethodKey::new("echo", 1))
            .expect("echo/1 analyzed");
        assert!(matches!(entry, MethodEntry::Overloaded(v) if v.len() == 2));
        assert!(matches!(
            data.method_map().get(&MethodKey::new("ping", 0)),
            Some(MethodEntry::Single(_))
        ));
    }

    #[test]
    fn statics_are_kept_apart() {
        let data = ClassAnalyzer::analyze(&sample_schema());
        assert!(data.method_map().get(&MethodKey::new("version", 0)).is_none());
        assert!(data
            .static_method_map()
            .get(&MethodKey::new("version", 0))
            .is_some());
    }

    #[test]
    fn memo_returns_the_same_analysis() {
        let schema = sample_schema();
        let first = ClassAnalyzer::analyze(&schema);
        let second = ClassAnalyzer::analyze(&schema);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn distinct_schemas_analyze_separately() {
        let a = ClassAnalyzer::analyze(&sample_schema());
        let b = ClassAnalyzer::analyze(&sample_schema());
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn method_names_are_sorted_and_unique() {
        let data = ClassAnalyzer::analyze(&sample_schema());
        let names: Vec<String> = data.instance_method_names().into_iter().collect();
        assert_eq!(names, vec!["echo".to_owned(), "ping".to_owned()]);
    }

    #[test]
    fn entry_iter_preserves_declaration_order() {
        let data = ClassAnalyzer::analyze(&sample_schema());
        let entry = data.method_map().get(&MethodKey::new("echo", 1)).unwrap();
        let params: Vec<&TypeDesc> = entry.iter().map(|m| &m.params[0]).collect();
        assert_eq!(params, vec![&TypeDesc::Any, &TypeDesc::String]);
    }
}
