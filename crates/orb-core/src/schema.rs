// SPDX-License-Identifier: MIT OR Apache-2.0
//! Exported classes and instances.
//!
//! A [`ClassSchema`] is the declared method surface of a server-side class:
//! instance and static methods with named parameters and boxed handlers,
//! assembled with [`ClassBuilder`].  An [`Instance`] pairs a schema with
//! opaque application state that handlers downcast to their concrete type.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::context::CallContext;
use crate::types::TypeDesc;
use crate::value::NativeValue;

/// Boxed error returned by method handlers, hook callbacks, and local-arg
/// resolvers.  Surfaced to the wire as a remote exception.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// A method implementation.
///
/// `instance` is `None` for static methods.  Arguments arrive fully
/// unmarshalled and context-injected, in declared parameter order.
pub type MethodHandler = Arc<
    dyn Fn(&CallContext, Option<&Arc<Instance>>, Vec<NativeValue>) -> Result<NativeValue, HandlerError>
        + Send
        + Sync,
>;

/// A declared method: name, parameter types, and the handler.
#[derive(Clone)]
pub struct MethodDef {
    /// Method name as it appears on the wire.
    pub name: String,
    /// Declared parameter types, including context-resolved slots.
    pub params: Vec<TypeDesc>,
    /// The implementation.
    pub handler: MethodHandler,
}

impl MethodDef {
    /// Declared arity, counting context-resolved slots.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

impl fmt::Debug for MethodDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MethodDef({}/{})", self.name, self.params.len())
    }
}

/// The declared method surface of an exported class.
///
/// Schemas are built once, wrapped in an `Arc`, and shared; schema identity
/// is `Arc` pointer identity.
pub struct ClassSchema {
    /// Class name (the wire `javaClass` value for references).
    pub name: String,
    /// Interface class names this class implements.
    pub implements: Vec<String>,
    /// Public instance methods.
    pub methods: Vec<Arc<MethodDef>>,
    /// Public static methods.
    pub static_methods: Vec<Arc<MethodDef>>,
}

impl ClassSchema {
    /// Whether a value of class `other` may be exposed through this class:
    /// same class, or `other` declares this class among its interfaces.
    #[must_use]
    pub fn assignable_from(&self, other: &ClassSchema) -> bool {
        self.name == other.name || other.implements.iter().any(|i| i == &self.name)
    }
}

impl fmt::Debug for ClassSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassSchema")
            .field("name", &self.name)
            .field("methods", &self.methods.len())
            .field("static_methods", &self.static_methods.len())
            .finish()
    }
}

/// Fluent builder for [`ClassSchema`].
///
/// ```
/// use orb_core::{ClassBuilder, NativeValue, TypeDesc, IntWidth};
///
/// let schema = ClassBuilder::new("Counter")
///     .method("get", vec![], |_ctx, _this, _args| Ok(NativeValue::Int(0)))
///     .method(
///         "add",
///         vec![TypeDesc::Int(IntWidth::I32)],
///         |_ctx, _this, args| Ok(args.into_iter().next().unwrap()),
///     )
///     .build();
/// assert_eq!(schema.name, "Counter");
/// assert_eq!(schema.methods.len(), 2);
/// ```
pub struct ClassBuilder {
    name: String,
    implements: Vec<String>,
    methods: Vec<Arc<MethodDef>>,
    static_methods: Vec<Arc<MethodDef>>,
}

impl ClassBuilder {
    /// Start a schema for the named class.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            implements: Vec::new(),
            methods: Vec::new(),
            static_methods: Vec::new(),
        }
    }

    /// Declare an implemented interface class name.
    #[must_use]
    pub fn implements(mut self, iface: impl Into<String>) -> Self {
        self.implements.push(iface.into());
        self
    }

    /// Declare a public instance method.
    #[must_use]
    pub fn method<F>(mut self, name: impl Into<String>, params: Vec<TypeDesc>, handler: F) -> Self
    where
        F: Fn(&CallContext, Option<&Arc<Instance>>, Vec<NativeValue>) -> Result<NativeValue, HandlerError>
            + Send
            + Sync
            + 'static,
    {
        self.methods.push(Arc::new(MethodDef {
            name: name.into(),
            params,
            handler: Arc::new(handler),
        }));
        self
    }

    /// Declare a public static method.
    #[must_use]
    pub fn static_method<F>(
        mut self,
        name: impl Into<String>,
        params: Vec<TypeDesc>,
        handler: F,
    ) -> Self
    where
        F: Fn(&CallContext, Option<&Arc<Instance>>, Vec<NativeValue>) -> Result<NativeValue, HandlerError>
            + Send
            + Sync
            + 'static,
    {
        self.static_methods.push(Arc::new(MethodDef {
            name: name.into(),
            params,
            handler: Arc::new(handler),
        }));
        self
    }

    /// Finish the schema.
    #[must_use]
    pub fn build(self) -> Arc<ClassSchema> {
        Arc::new(ClassSchema {
            name: self.name,
            implements: self.implements,
            methods: self.methods,
            static_methods: self.static_methods,
        })
    }
}

/// A live exported object: a class plus opaque application state.
pub struct Instance {
    class: Arc<ClassSchema>,
    state: Arc<dyn Any + Send + Sync>,
}

impl Instance {
    /// Create an instance of `class` around `state`.
    pub fn new<T: Send + Sync + 'static>(class: Arc<ClassSchema>, state: T) -> Arc<Self> {
        Arc::new(Self {
            class,
            state: Arc::new(state),
        })
    }

    /// The instance's class.
    #[must_use]
    pub fn class(&self) -> &Arc<ClassSchema> {
        &self.class
    }

    /// Downcast the state to its concrete type.
    #[must_use]
    pub fn state<T: 'static>(&self) -> Option<&T> {
        self.state.downcast_ref::<T>()
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instance({})", self.class.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_class(name: &str) -> Arc<ClassSchema> {
        ClassBuilder::new(name)
            .method("ping", vec![], |_ctx, _this, _args| Ok(NativeValue::Null))
            .build()
    }

    #[test]
    fn builder_collects_methods() {
        let schema = ClassBuilder::new("Svc")
            .method("a", vec![], |_, _, _| Ok(NativeValue::Null))
            .method("b", vec![TypeDesc::String], |_, _, _| Ok(NativeValue::Null))
            .static_method("s", vec![], |_, _, _| Ok(NativeValue::Null))
            .build();
        assert_eq!(schema.methods.len(), 2);
        assert_eq!(schema.static_methods.len(), 1);
        assert_eq!(schema.methods[1].arity(), 1);
    }

    #[test]
    fn assignability_via_declared_interfaces() {
        let iface = noop_class("Handle");
        let class = ClassBuilder::new("HandleImpl")
            .implements("Handle")
            .method("ping", vec![], |_, _, _| Ok(NativeValue::Null))
            .build();
        assert!(iface.assignable_from(&class));
        assert!(!class.assignable_from(&iface));
        assert!(class.assignable_from(&class));
    }

    #[test]
    fn instance_state_downcast() {
        let schema = noop_class("Svc");
        let inst = Instance::new(schema, 41u32);
        assert_eq!(inst.state::<u32>(), Some(&41));
        assert!(inst.state::<String>().is_none());
    }

    #[test]
    fn handler_invocation() {
        let schema = ClassBuilder::new("Echo")
            .method("echo", vec![TypeDesc::Any], |_ctx, _this, mut args| {
                Ok(args.remove(0))
            })
            .build();
        let ctx = CallContext::none();
        let method = &schema.methods[0];
        let out = (method.handler)(&ctx, None, vec![NativeValue::Int(7)]).unwrap();
        assert!(out.deep_eq(&NativeValue::Int(7)));
    }
}
