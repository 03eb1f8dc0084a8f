// SPDX-License-Identifier: MIT OR Apache-2.0
//! Context-resolved parameters.
//!
//! Some parameter classes are satisfied from the transport context instead
//! of the wire: the slot is stripped from the wire signature before
//! resolution and injected at invocation time.  Resolvers are keyed by
//! `(argument class name, context type)`.

use orb_core::{CallContext, HandlerError, NativeValue, TypeDesc};
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// A resolver deriving an argument value from the transport context.
pub type LocalArgResolver =
    Arc<dyn Fn(&CallContext) -> Result<NativeValue, HandlerError> + Send + Sync>;

/// Registry of context-resolved parameter classes.
#[derive(Default)]
pub struct LocalArgController {
    resolvers: RwLock<HashMap<(String, TypeId), LocalArgResolver>>,
}

impl LocalArgController {
    /// An empty controller.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resolver for `(arg_class, context_type)`.
    pub fn register(&self, arg_class: &str, context_type: TypeId, resolver: LocalArgResolver) {
        self.resolvers
            .write()
            .expect("local-arg table poisoned")
            .insert((arg_class.to_owned(), context_type), resolver);
    }

    /// Register a typed resolver; the closure receives the downcast context.
    pub fn register_for<T, F>(&self, arg_class: &str, resolver: F)
    where
        T: Send + Sync + 'static,
        F: Fn(&T) -> Result<NativeValue, HandlerError> + Send + Sync + 'static,
    {
        let wrapped: LocalArgResolver = Arc::new(move |ctx: &CallContext| {
            let concrete = ctx
                .get::<T>()
                .ok_or_else(|| -> HandlerError { "context type mismatch".into() })?;
            resolver(concrete)
        });
        self.register(arg_class, TypeId::of::<T>(), wrapped);
    }

    /// Remove the resolver for `(arg_class, context_type)`; silent when
    /// absent.
    pub fn unregister(&self, arg_class: &str, context_type: TypeId) {
        self.resolvers
            .write()
            .expect("local-arg table poisoned")
            .remove(&(arg_class.to_owned(), context_type));
    }

    /// Whether `param` is context-resolved for contexts of `context_type`.
    #[must_use]
    pub fn is_local(&self, param: &TypeDesc, context_type: TypeId) -> bool {
        let TypeDesc::Object(class) = param else {
            return false;
        };
        self.resolvers
            .read()
            .expect("local-arg table poisoned")
            .contains_key(&(class.clone(), context_type))
    }

    /// Derive the value for a context-resolved parameter.
    #[must_use]
    pub fn resolve(
        &self,
        param: &TypeDesc,
        ctx: &CallContext,
    ) -> Option<Result<NativeValue, HandlerError>> {
        let TypeDesc::Object(class) = param else {
            return None;
        };
        let resolver = self
            .resolvers
            .read()
            .expect("local-arg table poisoned")
            .get(&(class.clone(), ctx.context_type()))
            .cloned()?;
        Some(resolver(ctx))
    }

    /// Number of registered resolvers.
    #[must_use]
    pub fn resolver_count(&self) -> usize {
        self.resolvers.read().expect("local-arg table poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Session {
        user: String,
    }

    fn session_param() -> TypeDesc {
        TypeDesc::Object("Session".into())
    }

    #[test]
    fn typed_registration_and_resolution() {
        let controller = LocalArgController::new();
        controller.register_for::<Session, _>("Session", |s| {
            Ok(NativeValue::String(s.user.clone()))
        });
        let ctx = CallContext::new(Session { user: "ada".into() });
        assert!(controller.is_local(&session_param(), ctx.context_type()));
        let value = controller.resolve(&session_param(), &ctx).unwrap().unwrap();
        assert!(value.deep_eq(&NativeValue::String("ada".into())));
    }

    #[test]
    fn context_type_gates_the_resolver() {
        let controller = LocalArgController::new();
        controller.register_for::<Session, _>("Session", |_| Ok(NativeValue::Null));
        let other_ctx = CallContext::new(42u32);
        assert!(!controller.is_local(&session_param(), other_ctx.context_type()));
        assert!(controller.resolve(&session_param(), &other_ctx).is_none());
    }

    #[test]
    fn non_object_params_are_never_local() {
        let controller = LocalArgController::new();
        controller.register_for::<Session, _>("Session", |_| Ok(NativeValue::Null));
        let ctx = CallContext::new(Session { user: String::new() });
        assert!(!controller.is_local(&TypeDesc::String, ctx.context_type()));
    }

    #[test]
    fn unregister_is_silent_when_absent() {
        let controller = LocalArgController::new();
        controller.unregister("Session", TypeId::of::<Session>());
        controller.register_for::<Session, _>("Session", |_| Ok(NativeValue::Null));
        assert_eq!(controller.resolver_count(), 1);
        controller.unregister("Session", TypeId::of::<Session>());
        assert_eq!(controller.resolver_count(), 0);
    }
}
