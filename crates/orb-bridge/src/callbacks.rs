// SPDX-License-Identifier: MIT OR Apache-2.0
//! Invocation hooks.
//!
//! Hooks observe dispatch at three points: before invocation, after a
//! successful invocation, and on error.  Registrations carry the accepted
//! context type and fire only for matching contexts.  Pre/post failures
//! become the invocation's error; error-hook failures are swallowed.

use orb_core::{CallContext, HandlerError, Instance, MethodDef, NativeValue};
use orb_error::RpcError;
use std::any::TypeId;
use std::sync::{Arc, RwLock};

/// Extension point observing method invocations.
///
/// All methods have default no-op implementations so hooks only override
/// the callbacks they care about.
pub trait InvocationCallback: Send + Sync {
    /// Called before the method is invoked.
    ///
    /// # Errors
    ///
    /// An error aborts the invocation and surfaces as a remote exception.
    fn pre_invoke(
        &self,
        _ctx: &CallContext,
        _instance: Option<&Arc<Instance>>,
        _method: &MethodDef,
        _args: &[NativeValue],
    ) -> Result<(), HandlerError> {
        Ok(())
    }

    /// Called after a successful invocation, before the result marshals.
    ///
    /// # Errors
    ///
    /// An error replaces the result with a remote exception.
    fn post_invoke(
        &self,
        _ctx: &CallContext,
        _instance: Option<&Arc<Instance>>,
        _method: &MethodDef,
        _result: &NativeValue,
    ) -> Result<(), HandlerError> {
        Ok(())
    }

    /// Called when the invocation fails.  Best-effort: failures inside the
    /// hook are swallowed.
    fn on_error(
        &self,
        _ctx: &CallContext,
        _instance: Option<&Arc<Instance>>,
        _method: &MethodDef,
        _error: &RpcError,
    ) {
    }

    /// Hook name for diagnostics.
    fn name(&self) -> &str;
}

struct CallbackEntry {
    context_type: TypeId,
    callback: Arc<dyn InvocationCallback>,
}

/// Ordered hook registry; hooks fire in registration order.
#[derive(Default)]
pub struct CallbackController {
    entries: RwLock<Vec<CallbackEntry>>,
}

impl CallbackController {
    /// An empty controller.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook for contexts of `context_type`.
    pub fn register(&self, context_type: TypeId, callback: Arc<dyn InvocationCallback>) {
        self.entries
            .write()
            .expect("callback table poisoned")
            .push(CallbackEntry {
                context_type,
                callback,
            });
    }

    /// Register a hook for contexts of type `T`.
    pub fn register_for<T: 'static>(&self, callback: Arc<dyn InvocationCallback>) {
        self.register(TypeId::of::<T>(), callback);
    }

    /// Remove every registration of `callback`.
    pub fn unregister(&self, callback: &Arc<dyn InvocationCallback>) {
        self.entries
            .write()
            .expect("callback table poisoned")
            .retain(|entry| !Arc::ptr_eq(&entry.callback, callback));
    }

    /// Number of registered hooks.
    #[must_use]
    pub fn callback_count(&self) -> usize {
        self.entries.read().expect("callback table poisoned").len()
    }

    fn matching(&self, ctx: &CallContext) -> Vec<Arc<dyn InvocationCallback>> {
        self.entries
            .read()
            .expect("callback table poisoned")
            .iter()
            .filter(|entry| entry.context_type == ctx.context_type())
            .map(|entry| entry.callback.clone())
            .collect()
    }

    /// Fire pre-invoke hooks; the first failure aborts.
    pub(crate) fn fire_pre(
        &self,
        ctx: &CallContext,
        instance: Option<&Arc<Instance>>,
        method: &MethodDef,
        args: &[NativeValue],
    ) -> Result<(), HandlerError> {
        for callback in self.matching(ctx) {
            callback.pre_invoke(ctx, instance, method, args)?;
        }
        Ok(())
    }

    /// Fire post-invoke hooks; the first failure aborts.
    pub(crate) fn fire_post(
        &self,
        ctx: &CallContext,
        instance: Option<&Arc<Instance>>,
        method: &MethodDef,
        result: &NativeValue,
    ) -> Result<(), HandlerError> {
        for callback in self.matching(ctx) {
            callback.post_invoke(ctx, instance, method, result)?;
        }
        Ok(())
    }

    /// Fire error hooks, swallowing their own failures.
    pub(crate) fn fire_error(
        &self,
        ctx: &CallContext,
        instance: Option<&Arc<Instance>>,
        method: &MethodDef,
        error: &RpcError,
    ) {
        for callback in self.matching(ctx) {
            let hook = callback.name().to_owned();
            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                callback.on_error(ctx, instance, method, error);
            }));
            if outcome.is_err() {
                tracing::warn!(target: "orb.hooks", hook = %hook, "error hook panicked");
            }
        }
    }
}
