// SPDX-License-Identifier: MIT OR Apache-2.0
//! The transport context handed to every dispatch.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// Opaque transport context.
///
/// The transport shell wraps whatever per-request value it has (a session, a
/// request object, a unit for tests) and the bridge threads it through
/// hooks, local-arg resolvers, and method handlers.  Matching is by the
/// concrete type of the wrapped value.
#[derive(Clone)]
pub struct CallContext {
    value: Arc<dyn Any + Send + Sync>,
    type_id: TypeId,
}

impl CallContext {
    /// Wrap a concrete context value.
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self {
            value: Arc::new(value),
            type_id: TypeId::of::<T>(),
        }
    }

    /// A context carrying nothing (unit).
    #[must_use]
    pub fn none() -> Self {
        Self::new(())
    }

    /// The `TypeId` of the wrapped value.
    #[must_use]
    pub fn context_type(&self) -> TypeId {
        self.type_id
    }

    /// Downcast the wrapped value.
    #[must_use]
    pub fn get<T: 'static>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Whether the wrapped value is of type `T`.
    #[must_use]
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

impl fmt::Debug for CallContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CallContext({:?})", self.type_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Session {
        user: &'static str,
    }

    #[test]
    fn downcast_roundtrip() {
        let ctx = CallContext::new(Session { user: "ada" });
        assert!(ctx.is::<Session>());
        assert_eq!(ctx.get::<Session>().unwrap().user, "ada");
        assert!(ctx.get::<String>().is_none());
    }

    #[test]
    fn none_is_unit() {
        let ctx = CallContext::none();
        assert!(ctx.is::<()>());
        assert_eq!(ctx.context_type(), TypeId::of::<()>());
    }

    #[test]
    fn clone_shares_value() {
        let ctx = CallContext::new(String::from("shared"));
        let other = ctx.clone();
        assert_eq!(other.get::<String>().unwrap(), "shared");
    }
}
