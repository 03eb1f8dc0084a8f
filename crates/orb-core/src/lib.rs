// SPDX-License-Identifier: MIT OR Apache-2.0
//! Core data model for the ORB JSON-RPC bridge.
//!
//! This crate sits at the bottom of the workspace graph and defines the
//! currency every other crate trades in:
//!
//! - [`NativeValue`] — the dynamic native value model.  Graph nodes that can
//!   be shared (containers, beans) are reference-counted, so object graphs
//!   with duplicates and cycles are expressible and identity is pointer
//!   identity.
//! - [`TypeDesc`] — declared parameter/return/property types, with the
//!   assignability relation used by overload resolution.
//! - [`TypeRegistry`] — declared bean and enum classes, the reflection
//!   surface for a language without runtime reflection.
//! - [`ClassSchema`] / [`ClassBuilder`] — exported classes: named methods
//!   with declared signatures and boxed handlers.
//! - [`Instance`] — a live exported object pairing a class with opaque state.
//! - [`PathToken`] / [`FixUp`] — positional references into a JSON tree and
//!   the post-parse assignment pairs that rebuild duplicates and cycles.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod context;
mod path;
mod registry;
mod schema;
mod types;
mod value;

pub use context::CallContext;
pub use path::{FixUp, PathToken, render_path};
pub use registry::{BeanClass, EnumClass, PropDef, TypeRegistry};
pub use schema::{ClassBuilder, ClassSchema, HandlerError, Instance, MethodDef, MethodHandler};
pub use types::{FloatWidth, IntWidth, TypeDesc};
pub use value::{Bean, NativeValue, ValueKind};
