// SPDX-License-Identifier: MIT OR Apache-2.0
//! Built-in codecs.
//!
//! Registration order matters for `Any` targets: the discriminating
//! object-shape codecs (reference, date, bean, containers) are consulted
//! before the scalar fallbacks.  See
//! [`SerializerRegistry::with_defaults`](crate::SerializerRegistry::with_defaults).

mod array;
mod bean;
mod boolean;
mod containers;
mod date;
mod enums;
mod number;
mod raw;
mod reference;
mod string;

pub use array::ArrayCodec;
pub use bean::BeanCodec;
pub use boolean::BooleanCodec;
pub use containers::{ListCodec, MapCodec, SetCodec};
pub use date::DateCodec;
pub use enums::EnumCodec;
pub use number::NumberCodec;
pub use raw::RawJsonCodec;
pub use reference::ReferenceCodec;
pub use string::StringCodec;

/// Wire field carrying the class hint on containers, beans, dates, and
/// references.
pub(crate) const CLASS_HINT: &str = "javaClass";
