// SPDX-License-Identifier: MIT OR Apache-2.0
//! Positional references into a JSON tree, and fixups.
//!
//! A path is a token chain from an envelope root (`result` outbound,
//! `params` inbound) down to one slot.  A [`FixUp`] pairs two paths and
//! means "after parse, assign the value at `source` into `target`" — the
//! mechanism that rebuilds duplicate and cyclic graph edges the tree
//! encoding cannot carry.

use std::fmt;

/// One step of a reference path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathToken {
    /// Object key (or the envelope root name as the first token).
    Key(String),
    /// Array index.
    Index(usize),
}

impl PathToken {
    /// Key token.
    pub fn key(name: impl Into<String>) -> Self {
        Self::Key(name.into())
    }

    /// Index token.
    #[must_use]
    pub fn index(i: usize) -> Self {
        Self::Index(i)
    }
}

/// Render a path in the legacy printable syntax: the root bare, indices as
/// `[n]`, keys as `["escaped"]`.
#[must_use]
pub fn render_path(path: &[PathToken]) -> String {
    let mut out = String::new();
    for (i, token) in path.iter().enumerate() {
        match token {
            PathToken::Key(k) if i == 0 => out.push_str(k),
            PathToken::Key(k) => {
                out.push('[');
                // serde_json string rendering gives the JSON-escaped form.
                out.push_str(&serde_json::Value::String(k.clone()).to_string());
                out.push(']');
            }
            PathToken::Index(n) => {
                out.push('[');
                out.push_str(&n.to_string());
                out.push(']');
            }
        }
    }
    out
}

/// A post-parse assignment: `target := source`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixUp {
    /// Path of the slot to overwrite.
    pub target: Vec<PathToken>,
    /// Path of the value to copy in (by reference, on the native side).
    pub source: Vec<PathToken>,
}

impl FixUp {
    /// Pair two paths.
    #[must_use]
    pub fn new(target: Vec<PathToken>, source: Vec<PathToken>) -> Self {
        Self { target, source }
    }
}

impl fmt::Display for FixUp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", render_path(&self.target), render_path(&self.source))
    }
}
