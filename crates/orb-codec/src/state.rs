// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-call serializer state: graph identity tracking and fixup collection.

use orb_core::{FixUp, Instance, PathToken};
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::SerializerConfig;

/// How a class is exposed on the wire when registered for
/// reference-substitution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    /// Opaque, non-invocable handle.
    Reference,
    /// Handle whose class exposes methods the peer may invoke.
    Callable,
}

/// The bridge-side service the reference codec talks to.
///
/// Keeps the codec crate free of a dependency on the bridge: the bridge
/// implements this trait over its registration tables and threads itself
/// into the state for the duration of a call.
pub trait ReferenceBinder: Send + Sync {
    /// Whether `class` is registered for reference substitution, and how.
    fn reference_kind(&self, class: &str) -> Option<RefKind>;

    /// Mint — or look up — the stable handle for an instance.
    fn bind_handle(&self, instance: &Arc<Instance>) -> i64;

    /// Re-bind a handle to the instance it was minted for.
    fn resolve_handle(&self, handle: i64) -> Option<Arc<Instance>>;
}

/// Per-invocation codec state.
///
/// Created fresh for each marshal or unmarshal pass and discarded at
/// envelope construction.  During marshal it maintains the identity map of
/// visited shareable natives, the explicit ancestor stack used for the
/// cycle check, and the accumulated fixups.
pub struct SerializerState {
    config: SerializerConfig,
    binder: Option<Arc<dyn ReferenceBinder>>,
    path: Vec<PathToken>,
    first_seen: HashMap<usize, Vec<PathToken>>,
    ancestors: Vec<usize>,
    fixups: Vec<FixUp>,
}

impl SerializerState {
    /// State with an empty current path.
    #[must_use]
    pub fn new(config: SerializerConfig) -> Self {
        Self {
            config,
            binder: None,
            path: Vec::new(),
            first_seen: HashMap::new(),
            ancestors: Vec::new(),
            fixups: Vec::new(),
        }
    }

    /// State rooted at an envelope slot (`"result"` outbound, `"params"`
    /// inbound).
    #[must_use]
    pub fn with_root(config: SerializerConfig, root: &str) -> Self {
        let mut state = Self::new(config);
        state.path.push(PathToken::key(root));
        state
    }

    /// Attach the reference binder for this call.
    #[must_use]
    pub fn with_binder(mut self, binder: Arc<dyn ReferenceBinder>) -> Self {
        self.binder = Some(binder);
        self
    }

    /// The serializer configuration in effect.
    #[must_use]
    pub fn config(&self) -> &SerializerConfig {
        &self.config
    }

    /// The reference binder, when one is attached.
    #[must_use]
    pub fn binder(&self) -> Option<&Arc<dyn ReferenceBinder>> {
        self.binder.as_ref()
    }

    /// The path of the node currently being processed.
    #[must_use]
    pub fn current_path(&self) -> &[PathToken] {
        &self.path
    }

    /// Descend into a child slot.
    pub fn push_path(&mut self, token: PathToken) {
        self.path.push(token);
    }

    /// Return from a child slot.
    pub fn pop_path(&mut self) {
        self.path.pop();
    }

    /// The recorded first-occurrence path of a node, if it was visited.
    pub(crate) fn first_occurrence(&self, id: usize) -> Option<&Vec<PathToken>> {
        self.first_seen.get(&id)
    }

    /// Whether the node is on the current construction stack.  This walks
    /// the ancestor stack, not the identity map: a node that finished
    /// marshalling elsewhere is a duplicate, not a cycle.
    pub(crate) fn is_ancestor(&self, id: usize) -> bool {
        self.ancestors.contains(&id)
    }

    /// Record a first visit at the current path and enter the node.
    pub(crate) fn mark_visited(&mut self, id: usize) {
        self.first_seen.insert(id, self.path.clone());
        self.ancestors.push(id);
    }

    /// Re-enter an already-recorded node (duplicate re-expansion).
    pub(crate) fn reenter(&mut self, id: usize) {
        self.ancestors.push(id);
    }

    /// Leave the node entered by [`Self::mark_visited`] or [`Self::reenter`].
    pub(crate) fn leave(&mut self) {
        self.ancestors.pop();
    }

    /// Record a fixup from the current path to `source`.
    pub(crate) fn record_fixup(&mut self, source: Vec<PathToken>) {
        self.fixups.push(FixUp::new(self.path.clone(), source));
    }

    /// The fixups accumulated so far.
    #[must_use]
    pub fn fixups(&self) -> &[FixUp] {
        &self.fixups
    }

    /// Drain the accumulated fixups for the envelope.
    pub fn take_fixups(&mut self) -> Vec<FixUp> {
        std::mem::take(&mut self.fixups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_stack() {
        let mut st = SerializerState::with_root(SerializerConfig::default(), "result");
        st.push_path(PathToken::index(2));
        assert_eq!(
            st.current_path(),
            &[PathToken::key("result"), PathToken::index(2)]
        );
        st.pop_path();
        assert_eq!(st.current_path(), &[PathToken::key("result")]);
    }

    #[test]
    fn visit_and_ancestor_tracking() {
        let mut st = SerializerState::new(SerializerConfig::default());
        st.mark_visited(1);
        assert!(st.is_ancestor(1));
        assert!(st.first_occurrence(1).is_some());
        st.leave();
        assert!(!st.is_ancestor(1));
        // Identity survives leaving: later sightings are duplicates.
        assert!(st.first_occurrence(1).is_some());
    }

    #[test]
    fn fixup_capture() {
        let mut st = SerializerState::with_root(SerializerConfig::default(), "result");
        st.push_path(PathToken::index(1));
        st.record_fixup(vec![PathToken::key("result"), PathToken::index(0)]);
        st.pop_path();
        let fixups = st.take_fixups();
        assert_eq!(fixups.len(), 1);
        assert_eq!(
            fixups[0].target,
            vec![PathToken::key("result"), PathToken::index(1)]
        );
        assert!(st.fixups().is_empty());
    }
}
