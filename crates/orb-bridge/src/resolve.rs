// SPDX-License-Identifier: MIT OR Apache-2.0
//! Overload resolution.
//!
//! Candidates are the methods whose wire arity (declared arity minus
//! context-resolved slots) matches the argument count.  Each candidate is
//! scored with the codecs' `try_unmarshal` probe per parameter, combined
//! worst-wins; the lowest combined mismatch wins.  Ties fall to the more
//! specific signature, then to declaration order.

use orb_codec::{ObjectMatch, SerializerRegistry, SerializerState};
use orb_core::{MethodDef, TypeDesc, TypeRegistry};
use serde_json::Value;
use std::sync::Arc;

use crate::BridgeError;

/// A scored candidate during resolution.
#[derive(Clone)]
pub(crate) struct MethodCandidate {
    pub method: Arc<MethodDef>,
    pub score: ObjectMatch,
}

/// The parameter types a caller sees on the wire: declared order, with
/// context-resolved slots stripped.
pub(crate) fn wire_params<'a>(
    method: &'a MethodDef,
    is_local: &dyn Fn(&TypeDesc) -> bool,
) -> Vec<&'a TypeDesc> {
    method.params.iter().filter(|p| !is_local(p)).collect()
}

/// Pick the best candidate for `args`.
///
/// A single candidate is returned without scoring, matching the fast path
/// of an unambiguous `(name, arity)` key.
pub(crate) fn select(
    registry: &SerializerRegistry,
    state: &mut SerializerState,
    types: &TypeRegistry,
    candidates: Vec<Arc<MethodDef>>,
    args: &[Value],
    is_local: &dyn Fn(&TypeDesc) -> bool,
) -> Result<Arc<MethodDef>, BridgeError> {
    if candidates.is_empty() {
        return Err(BridgeError::NoMethod("no candidate methods".into()));
    }
    if candidates.len() == 1 {
        return Ok(candidates.into_iter().next().ok_or_else(|| {
            BridgeError::NoMethod("no candidate methods".into())
        })?);
    }

    let mut scored: Vec<MethodCandidate> = Vec::new();
    'candidates: for method in candidates {
        let params = wire_params(&method, is_local);
        let mut score = ObjectMatch::EXACT;
        for (param, arg) in params.iter().zip(args.iter()) {
            match registry.try_unmarshal(state, param, arg) {
                Ok(m) => score = score.max(m),
                // Any probe failure discards the candidate.
                Err(_) => continue 'candidates,
            }
        }
        scored.push(MethodCandidate { method, score });
    }

    let Some(best_score) = scored.iter().map(|c| c.score).min() else {
        return Err(BridgeError::NoMethod(
            "no overload accepts the given arguments".into(),
        ));
    };
    let mut tied = scored.into_iter().filter(|c| c.score == best_score);
    let mut best = tied
        .next()
        .ok_or_else(|| BridgeError::NoMethod("no overload survived scoring".into()))?;
    for challenger in tied {
        if more_specific(&challenger.method, &best.method, types, is_local) {
            best = challenger;
        }
    }
    Ok(best.method)
}

/// Whether `a` is strictly more specific than `b`: parameter-wise, `a` has
/// more positions where its type is narrower (assignable into `b`'s but not
/// vice versa counts through the plain assignable-from census).
fn more_specific(
    a: &MethodDef,
    b: &MethodDef,
    types: &TypeRegistry,
    is_local: &dyn Fn(&TypeDesc) -> bool,
) -> bool {
    let a_params = wire_params(a, is_local);
    let b_params = wire_params(b, is_local);
    let narrower_a = narrower_count(&a_params, &b_params, types);
    let narrower_b = narrower_count(&b_params, &a_params, types);
    narrower_a > narrower_b
}

/// How many of `other`'s parameter types are assignable from `these` — the
/// count of positions where `these` is the narrower signature.
fn narrower_count(these: &[&TypeDesc], other: &[&TypeDesc], types: &TypeRegistry) -> usize {
    these
        .iter()
        .zip(other.iter())
        .filter(|(this, that)| that.is_assignable_from(this, types))
        .count()
}
