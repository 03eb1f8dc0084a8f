// SPDX-License-Identifier: MIT OR Apache-2.0
//! Applying inbound fixups.
//!
//! Fixups arrive with a decoded request and are applied in two passes:
//!
//! 1. [`FixupApplier::apply_to_tree`] rewrites the JSON tree before overload
//!    resolution, replacing the `null` placeholders with copies of their
//!    sources so every codec sees the real shapes.  A JSON tree cannot alias
//!    nodes, so this pass restores shape only.
//! 2. [`FixupApplier::relink`] runs after the arguments are unmarshalled and
//!    re-points each target slot at the *same native node* as its source,
//!    restoring shared identity and cycles that the tree encoding cannot
//!    carry.

use orb_core::{NativeValue, PathToken, FixUp, render_path};
use serde_json::Value;

use crate::CodecError;

/// Applies fixup scripts against decoded requests.
pub struct FixupApplier;

impl FixupApplier {
    /// Apply each fixup, in order, against the envelope tree.
    ///
    /// `root` is the envelope object (e.g. `{"params": […]}`); the first
    /// token of every path names the envelope slot.  Sources are copied —
    /// identity is restored later by [`Self::relink`].
    ///
    /// # Errors
    ///
    /// [`CodecError::MissingSource`] when a source path resolves to nothing,
    /// [`CodecError::BadPath`] when a target path is malformed.
    pub fn apply_to_tree(root: &mut Value, fixups: &[FixUp]) -> Result<(), CodecError> {
        for fix in fixups {
            let source = json_lookup(root, &fix.source)?.clone();
            json_assign(root, &fix.target, source)?;
        }
        Ok(())
    }

    /// Re-point each target slot at the same native node as its source.
    ///
    /// `root` is the envelope root value; for an inbound request this is the
    /// params wrapped in a list node, so `params[1]=params[0]` can replace a
    /// top-level argument slot.
    ///
    /// # Errors
    ///
    /// [`CodecError::MissingSource`] / [`CodecError::BadPath`] mirroring
    /// [`Self::apply_to_tree`].
    pub fn relink(root_name: &str, root: &NativeValue, fixups: &[FixUp]) -> Result<(), CodecError> {
        for fix in fixups {
            let source = native_lookup(root_name, root, &fix.source)?;
            native_assign(root_name, root, &fix.target, source)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// JSON tree navigation
// ---------------------------------------------------------------------------

fn json_lookup<'a>(root: &'a Value, path: &[PathToken]) -> Result<&'a Value, CodecError> {
    let mut cur = root;
    for token in path {
        cur = match (cur, token) {
            (Value::Object(map), PathToken::Key(k)) => map
                .get(k)
                .ok_or_else(|| CodecError::MissingSource(render_path(path)))?,
            (Value::Array(items), PathToken::Index(i)) => items
                .get(*i)
                .ok_or_else(|| CodecError::MissingSource(render_path(path)))?,
            _ => return Err(CodecError::MissingSource(render_path(path))),
        };
    }
    Ok(cur)
}

fn json_assign(root: &mut Value, path: &[PathToken], value: Value) -> Result<(), CodecError> {
    let Some((last, parents)) = path.split_last() else {
        return Err(CodecError::BadPath("empty target path".into()));
    };
    let mut cur = root;
    for token in parents {
        cur = match (cur, token) {
            (Value::Object(map), PathToken::Key(k)) => map
                .get_mut(k)
                .ok_or_else(|| CodecError::BadPath(render_path(path)))?,
            (Value::Array(items), PathToken::Index(i)) => items
                .get_mut(*i)
                .ok_or_else(|| CodecError::BadPath(render_path(path)))?,
            _ => return Err(CodecError::BadPath(render_path(path))),
        };
    }
    match (cur, last) {
        (Value::Object(map), PathToken::Key(k)) => {
            map.insert(k.clone(), value);
            Ok(())
        }
        (Value::Array(items), PathToken::Index(i)) if *i < items.len() => {
            items[*i] = value;
            Ok(())
        }
        _ => Err(CodecError::BadPath(render_path(path))),
    }
}

// ---------------------------------------------------------------------------
// Native graph navigation
// ---------------------------------------------------------------------------
//
// Native paths mirror the JSON tree, so container payload wrapper keys
// ("list", "set", "map") appear in paths and must be consumed without
// descending.

fn check_root<'a>(
    root_name: &str,
    path: &'a [PathToken],
) -> Result<&'a [PathToken], CodecError> {
    match path.first() {
        Some(PathToken::Key(k)) if k == root_name => Ok(&path[1..]),
        _ => Err(CodecError::BadPath(format!(
            "path {} does not start at {root_name}",
            render_path(path)
        ))),
    }
}

/// Consume one logical step: returns the child value and how many tokens
/// were eaten.
fn native_step(
    cur: &NativeValue,
    tokens: &[PathToken],
    full: &[PathToken],
) -> Result<(NativeValue, usize), CodecError> {
    match cur {
        NativeValue::List(rc) | NativeValue::Set(rc) => {
            let wrapper = if matches!(cur, NativeValue::List(_)) { "list" } else { "set" };
            let (idx_token, eaten) = match tokens {
                [PathToken::Key(k), rest @ ..] if k == wrapper && !rest.is_empty() => (&rest[0], 2),
                [first, ..] => (first, 1),
                [] => return Err(CodecError::BadPath(render_path(full))),
            };
            let PathToken::Index(i) = idx_token else {
                return Err(CodecError::BadPath(render_path(full)));
            };
            let items = rc.borrow();
            let child = items
                .get(*i)
                .cloned()
                .ok_or_else(|| CodecError::MissingSource(render_path(full)))?;
            Ok((child, eaten))
        }
        NativeValue::Array { items, .. } => match tokens {
            [PathToken::Index(i), ..] => {
                let child = items
                    .borrow()
                    .get(*i)
                    .cloned()
                    .ok_or_else(|| CodecError::MissingSource(render_path(full)))?;
                Ok((child, 1))
            }
            _ => Err(CodecError::BadPath(render_path(full))),
        },
        NativeValue::Map(rc) => {
            let (key_token, eaten) = match tokens {
                [PathToken::Key(k), rest @ ..] if k == "map" && !rest.is_empty() => (&rest[0], 2),
                [first, ..] => (first, 1),
                [] => return Err(CodecError::BadPath(render_path(full))),
            };
            let PathToken::Key(key) = key_token else {
                return Err(CodecError::BadPath(render_path(full)));
            };
            let entries = rc.borrow();
            let child = entries
                .get(key)
                .cloned()
                .ok_or_else(|| CodecError::MissingSource(render_path(full)))?;
            Ok((child, eaten))
        }
        NativeValue::Bean(rc) => match tokens {
            [PathToken::Key(prop), ..] => {
                let bean = rc.borrow();
                let child = bean
                    .props
                    .get(prop)
                    .cloned()
                    .ok_or_else(|| CodecError::MissingSource(render_path(full)))?;
                Ok((child, 1))
            }
            _ => Err(CodecError::BadPath(render_path(full))),
        },
        _ => Err(CodecError::BadPath(render_path(full))),
    }
}

fn native_lookup(
    root_name: &str,
    root: &NativeValue,
    path: &[PathToken],
) -> Result<NativeValue, CodecError> {
    let mut tokens = check_root(root_name, path)?;
    let mut cur = root.clone();
    while !tokens.is_empty() {
        let (child, eaten) = native_step(&cur, tokens, path)?;
        cur = child;
        tokens = &tokens[eaten..];
    }
    Ok(cur)
}

/// Write `value` into the slot named by the last step of `path`.
fn native_assign(
    root_name: &str,
    root: &NativeValue,
    path: &[PathToken],
    value: NativeValue,
) -> Result<(), CodecError> {
    let tokens = check_root(root_name, path)?;
    if tokens.is_empty() {
        return Err(CodecError::BadPath(format!(
            "cannot replace the envelope root {root_name}"
        )));
    }
    let mut cur = root.clone();
    let mut tokens = tokens;
    loop {
        // Decide whether the next step is the final one by consuming it
        // against the current node.
        match &cur {
            NativeValue::List(rc) | NativeValue::Set(rc) => {
                let wrapper = if matches!(cur, NativeValue::List(_)) { "list" } else { "set" };
                let (idx_token, eaten) = match tokens {
                    [PathToken::Key(k), rest @ ..] if k == wrapper && !rest.is_empty() => {
                        (&rest[0], 2)
                    }
                    [first, ..] => (first, 1),
                    [] => return Err(CodecError::BadPath(render_path(path))),
                };
                let PathToken::Index(i) = idx_token else {
                    return Err(CodecError::BadPath(render_path(path)));
                };
                if tokens.len() == eaten {
                    let mut items = rc.borrow_mut();
                    if *i >= items.len() {
                        return Err(CodecError::BadPath(render_path(path)));
                    }
                    items[*i] = value;
                    return Ok(());
                }
                let next = rc
                    .borrow()
                    .get(*i)
                    .cloned()
                    .ok_or_else(|| CodecError::BadPath(render_path(path)))?;
                cur = next;
                tokens = &tokens[eaten..];
            }
            NativeValue::Array { items, .. } => {
                let [PathToken::Index(i), ..] = tokens else {
                    return Err(CodecError::BadPath(render_path(path)));
                };
                if tokens.len() == 1 {
                    let mut elems = items.borrow_mut();
                    if *i >= elems.len() {
                        return Err(CodecError::BadPath(render_path(path)));
                    }
                    elems[*i] = value;
                    return Ok(());
                }
                let next = items
                    .borrow()
                    .get(*i)
                    .cloned()
                    .ok_or_else(|| CodecError::BadPath(render_path(path)))?;
                cur = next;
                tokens = &tokens[1..];
            }
            NativeValue::Map(rc) => {
                let (key_token, eaten) = match tokens {
                    [PathToken::Key(k), rest @ ..] if k == "map" && !rest.is_empty() => {
                        (&rest[0], 2)
                    }
                    [first, ..] => (first, 1),
                    [] => return Err(CodecError::BadPath(render_path(path))),
                };
                let PathToken::Key(key) = key_token else {
                    return Err(CodecError::BadPath(render_path(path)));
                };
                if tokens.len() == eaten {
                    rc.borrow_mut().insert(key.clone(), value);
                    return Ok(());
                }
                let next = rc
                    .borrow()
                    .get(key)
                    .cloned()
                    .ok_or_else(|| CodecError::BadPath(render_path(path)))?;
                cur = next;
                tokens = &tokens[eaten..];
            }
            NativeValue::Bean(rc) => {
                let [PathToken::Key(prop), ..] = tokens else {
                    return Err(CodecError::BadPath(render_path(path)));
                };
                if tokens.len() == 1 {
                    rc.borrow_mut().props.insert(prop.clone(), value);
                    return Ok(());
                }
                let next = rc
                    .borrow()
                    .props
                    .get(prop)
                    .cloned()
                    .ok_or_else(|| CodecError::BadPath(render_path(path)))?;
                cur = next;
                tokens = &tokens[1..];
            }
            _ => return Err(CodecError::BadPath(render_path(path))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orb_core::Bean;
    use serde_json::json;

    fn fix(target: Vec<PathToken>, source: Vec<PathToken>) -> FixUp {
        FixUp::new(target, source)
    }

    // -- JSON tree pass --------------------------------------------------

    #[test]
    fn tree_duplicate_restored_by_copy() {
        let mut root = json!({"params": [{"v": 1}, null]});
        let fixups = [fix(
            vec![PathToken::key("params"), PathToken::index(1)],
            vec![PathToken::key("params"), PathToken::index(0)],
        )];
        FixupApplier::apply_to_tree(&mut root, &fixups).unwrap();
        assert_eq!(root["params"][1], json!({"v": 1}));
    }

    #[test]
    fn tree_missing_source_is_reported() {
        let mut root = json!({"params": []});
        let fixups = [fix(
            vec![PathToken::key("params"), PathToken::index(0)],
            vec![PathToken::key("params"), PathToken::index(7)],
        )];
        let err = FixupApplier::apply_to_tree(&mut root, &fixups).unwrap_err();
        assert!(matches!(err, CodecError::MissingSource(_)));
    }

    #[test]
    fn tree_bad_target_is_reported() {
        let mut root = json!({"params": [1]});
        let fixups = [fix(
            vec![PathToken::key("params"), PathToken::index(5)],
            vec![PathToken::key("params"), PathToken::index(0)],
        )];
        let err = FixupApplier::apply_to_tree(&mut root, &fixups).unwrap_err();
        assert!(matches!(err, CodecError::BadPath(_)));
    }

    #[test]
    fn tree_fixups_apply_in_order() {
        // Second fixup reads a slot the first one wrote.
        let mut root = json!({"params": [5, null, null]});
        let fixups = [
            fix(
                vec![PathToken::key("params"), PathToken::index(1)],
                vec![PathToken::key("params"), PathToken::index(0)],
            ),
            fix(
                vec![PathToken::key("params"), PathToken::index(2)],
                vec![PathToken::key("params"), PathToken::index(1)],
            ),
        ];
        FixupApplier::apply_to_tree(&mut root, &fixups).unwrap();
        assert_eq!(root["params"], json!([5, 5, 5]));
    }

    // -- Native relink pass ----------------------------------------------

    #[test]
    fn relink_restores_shared_identity() {
        let a = NativeValue::bean(Bean::new("B").with("v", NativeValue::Int(1)));
        let copy = NativeValue::bean(Bean::new("B").with("v", NativeValue::Int(1)));
        let params = NativeValue::list(vec![a.clone(), copy]);
        let fixups = [fix(
            vec![PathToken::key("params"), PathToken::index(1)],
            vec![PathToken::key("params"), PathToken::index(0)],
        )];
        FixupApplier::relink("params", &params, &fixups).unwrap();
        if let NativeValue::List(rc) = &params {
            let items = rc.borrow();
            assert!(items[0].same_node(&items[1]));
        }
    }

    #[test]
    fn relink_builds_cycles() {
        let node = NativeValue::bean(Bean::new("Node").with("next", NativeValue::Null));
        let params = NativeValue::list(vec![node.clone()]);
        let fixups = [fix(
            vec![
                PathToken::key("params"),
                PathToken::index(0),
                PathToken::key("next"),
            ],
            vec![PathToken::key("params"), PathToken::index(0)],
        )];
        FixupApplier::relink("params", &params, &fixups).unwrap();
        if let NativeValue::Bean(rc) = &node {
            let bean = rc.borrow();
            assert!(bean.props["next"].same_node(&node));
        }
    }

    #[test]
    fn relink_through_container_wrappers() {
        let shared = NativeValue::bean(Bean::new("B"));
        let list = NativeValue::list(vec![shared.clone(), NativeValue::Null]);
        let params = NativeValue::list(vec![list.clone()]);
        let fixups = [fix(
            vec![
                PathToken::key("params"),
                PathToken::index(0),
                PathToken::key("list"),
                PathToken::index(1),
            ],
            vec![
                PathToken::key("params"),
                PathToken::index(0),
                PathToken::key("list"),
                PathToken::index(0),
            ],
        )];
        FixupApplier::relink("params", &params, &fixups).unwrap();
        if let NativeValue::List(rc) = &list {
            let items = rc.borrow();
            assert!(items[0].same_node(&items[1]));
        }
    }

    #[test]
    fn relink_rejects_wrong_root() {
        let params = NativeValue::list(vec![]);
        let fixups = [fix(
            vec![PathToken::key("result"), PathToken::index(0)],
            vec![PathToken::key("result"), PathToken::index(0)],
        )];
        let err = FixupApplier::relink("params", &params, &fixups).unwrap_err();
        assert!(matches!(err, CodecError::BadPath(_)));
    }

    #[test]
    fn relink_rejects_replacing_the_root() {
        let params = NativeValue::list(vec![NativeValue::Int(1)]);
        let fixups = [fix(
            vec![PathToken::key("params")],
            vec![PathToken::key("params"), PathToken::index(0)],
        )];
        let err = FixupApplier::relink("params", &params, &fixups).unwrap_err();
        assert!(matches!(err, CodecError::BadPath(_)));
    }
}
