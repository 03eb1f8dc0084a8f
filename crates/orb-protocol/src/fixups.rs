// SPDX-License-Identifier: MIT OR Apache-2.0
//! Fixup wire syntax.
//!
//! Two representations circulate:
//!
//! - **string form** (legacy requests): semicolon-joined `lhs=rhs` pairs,
//!   each side a chain of `root`, `[<int>]`, and `[<json-escaped-string>]`
//!   tokens, e.g. `params[1]=params[0];`
//! - **structured form** (responses, preferred): a JSON array of
//!   `[target_path, source_path]` pairs, each path an array of printable
//!   tokens, e.g. `[[["result","[1]"],["result","[0]"]]]`.
//!
//! Both are accepted on input; the structured form is emitted.

use orb_core::{FixUp, PathToken};
use serde_json::Value;

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a `fixups` field in either wire form.
///
/// # Errors
///
/// [`ProtocolError::BadFixups`] on any syntax violation.
pub fn parse_fixups(value: &Value) -> Result<Vec<FixUp>, ProtocolError> {
    match value {
        Value::String(s) => parse_fixup_string(s),
        Value::Array(pairs) => pairs.iter().map(parse_pair).collect(),
        other => Err(ProtocolError::BadFixups(format!(
            "expected string or array, got {other}"
        ))),
    }
}

fn parse_pair(pair: &Value) -> Result<FixUp, ProtocolError> {
    let items = pair
        .as_array()
        .filter(|a| a.len() == 2)
        .ok_or_else(|| ProtocolError::BadFixups(format!("{pair} is not a [target, source] pair")))?;
    Ok(FixUp::new(parse_path(&items[0])?, parse_path(&items[1])?))
}

fn parse_path(value: &Value) -> Result<Vec<PathToken>, ProtocolError> {
    let tokens = value
        .as_array()
        .ok_or_else(|| ProtocolError::BadFixups(format!("{value} is not a token array")))?;
    tokens.iter().map(parse_token).collect()
}

fn parse_token(value: &Value) -> Result<PathToken, ProtocolError> {
    match value {
        // Bare integers are accepted on input for liberal parsing.
        Value::Number(n) => n
            .as_u64()
            .map(|i| PathToken::index(i as usize))
            .ok_or_else(|| ProtocolError::BadFixups(format!("{n} is not an index"))),
        Value::String(s) if s.starts_with('[') => parse_bracket_token(s),
        Value::String(s) => Ok(PathToken::key(s.clone())),
        other => Err(ProtocolError::BadFixups(format!("{other} is not a path token"))),
    }
}

fn parse_bracket_token(token: &str) -> Result<PathToken, ProtocolError> {
    let inner = token
        .strip_prefix('[')
        .and_then(|t| t.strip_suffix(']'))
        .ok_or_else(|| ProtocolError::BadFixups(format!("{token:?} is not bracketed")))?;
    if inner.starts_with('"') {
        let key: String = serde_json::from_str(inner)
            .map_err(|_| ProtocolError::BadFixups(format!("{token:?} has a bad string key")))?;
        return Ok(PathToken::key(key));
    }
    inner
        .parse::<usize>()
        .map(PathToken::index)
        .map_err(|_| ProtocolError::BadFixups(format!("{token:?} is not an index")))
}

/// Parse the legacy semicolon-joined string form.
///
/// # Errors
///
/// [`ProtocolError::BadFixups`] on any syntax violation.
pub fn parse_fixup_string(script: &str) -> Result<Vec<FixUp>, ProtocolError> {
    script
        .split(';')
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .map(|chunk| {
            let (lhs, rhs) = chunk.split_once('=').ok_or_else(|| {
                ProtocolError::BadFixups(format!("{chunk:?} is not an lhs=rhs pair"))
            })?;
            Ok(FixUp::new(parse_path_string(lhs)?, parse_path_string(rhs)?))
        })
        .collect()
}

fn parse_path_string(chain: &str) -> Result<Vec<PathToken>, ProtocolError> {
    let chain = chain.trim();
    let root_end = chain.find('[').unwrap_or(chain.len());
    let root = &chain[..root_end];
    if root.is_empty() {
        return Err(ProtocolError::BadFixups(format!("{chain:?} has no root token")));
    }
    let mut tokens = vec![PathToken::key(root)];
    let mut rest = &chain[root_end..];
    while !rest.is_empty() {
        let inner = rest
            .strip_prefix('[')
            .ok_or_else(|| ProtocolError::BadFixups(format!("{chain:?}: expected '['")))?;
        if inner.starts_with('"') {
            let end = find_string_end(inner)
                .ok_or_else(|| ProtocolError::BadFixups(format!("{chain:?}: unterminated key")))?;
            let key: String = serde_json::from_str(&inner[..end]).map_err(|_| {
                ProtocolError::BadFixups(format!("{chain:?}: bad escaped key"))
            })?;
            tokens.push(PathToken::key(key));
            rest = inner[end..]
                .strip_prefix(']')
                .ok_or_else(|| ProtocolError::BadFixups(format!("{chain:?}: expected ']'")))?;
        } else {
            let end = inner
                .find(']')
                .ok_or_else(|| ProtocolError::BadFixups(format!("{chain:?}: expected ']'")))?;
            let index = inner[..end].parse::<usize>().map_err(|_| {
                ProtocolError::BadFixups(format!("{chain:?}: {:?} is not an index", &inner[..end]))
            })?;
            tokens.push(PathToken::index(index));
            rest = &inner[end + 1..];
        }
    }
    Ok(tokens)
}

/// Byte offset one past the closing quote of the JSON string starting at
/// byte 0 of `s`, honoring backslash escapes.
fn find_string_end(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Emission
// ---------------------------------------------------------------------------

/// Render fixups in the structured wire form.
#[must_use]
pub fn fixups_to_value(fixups: &[FixUp]) -> Value {
    Value::Array(
        fixups
            .iter()
            .map(|fix| Value::Array(vec![path_to_value(&fix.target), path_to_value(&fix.source)]))
            .collect(),
    )
}

fn path_to_value(path: &[PathToken]) -> Value {
    Value::Array(
        path.iter()
            .enumerate()
            .map(|(i, token)| Value::String(render_token(i, token)))
            .collect(),
    )
}

fn render_token(position: usize, token: &PathToken) -> String {
    match token {
        PathToken::Index(i) => format!("[{i}]"),
        // The root is printed bare; so are ordinary keys.  A key that could
        // be mistaken for an index chain gets the quoted bracket form.
        PathToken::Key(k) if position > 0 && k.starts_with('[') => {
            format!("[{}]", Value::String(k.clone()))
        }
        PathToken::Key(k) => k.clone(),
    }
}
