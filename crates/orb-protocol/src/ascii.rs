// SPDX-License-Identifier: MIT OR Apache-2.0
//! ASCII-clean JSON output.
//!
//! Every code point outside `0x20..=0x7E` is written as a `\uXXXX` escape
//! (surrogate pairs for astral planes), which keeps payloads intact across
//! transports that mangle encodings.

use serde_json::Value;
use std::fmt::Write as _;

/// Render a JSON tree as an ASCII-only string.
#[must_use]
pub fn to_ascii_json(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(n) => {
            let _ = write!(out, "{n}");
        }
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::Object(entries) => {
            out.push('{');
            for (i, (key, item)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(out, key);
                out.push(':');
                write_value(out, item);
            }
            out.push('}');
        }
    }
}

fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            ' '..='~' => out.push(c),
            _ => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    let _ = write!(out, "\\u{unit:04x}");
                }
            }
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalars() {
        assert_eq!(to_ascii_json(&json!(null)), "null");
        assert_eq!(to_ascii_json(&json!(true)), "true");
        assert_eq!(to_ascii_json(&json!(42)), "42");
        assert_eq!(to_ascii_json(&json!(-1.5)), "-1.5");
    }

    #[test]
    fn plain_ascii_strings_pass_through() {
        assert_eq!(to_ascii_json(&json!("hello")), r#""hello""#);
    }

    #[test]
    fn quotes_and_backslashes_escaped() {
        assert_eq!(to_ascii_json(&json!("a\"b\\c")), r#""a\"b\\c""#);
    }

    #[test]
    fn control_characters_use_short_escapes() {
        assert_eq!(to_ascii_json(&json!("a\nb\tc")), r#""a\nb\tc""#);
        assert_eq!(to_ascii_json(&json!("\u{1}")), r#""\u0001""#);
    }

    #[test]
    fn non_ascii_escaped_as_utf16() {
        assert_eq!(to_ascii_json(&json!("h\u{e9}llo")), r#""h\u00e9llo""#);
        assert_eq!(to_ascii_json(&json!("\u{65e5}")), r#""\u65e5""#);
    }

    #[test]
    fn astral_code_points_use_surrogate_pairs() {
        assert_eq!(to_ascii_json(&json!("\u{1d11e}")), r#""\ud834\udd1e""#);
    }

    #[test]
    fn nested_structures() {
        let tree = json!({"id": 1, "result": ["\u{e9}", {"k": null}]});
        let rendered = to_ascii_json(&tree);
        assert_eq!(rendered, r#"{"id":1,"result":["\u00e9",{"k":null}]}"#);
        assert!(rendered.is_ascii());
        // Still valid JSON with the same meaning.
        let back: Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(back, tree);
    }
}
