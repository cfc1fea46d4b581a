//! Text encoding for PostgreSQL `COPY ... FROM STDIN`
//!
//! Rows are tab-separated, one per line. `\N` is NULL, `t`/`f` are booleans,
//! and backslash, tab, newline and carriage return inside values are escaped
//! with a leading backslash. This is a wire contract with the server's COPY
//! reader and has to be reproduced byte for byte.

use crate::transform::Row;
use crate::value::Value;
use std::borrow::Cow;

/// Field separator within a row
pub const FIELD_DELIMITER: char = '\t';

/// Row terminator
pub const ROW_DELIMITER: char = '\n';

/// NULL marker
pub const NULL_MARKER: &str = "\\N";

/// Encode one value as a COPY text field.
pub fn quote_scalar(value: &Value) -> Cow<'_, str> {
    match value {
        Value::Null => Cow::Borrowed(NULL_MARKER),
        Value::Bool(true) => Cow::Borrowed("t"),
        Value::Bool(false) => Cow::Borrowed("f"),
        Value::Number(n) => Cow::Owned(n.to_string()),
        Value::Text(s) => escape_copy_text(s),
        Value::Binary(bytes) => {
            // Invalid sequences become U+FFFD before escaping
            let text = String::from_utf8_lossy(bytes);
            Cow::Owned(escape_copy_text(&text).into_owned())
        }
        Value::Identifier(oid) => Cow::Owned(oid.to_hex()),
        Value::Document(_) | Value::Array(_) => {
            // Serializing a Value tree cannot fail: all keys are strings
            let json = serde_json::to_string(value).unwrap_or_default();
            Cow::Owned(escape_copy_text(&json).into_owned())
        }
    }
}

/// Escape backslash, tab, newline and carriage return.
pub fn escape_copy_text(s: &str) -> Cow<'_, str> {
    if !s.contains(['\\', '\t', '\n', '\r']) {
        return Cow::Borrowed(s);
    }

    let mut result = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '\\' | '\t' | '\n' | '\r' => {
                result.push('\\');
                result.push(c);
            }
            _ => result.push(c),
        }
    }
    Cow::Owned(result)
}

/// Encode a row as one COPY line, without the terminator.
pub fn encode_row(row: &[Value]) -> String {
    let mut line = String::with_capacity(row.len() * 16);
    for (i, value) in row.iter().enumerate() {
        if i > 0 {
            line.push(FIELD_DELIMITER);
        }
        line.push_str(&quote_scalar(value));
    }
    line
}

/// Encode rows as newline-separated COPY lines.
pub fn encode_batch(rows: &[Row]) -> String {
    let lines: Vec<String> = rows.iter().map(|row| encode_row(row)).collect();
    lines.join(&ROW_DELIMITER.to_string())
}

/// Quote a PostgreSQL identifier, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Build the `COPY ... FROM STDIN` command for a table and column list.
pub fn copy_command(table: &str, columns: &[&str]) -> String {
    let col_list: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
    format!(
        "COPY {} ({}) FROM STDIN",
        quote_ident(table),
        col_list.join(",")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ObjectId;
    use serde_json::json;

    /// Inverse of the escaping rule as applied by the COPY reader
    fn unescape(s: &str) -> String {
        let mut out = String::new();
        let mut chars = s.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            } else {
                out.push(c);
            }
        }
        out
    }

    #[test]
    fn test_null_and_bool_literals() {
        assert_eq!(quote_scalar(&Value::Null), "\\N");
        assert_eq!(quote_scalar(&Value::Bool(true)), "t");
        assert_eq!(quote_scalar(&Value::Bool(false)), "f");
    }

    #[test]
    fn test_escapes_special_characters() {
        let value = Value::from("a\\b\tc\nd\re");
        assert_eq!(quote_scalar(&value), "a\\\\b\\\tc\\\nd\\\re");
    }

    #[test]
    fn test_escaping_round_trip() {
        for original in ["plain", "back\\slash", "tab\there", "multi\nline\r\n", "\\\\\t"] {
            let value = Value::from(original);
            let quoted = quote_scalar(&value);
            assert_eq!(unescape(&quoted), original);
        }
    }

    #[test]
    fn test_plain_text_is_borrowed() {
        let value = Value::from("nothing to escape");
        assert!(matches!(quote_scalar(&value), Cow::Borrowed(_)));
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let value = Value::Binary(vec![b'o', b'k', 0xff, 0xfe, b'\n']);
        assert_eq!(quote_scalar(&value), "ok\u{FFFD}\u{FFFD}\\\n");
    }

    #[test]
    fn test_numbers_identifiers_and_structures() {
        assert_eq!(quote_scalar(&Value::from(7i64)), "7");
        assert_eq!(quote_scalar(&Value::from(2.5f64)), "2.5");

        let oid = ObjectId::parse_hex("507f1f77bcf86cd799439011").unwrap();
        assert_eq!(quote_scalar(&Value::from(oid)), "507f1f77bcf86cd799439011");

        let nested = Value::from(json!({"note": "a\tb"}));
        assert_eq!(quote_scalar(&nested), "{\"note\":\"a\\\\tb\"}");
    }

    #[test]
    fn test_encode_row_and_batch() {
        let row = vec![Value::from(7i64), Value::from("a,b")];
        assert_eq!(encode_row(&row), "7\ta,b");

        let rows = vec![
            vec![Value::from(1i64), Value::Null],
            vec![Value::from(2i64), Value::Bool(true)],
        ];
        assert_eq!(encode_batch(&rows), "1\t\\N\n2\tt");
        assert_eq!(encode_batch(&[]), "");
    }

    #[test]
    fn test_copy_command() {
        assert_eq!(
            copy_command("blog_posts", &["_id", "author.name", "_extra_props"]),
            "COPY \"blog_posts\" (\"_id\",\"author.name\",\"_extra_props\") FROM STDIN"
        );
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
