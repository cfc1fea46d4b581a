//! Row shape, ordering and encoding properties

use serde_json::json;
use smelter::path::resolve_dotted;
use smelter::value::document_from_json;
use smelter::{
    encode_batch, encode_row, quote_scalar, Document, RowTransformer, SchemaCatalog, Value,
};

fn doc(json: serde_json::Value) -> Document {
    match json {
        serde_json::Value::Object(obj) => document_from_json(obj),
        other => panic!("Expected object, got {}", other),
    }
}

fn catalog_with(columns: serde_json::Value, extra_props: bool) -> SchemaCatalog {
    SchemaCatalog::from_spec(&json!({
        "db": {"c": {"columns": columns, "meta": {"table": "t", "extra_props": extra_props}}}
    }))
    .unwrap()
}

#[test]
fn test_row_width_matches_schema() {
    let documents = vec![
        json!({}),
        json!({"a": 1, "b": {"c": 2}, "z": [1, 2]}),
        json!({"a": null, "b": "scalar"}),
        json!({"unrelated": {"deep": {"deeper": true}}}),
    ];
    let column_sets = vec![
        json!([]),
        json!([{"a": "INT"}]),
        json!([{"a": "INT"}, {"b.c": "INT"}, {"missing": "TEXT"}]),
    ];

    for columns in &column_sets {
        for extra_props in [false, true] {
            let catalog = catalog_with(columns.clone(), extra_props);
            let schema = catalog.lookup("db.c").unwrap();
            let transformer = RowTransformer::new(&catalog);
            for d in &documents {
                let row = transformer.transform("db.c", &doc(d.clone()), None).unwrap();
                assert_eq!(
                    row.len(),
                    schema.columns.len() + usize::from(extra_props),
                    "columns {} extra_props {} doc {}",
                    columns,
                    extra_props,
                    d
                );
                assert_eq!(row.len(), schema.output_columns().len());
            }
        }
    }
}

#[test]
fn test_reordering_columns_reorders_row() {
    let input = doc(json!({"x": 1, "y": "two", "n": {"z": false}}));

    let forward = catalog_with(json!([{"x": "INT"}, {"y": "TEXT"}, {"n.z": "BOOL"}]), false);
    let backward = catalog_with(json!([{"n.z": "BOOL"}, {"y": "TEXT"}, {"x": "INT"}]), false);

    let mut a = RowTransformer::new(&forward).transform("db.c", &input, None).unwrap();
    let b = RowTransformer::new(&backward).transform("db.c", &input, None).unwrap();
    a.reverse();
    assert_eq!(a, b);
}

#[test]
fn test_end_to_end_scenario() {
    let catalog = SchemaCatalog::from_spec(&json!({
        "db": {"t1": {
            "columns": [{"id": "integer"}, {"tags": "text"}],
            "meta": {"table": "t1", "extra_props": false}
        }}
    }))
    .unwrap();

    let input = doc(json!({"id": 7, "tags": "a,b", "ignored": "z"}));
    let row = RowTransformer::new(&catalog).transform("db.t1", &input, None).unwrap();
    assert_eq!(row, vec![Value::from(7i64), Value::from("a,b")]);
    assert_eq!(encode_row(&row), "7\ta,b");
}

#[test]
fn test_overflow_drops_binary() {
    let catalog = catalog_with(json!([{"id": "INT"}, {"name": "TEXT"}]), true);
    let mut input = doc(json!({"id": 1, "name": "x", "extra1": "y"}));
    input.insert("blob".to_string(), Value::Binary(vec![0xde, 0xad, 0xbe, 0xef]));

    let row = RowTransformer::new(&catalog).transform("db.c", &input, None).unwrap();
    assert_eq!(
        row,
        vec![Value::from(1i64), Value::from("x"), Value::from(r#"{"extra1":"y"}"#)]
    );
}

#[test]
fn test_dotted_path_resolution() {
    assert_eq!(
        resolve_dotted(&Value::from(json!({"a": {"b": 5}})), "a.b"),
        Some(&Value::from(5i64))
    );
    assert_eq!(resolve_dotted(&Value::from(json!({"a": 5})), "a.b"), None);
    assert_eq!(resolve_dotted(&Value::from(json!({})), "a.b"), None);
}

/// Split a COPY line into unescaped fields the way the server reads it
fn split_copy_fields(line: &str) -> Vec<String> {
    let mut fields = vec![String::new()];
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    fields.last_mut().unwrap().push(next);
                }
            }
            '\t' => fields.push(String::new()),
            '\n' | '\r' => panic!("unescaped line break in {:?}", line),
            _ => fields.last_mut().unwrap().push(c),
        }
    }
    fields
}

#[test]
fn test_adversarial_text_never_breaks_lines() {
    let nasty = vec![
        Value::from("line\nbreak"),
        Value::from("carriage\rreturn"),
        Value::from("tab\tinside"),
        Value::from("trailing backslash\\"),
        Value::from("\\N"),
        Value::Binary(vec![0x80, b'\n', 0xc3, 0x28, b'\t']),
        Value::from(json!({"nested": "with\nnewline"})),
    ];

    let line = encode_row(&nasty);
    let fields = split_copy_fields(&line);
    assert_eq!(fields.len(), nasty.len());
    assert_eq!(fields[0], "line\nbreak");
    assert_eq!(fields[3], "trailing backslash\\");
    assert_eq!(fields[5], "\u{FFFD}\n\u{FFFD}(\t");

    // A literal "\N" string must not read back as NULL
    assert_eq!(quote_scalar(&Value::from("\\N")), "\\\\N");
}

#[test]
fn test_batch_is_one_line_per_row() {
    let rows = vec![
        vec![Value::from("a\nb"), Value::Null],
        vec![Value::Bool(false), Value::from(3i64)],
        vec![Value::from(""), Value::from("z")],
    ];
    let batch = encode_batch(&rows);
    assert_eq!(batch, "a\\\nb\t\\N\nf\t3\n\tz");
}
