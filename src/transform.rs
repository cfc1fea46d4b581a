//! Document to row transformation
//!
//! Each declared column pulls one value out of the document: top-level
//! fields are removed from an owned copy, dotted paths are read in place.
//! Whatever is left over can be captured as JSON in `_extra_props`.

use crate::catalog::{CollectionSchema, SchemaCatalog};
use crate::error::Result;
use crate::path::resolve_in;
use crate::value::{Document, Value};
use tracing::trace;

/// One output row: a value per output column, in column order
pub type Row = Vec<Value>;

/// Result of extracting a document against a schema
#[derive(Debug, Clone, PartialEq)]
pub struct Transformed {
    pub row: Row,

    /// Top-level fields no column claimed
    pub leftover: Document,
}

/// Converts documents into rows using a schema catalog
pub struct RowTransformer<'a> {
    catalog: &'a SchemaCatalog,
}

impl<'a> RowTransformer<'a> {
    pub fn new(catalog: &'a SchemaCatalog) -> Self {
        RowTransformer { catalog }
    }

    /// Transform `doc` into a row for namespace `ns`.
    ///
    /// The caller's document is left untouched. When `schema` is `None` it is
    /// looked up strictly, so an unmapped namespace is the only failure.
    pub fn transform(
        &self,
        ns: &str,
        doc: &Document,
        schema: Option<&CollectionSchema>,
    ) -> Result<Row> {
        self.transform_owned(ns, doc.clone(), schema)
    }

    /// Like `transform`, but consumes the document instead of copying it
    pub fn transform_owned(
        &self,
        ns: &str,
        doc: Document,
        schema: Option<&CollectionSchema>,
    ) -> Result<Row> {
        let schema = match schema {
            Some(schema) => schema,
            None => self.catalog.lookup_strict(ns)?,
        };

        let row = finish_row(extract(doc, schema), schema);
        trace!(namespace = ns, ?row, "Transformed");
        Ok(row)
    }
}

/// Pull column values out of `doc` in declared order.
///
/// Values are coerced as they are extracted: binary payloads and identifiers
/// become text, everything else passes through unchanged. Missing fields
/// become `Null`.
pub fn extract(mut doc: Document, schema: &CollectionSchema) -> Transformed {
    let mut row = Vec::with_capacity(schema.row_width());

    for column in &schema.columns {
        let value = if column.path.is_nested() {
            resolve_in(&doc, &column.path).cloned().unwrap_or_default()
        } else {
            doc.shift_remove(&column.name).unwrap_or_default()
        };
        row.push(coerce(value));
    }

    Transformed { row, leftover: doc }
}

/// Append the overflow column when the schema captures extra properties.
fn finish_row(transformed: Transformed, schema: &CollectionSchema) -> Row {
    let Transformed { mut row, leftover } = transformed;
    if schema.meta.extra_props {
        row.push(Value::Text(overflow_json(leftover)));
    }
    row
}

/// Serialize leftover fields as JSON.
///
/// Top-level binary payloads are dropped rather than encoded.
pub fn overflow_json(mut leftover: Document) -> String {
    leftover.retain(|_, v| !matches!(v, Value::Binary(_)));
    // Serializing a Value tree cannot fail: all keys are strings
    serde_json::to_string(&leftover).unwrap_or_else(|_| String::from("{}"))
}

fn coerce(value: Value) -> Value {
    match value {
        Value::Binary(bytes) => match String::from_utf8(bytes) {
            Ok(text) => Value::Text(text),
            Err(e) => Value::Text(String::from_utf8_lossy(e.as_bytes()).into_owned()),
        },
        Value::Identifier(oid) => Value::Text(oid.to_hex()),
        Value::Null
        | Value::Bool(_)
        | Value::Number(_)
        | Value::Text(_)
        | Value::Document(_)
        | Value::Array(_) => value,
    }
}
