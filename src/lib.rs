//! # Smelter - documents into relational tables
//!
//! Schema-driven transformation of semi-structured documents (as produced by
//! a document store) into fixed-shape rows, and a serializer for the
//! PostgreSQL `COPY ... FROM STDIN` text format.
//!
//! ## Modules
//!
//! - **catalog**: ordered column mappings per `db.collection` namespace
//! - **path**: dotted field path resolution
//! - **transform**: one document into one row, with overflow capture
//! - **copy**: COPY text encoding
//! - **loader**: bulk copy sessions against a sink
//! - **sink**: PostgreSQL and psql script destinations
//!
//! ## Quick Start
//!
//! ```rust
//! use smelter::{encode_row, RowTransformer, SchemaCatalog};
//! use smelter::value::document_from_json;
//! use serde_json::json;
//!
//! # fn main() -> smelter::Result<()> {
//! let catalog = SchemaCatalog::from_spec(&json!({
//!     "app": {
//!         "t1": {
//!             "columns": [{"id": "integer"}, {"tags": "text"}],
//!             "meta": {"table": "t1", "extra_props": false}
//!         }
//!     }
//! }))?;
//!
//! let doc = document_from_json(
//!     json!({"id": 7, "tags": "a,b", "ignored": "z"}).as_object().unwrap().clone(),
//! );
//! let row = RowTransformer::new(&catalog).transform("app.t1", &doc, None)?;
//! assert_eq!(encode_row(&row), "7\ta,b");
//! # Ok(())
//! # }
//! ```

use std::io::BufRead;

pub mod catalog;
pub mod copy;
pub mod error;
pub mod loader;
pub mod path;
pub mod sink;
pub mod transform;
pub mod value;

// Re-export commonly used types for convenience
pub use catalog::{CollectionSchema, ColumnSpec, SchemaCatalog, TableMeta};
pub use copy::{encode_batch, encode_row, quote_scalar};
pub use error::{Result, SmelterError};
pub use loader::BulkLoader;
pub use path::{resolve, FieldPath};
pub use sink::{CopySession, PgSink, ScriptSink, Sink};
pub use transform::{Row, RowTransformer};
pub use value::{Document, ObjectId, Value};

/// Parse one line of (extended) JSON into a document
pub fn parse_document(line: &str) -> Result<Document> {
    match serde_json::from_str::<serde_json::Value>(line)? {
        serde_json::Value::Object(obj) => Ok(value::document_from_json(obj)),
        other => Err(SmelterError::InvalidDocument(format!(
            "expected a JSON object, got {}",
            other
        ))),
    }
}

/// Lazily parse newline-delimited JSON documents, skipping blank lines
pub fn read_documents<R: BufRead>(reader: R) -> impl Iterator<Item = Result<Document>> {
    reader.lines().filter_map(|line| match line {
        Ok(line) if line.trim().is_empty() => None,
        Ok(line) => Some(parse_document(&line)),
        Err(e) => Some(Err(e.into())),
    })
}

/// Main entry point: stream an NDJSON source into the table mapped for `ns`.
///
/// Lines are parsed while the copy is open, so memory stays flat however long
/// the input is. A malformed line aborts the copy.
pub fn load_ndjson<R: BufRead, S: Sink + ?Sized>(
    catalog: &SchemaCatalog,
    sink: &mut S,
    ns: &str,
    reader: R,
) -> Result<u64> {
    BulkLoader::new(catalog).try_copy_data(sink, ns, read_documents(reader))
}
