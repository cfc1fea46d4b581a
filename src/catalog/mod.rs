//! Schema catalog: which collections map to which tables
//!
//! The catalog is built once from a nested mapping document
//!
//! ```yaml
//! blog:
//!   posts:
//!     columns:
//!       - _id: TEXT
//!       - author.name: TEXT
//!       - title: TEXT
//!     meta:
//!       table: blog_posts
//!       extra_props: true
//! ```
//!
//! and is read-only afterwards. Column order is preserved exactly as
//! declared; it fixes both the generated table layout and the row layout.

mod config;

use crate::error::{Result, SmelterError};
use crate::path::{FieldPath, PATH_SEPARATOR};
use crate::sink::{ColumnDef, Sink};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

/// Name of the implicit overflow column
pub const EXTRA_PROPS_COLUMN: &str = "_extra_props";

/// SQL type of the overflow column
pub const EXTRA_PROPS_TYPE: &str = "TEXT";

/// Every generated table is keyed on this column
pub const PRIMARY_KEY_COLUMN: &str = "_id";

/// One declared column: where the value comes from and what it becomes
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    /// Field reference as declared; also the column name
    pub name: String,
    pub path: FieldPath,
    pub sql_type: String,
}

/// Destination table metadata
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TableMeta {
    pub table: String,

    /// Capture fields not covered by `columns` in `_extra_props`
    #[serde(default)]
    pub extra_props: bool,
}

/// Column mapping for one source collection
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSchema {
    pub columns: Vec<ColumnSpec>,
    pub meta: TableMeta,
}

impl CollectionSchema {
    /// Column names in row order, including `_extra_props` when enabled
    pub fn output_columns(&self) -> Vec<&str> {
        let mut cols: Vec<&str> = self.columns.iter().map(|c| c.name.as_str()).collect();
        if self.meta.extra_props {
            cols.push(EXTRA_PROPS_COLUMN);
        }
        cols
    }

    /// Number of values in every row produced under this schema
    pub fn row_width(&self) -> usize {
        self.columns.len() + usize::from(self.meta.extra_props)
    }

    /// Table column definitions in output order
    pub fn column_defs(&self) -> Vec<ColumnDef> {
        let mut defs: Vec<ColumnDef> = self
            .columns
            .iter()
            .map(|c| ColumnDef::new(&c.name, &c.sql_type))
            .collect();
        if self.meta.extra_props {
            defs.push(ColumnDef::new(EXTRA_PROPS_COLUMN, EXTRA_PROPS_TYPE));
        }
        defs
    }
}

/// Immutable mapping from source database and collection to schema
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    map: BTreeMap<String, BTreeMap<String, CollectionSchema>>,
}

impl SchemaCatalog {
    /// Build a catalog from a parsed mapping document.
    ///
    /// Fails without producing a partial catalog if any collection is
    /// malformed.
    pub fn from_spec(spec: &JsonValue) -> Result<Self> {
        let dbs = spec.as_object().ok_or_else(|| {
            SmelterError::schema_parse("top level must map source databases to collections")
        })?;

        let mut map = BTreeMap::new();
        for (db_name, db) in dbs {
            let collections = db.as_object().ok_or_else(|| {
                SmelterError::schema_parse(format!(
                    "database '{}' must map collection names to specs",
                    db_name
                ))
            })?;

            let mut parsed = BTreeMap::new();
            for (collection, spec) in collections {
                let ns = format!("{}.{}", db_name, collection);
                parsed.insert(collection.clone(), parse_collection(&ns, spec)?);
            }
            map.insert(db_name.clone(), parsed);
        }

        Ok(SchemaCatalog { map })
    }

    /// Find the schema for a `db.collection` namespace
    pub fn lookup(&self, ns: &str) -> Option<&CollectionSchema> {
        let schema = ns
            .split_once(PATH_SEPARATOR)
            .and_then(|(db, collection)| self.map.get(db)?.get(collection));

        if schema.is_none() {
            debug!(namespace = ns, "No mapping for namespace");
        }
        schema
    }

    /// Like `lookup`, but an unmapped namespace is an error
    pub fn lookup_strict(&self, ns: &str) -> Result<&CollectionSchema> {
        self.lookup(ns)
            .ok_or_else(|| SmelterError::SchemaNotFound(ns.to_string()))
    }

    /// Destination table for a namespace
    pub fn table_name(&self, ns: &str) -> Result<&str> {
        Ok(&self.lookup_strict(ns)?.meta.table)
    }

    /// Column names in row order, including `_extra_props` when enabled
    pub fn output_columns<'a>(&self, schema: &'a CollectionSchema) -> Vec<&'a str> {
        schema.output_columns()
    }

    /// Source databases with at least one mapped collection entry
    pub fn source_dbs(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }

    /// Mapped collections of a source database; empty for unknown databases
    pub fn collections<'a>(&'a self, db: &str) -> impl Iterator<Item = &'a str> {
        self.map
            .get(db)
            .into_iter()
            .flat_map(|collections| collections.keys().map(String::as_str))
    }

    /// All `(namespace, schema)` pairs in catalog order
    pub fn schemas(&self) -> impl Iterator<Item = (String, &CollectionSchema)> {
        self.map.iter().flat_map(|(db, collections)| {
            collections
                .iter()
                .map(move |(name, schema)| (format!("{}.{}", db, name), schema))
        })
    }

    /// Create one table per mapped collection.
    ///
    /// With `clobber` existing tables are dropped and recreated; without it
    /// tables that already exist are left untouched.
    pub fn generate_ddl<S: Sink + ?Sized>(&self, sink: &mut S, clobber: bool) -> Result<()> {
        for (ns, schema) in self.schemas() {
            info!(table = %schema.meta.table, namespace = %ns, clobber, "Creating table");
            let columns = schema.column_defs();
            let primary_key = [PRIMARY_KEY_COLUMN];
            if clobber {
                sink.create_table_clobber(&schema.meta.table, &columns, &primary_key)?;
            } else {
                sink.create_table_if_absent(&schema.meta.table, &columns, &primary_key)?;
            }
        }
        Ok(())
    }
}

fn parse_collection(ns: &str, spec: &JsonValue) -> Result<CollectionSchema> {
    let entries = spec
        .get("columns")
        .and_then(JsonValue::as_array)
        .ok_or_else(|| SmelterError::schema_parse(format!("{}: missing 'columns' list", ns)))?;

    let meta = spec
        .get("meta")
        .ok_or_else(|| SmelterError::schema_parse(format!("{}: missing 'meta'", ns)))?;
    let meta: TableMeta = serde_json::from_value(meta.clone())
        .map_err(|e| SmelterError::schema_parse(format!("{}: invalid meta: {}", ns, e)))?;

    // The overflow column counts as declared when enabled
    let mut seen = HashSet::new();
    if meta.extra_props {
        seen.insert(EXTRA_PROPS_COLUMN.to_string());
    }
    let mut columns = Vec::with_capacity(entries.len());
    for entry in entries {
        let column = parse_column(ns, entry)?;
        if !seen.insert(column.name.clone()) {
            return Err(SmelterError::schema_parse(format!(
                "{}: duplicate column '{}'",
                ns, column.name
            )));
        }
        columns.push(column);
    }

    Ok(CollectionSchema { columns, meta })
}

/// A column entry must be a single-key mapping `{field: type}`
fn parse_column(ns: &str, entry: &JsonValue) -> Result<ColumnSpec> {
    let invalid = || SmelterError::schema_parse(format!("{}: invalid column entry {}", ns, entry));

    let obj = entry.as_object().filter(|o| o.len() == 1).ok_or_else(invalid)?;
    let (field, sql_type) = obj.iter().next().ok_or_else(invalid)?;
    let sql_type = sql_type.as_str().ok_or_else(invalid)?;

    if field.split(PATH_SEPARATOR).any(str::is_empty) {
        return Err(SmelterError::schema_parse(format!(
            "{}: empty segment in field path '{}'",
            ns, field
        )));
    }

    Ok(ColumnSpec {
        name: field.clone(),
        path: FieldPath::parse(field),
        sql_type: sql_type.to_string(),
    })
}
