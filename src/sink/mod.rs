//! Relational sinks
//!
//! A sink is the destination connection: it can create tables and accept a
//! bulk copy stream. Two implementations ship with the crate:
//!
//! - `PgSink` talks to a PostgreSQL server through the `postgres` client
//! - `ScriptSink` writes an equivalent psql script to any `Write`

pub mod postgres;
pub mod script;

pub use self::postgres::PgSink;
pub use self::script::ScriptSink;

use crate::copy::quote_ident;
use crate::error::Result;

/// A column in a `CREATE TABLE` statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub sql_type: String,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        ColumnDef {
            name: name.into(),
            sql_type: sql_type.into(),
        }
    }
}

/// Destination for tables and bulk-copied rows
pub trait Sink {
    /// Create a table unless one with the same name already exists
    fn create_table_if_absent(
        &mut self,
        name: &str,
        columns: &[ColumnDef],
        primary_key: &[&str],
    ) -> Result<()>;

    /// Drop the table if it exists, then create it
    fn create_table_clobber(
        &mut self,
        name: &str,
        columns: &[ColumnDef],
        primary_key: &[&str],
    ) -> Result<()>;

    /// Start a `COPY ... FROM STDIN` session.
    ///
    /// The session borrows the sink mutably, so nothing else can use the
    /// connection until it is dropped. Dropping a session before `end` must
    /// abort the copy and leave the connection usable.
    fn begin_copy(&mut self, command: &str) -> Result<Box<dyn CopySession + '_>>;
}

/// An open bulk copy
pub trait CopySession {
    /// Send one line of COPY text, including its terminator
    fn write_line(&mut self, line: &str) -> Result<()>;

    /// Signal end of data
    fn end(&mut self) -> Result<()>;

    /// Outcome of the copy: rows accepted by the sink
    fn check_result(&mut self) -> Result<u64>;
}

/// `CREATE TABLE` statement for the given columns and primary key
pub fn create_table_sql(
    name: &str,
    columns: &[ColumnDef],
    primary_key: &[&str],
    if_not_exists: bool,
) -> String {
    let mut defs: Vec<String> = columns
        .iter()
        .map(|c| format!("{} {}", quote_ident(&c.name), c.sql_type))
        .collect();

    if !primary_key.is_empty() {
        let pk: Vec<String> = primary_key.iter().map(|c| quote_ident(c)).collect();
        defs.push(format!("PRIMARY KEY ({})", pk.join(", ")));
    }

    format!(
        "CREATE TABLE {}{} ({})",
        if if_not_exists { "IF NOT EXISTS " } else { "" },
        quote_ident(name),
        defs.join(", ")
    )
}

/// `DROP TABLE IF EXISTS` statement
pub fn drop_table_sql(name: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", quote_ident(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_table_sql() {
        let columns = vec![ColumnDef::new("_id", "TEXT"), ColumnDef::new("count", "INTEGER")];
        assert_eq!(
            create_table_sql("stats", &columns, &["_id"], true),
            "CREATE TABLE IF NOT EXISTS \"stats\" (\"_id\" TEXT, \"count\" INTEGER, PRIMARY KEY (\"_id\"))"
        );
        assert_eq!(
            create_table_sql("stats", &columns, &[], false),
            "CREATE TABLE \"stats\" (\"_id\" TEXT, \"count\" INTEGER)"
        );
    }

    #[test]
    fn test_drop_table_sql() {
        assert_eq!(drop_table_sql("stats"), "DROP TABLE IF EXISTS \"stats\"");
    }
}
