//! PostgreSQL sink backed by the synchronous `postgres` client.

use super::{create_table_sql, drop_table_sql, ColumnDef, CopySession, Sink};
use crate::error::Result;
use postgres::{Client, CopyInWriter, NoTls};
use std::io::{self, Write};
use tracing::debug;

/// A sink writing to a live PostgreSQL connection
pub struct PgSink {
    client: Client,
}

impl PgSink {
    /// Connect using a libpq-style connection string, e.g.
    /// `host=localhost user=postgres dbname=app`.
    pub fn connect(dsn: &str) -> Result<Self> {
        let client = Client::connect(dsn, NoTls)?;
        Ok(PgSink { client })
    }
}

impl Sink for PgSink {
    fn create_table_if_absent(
        &mut self,
        name: &str,
        columns: &[ColumnDef],
        primary_key: &[&str],
    ) -> Result<()> {
        let sql = create_table_sql(name, columns, primary_key, true);
        debug!(sql = %sql, "Executing DDL");
        self.client.batch_execute(&sql)?;
        Ok(())
    }

    fn create_table_clobber(
        &mut self,
        name: &str,
        columns: &[ColumnDef],
        primary_key: &[&str],
    ) -> Result<()> {
        let sql = format!(
            "{}; {}",
            drop_table_sql(name),
            create_table_sql(name, columns, primary_key, false)
        );
        debug!(sql = %sql, "Executing DDL");
        self.client.batch_execute(&sql)?;
        Ok(())
    }

    fn begin_copy(&mut self, command: &str) -> Result<Box<dyn CopySession + '_>> {
        let writer = self.client.copy_in(command)?;
        Ok(Box::new(PgCopy {
            writer: Some(writer),
            outcome: None,
        }))
    }
}

/// An in-progress `COPY FROM STDIN`.
///
/// Dropping the writer without finishing it aborts the copy on the server.
struct PgCopy<'a> {
    writer: Option<CopyInWriter<'a>>,
    outcome: Option<std::result::Result<u64, postgres::Error>>,
}

impl CopySession for PgCopy<'_> {
    fn write_line(&mut self, line: &str) -> Result<()> {
        let writer = self.writer.as_mut().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "copy data written after end of data")
        })?;
        writer.write_all(line.as_bytes())?;
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.take() {
            self.outcome = Some(writer.finish());
        }
        Ok(())
    }

    fn check_result(&mut self) -> Result<u64> {
        match self.outcome.take() {
            Some(Ok(rows)) => Ok(rows),
            Some(Err(e)) => Err(e.into()),
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "copy result requested before end of data",
            )
            .into()),
        }
    }
}
