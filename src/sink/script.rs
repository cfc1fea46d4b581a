//! psql script output
//!
//! Writes the statements a live sink would execute, in a form `psql -f` can
//! replay: DDL terminated by `;`, and each copy as `COPY ...;` followed by the
//! data lines and the `\.` end-of-data marker. Copies run inside their own
//! transaction; a session dropped before `end` closes with `ROLLBACK`, so a
//! replay discards its partial rows.

use super::{create_table_sql, drop_table_sql, ColumnDef, CopySession, Sink};
use crate::error::Result;
use std::io::{self, Write};

/// End-of-data marker for inline COPY data
const END_OF_DATA: &str = "\\.";

/// A sink that writes a psql script
pub struct ScriptSink<W: Write> {
    writer: W,
}

impl<W: Write> ScriptSink<W> {
    pub fn new(writer: W) -> Self {
        ScriptSink { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

impl<W: Write> Sink for ScriptSink<W> {
    fn create_table_if_absent(
        &mut self,
        name: &str,
        columns: &[ColumnDef],
        primary_key: &[&str],
    ) -> Result<()> {
        writeln!(self.writer, "{};", create_table_sql(name, columns, primary_key, true))?;
        Ok(())
    }

    fn create_table_clobber(
        &mut self,
        name: &str,
        columns: &[ColumnDef],
        primary_key: &[&str],
    ) -> Result<()> {
        writeln!(self.writer, "{};", drop_table_sql(name))?;
        writeln!(self.writer, "{};", create_table_sql(name, columns, primary_key, false))?;
        Ok(())
    }

    fn begin_copy(&mut self, command: &str) -> Result<Box<dyn CopySession + '_>> {
        writeln!(self.writer, "BEGIN;")?;
        writeln!(self.writer, "{};", command)?;
        Ok(Box::new(ScriptCopy {
            writer: &mut self.writer,
            lines: 0,
            ended: false,
        }))
    }
}

struct ScriptCopy<'a, W: Write> {
    writer: &'a mut W,
    lines: u64,
    ended: bool,
}

impl<W: Write> CopySession for ScriptCopy<'_, W> {
    fn write_line(&mut self, line: &str) -> Result<()> {
        self.writer.write_all(line.as_bytes())?;
        self.lines += 1;
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        if !self.ended {
            writeln!(self.writer, "{}", END_OF_DATA)?;
            writeln!(self.writer, "COMMIT;")?;
            self.ended = true;
        }
        Ok(())
    }

    fn check_result(&mut self) -> Result<u64> {
        if !self.ended {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "copy result requested before end of data",
            )
            .into());
        }
        Ok(self.lines)
    }
}

impl<W: Write> Drop for ScriptCopy<'_, W> {
    fn drop(&mut self) {
        // Abort: end the data block so the script still parses, then undo it
        if !self.ended {
            let _ = writeln!(self.writer, "{}", END_OF_DATA);
            let _ = writeln!(self.writer, "ROLLBACK;");
        }
    }
}
