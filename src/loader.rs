//! Bulk loading documents into a sink
//!
//! A load is one `COPY ... FROM STDIN` session per namespace batch: every
//! document is transformed, encoded as a COPY line and streamed to the sink,
//! then the copy is finished and its outcome checked. Failures are surfaced,
//! never retried.

use crate::catalog::SchemaCatalog;
use crate::copy::{copy_command, encode_row, ROW_DELIMITER};
use crate::error::{Result, SmelterError};
use crate::sink::Sink;
use crate::transform::RowTransformer;
use crate::value::Document;
use std::borrow::Borrow;
use std::sync::Mutex;
use tracing::info;

/// Streams documents into a sink through the catalog's mappings
pub struct BulkLoader<'a> {
    catalog: &'a SchemaCatalog,
    transformer: RowTransformer<'a>,
}

impl<'a> BulkLoader<'a> {
    pub fn new(catalog: &'a SchemaCatalog) -> Self {
        BulkLoader {
            catalog,
            transformer: RowTransformer::new(catalog),
        }
    }

    /// Copy `docs` into the table mapped for `ns`.
    ///
    /// The sink is borrowed exclusively for the whole copy. If anything fails
    /// mid-stream the session is dropped, which aborts the copy. Returns the
    /// number of rows the sink accepted.
    pub fn copy_data<S, I, D>(&self, sink: &mut S, ns: &str, docs: I) -> Result<u64>
    where
        S: Sink + ?Sized,
        I: IntoIterator<Item = D>,
        D: Borrow<Document>,
    {
        self.try_copy_data(sink, ns, docs.into_iter().map(Ok))
    }

    /// Copy documents from a fallible source, such as a parser over a stream.
    ///
    /// Documents are pulled one at a time while the copy is open. The first
    /// `Err` from the source is returned as is, and the session is dropped,
    /// which aborts the copy.
    pub fn try_copy_data<S, I, D>(&self, sink: &mut S, ns: &str, docs: I) -> Result<u64>
    where
        S: Sink + ?Sized,
        I: IntoIterator<Item = Result<D>>,
        D: Borrow<Document>,
    {
        let schema = self.catalog.lookup_strict(ns)?;
        let table = schema.meta.table.as_str();
        let columns = schema.output_columns();

        let command = copy_command(table, &columns);
        let mut session = sink
            .begin_copy(&command)
            .map_err(|e| SmelterError::bulk_load(table, "COPY begin", e))?;

        for doc in docs {
            let doc = doc?;
            let row = self.transformer.transform(ns, doc.borrow(), Some(schema))?;
            let mut line = encode_row(&row);
            line.push(ROW_DELIMITER);
            session
                .write_line(&line)
                .map_err(|e| SmelterError::bulk_load(table, "COPY send", e))?;
        }

        session
            .end()
            .map_err(|e| SmelterError::bulk_load(table, "COPY end", e))?;
        let rows = session
            .check_result()
            .map_err(|e| SmelterError::bulk_load(table, "COPY result", e))?;

        info!(table, namespace = ns, rows, "Copied rows");
        Ok(rows)
    }

    /// Copy through a sink shared between threads.
    ///
    /// The lock is held for the whole copy, so concurrent loads on the same
    /// sink run one after another. The guard is released on every exit path.
    pub fn copy_data_shared<S, I, D>(&self, sink: &Mutex<S>, ns: &str, docs: I) -> Result<u64>
    where
        S: Sink,
        I: IntoIterator<Item = D>,
        D: Borrow<Document>,
    {
        let mut guard = sink.lock().map_err(|_| SmelterError::SinkPoisoned)?;
        self.copy_data(&mut *guard, ns, docs)
    }
}
