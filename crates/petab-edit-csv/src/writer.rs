//! PEtab table writer

use std::fs::File;
use std::io::Write;
use std::path::Path;

use petab_edit_core::TableStore;

use crate::error::CsvResult;
use crate::options::WriteOptions;

/// Writes a [`TableStore`] back to a PEtab table file
pub struct TableWriter;

impl TableWriter {
    /// Write a table to a file
    pub fn write_file<P: AsRef<Path>>(
        store: &TableStore,
        path: P,
        options: &WriteOptions,
    ) -> CsvResult<()> {
        let file = File::create(path)?;
        Self::write(store, file, options)
    }

    /// Write a table to a writer. Columns come out in schema order, the
    /// identifier column is rendered from the row keys, and the trailing
    /// placeholder row is never written.
    pub fn write<W: Write>(store: &TableStore, writer: W, options: &WriteOptions) -> CsvResult<()> {
        let mut csv_writer = csv::WriterBuilder::new()
            .delimiter(options.delimiter)
            .from_writer(writer);

        let columns: Vec<&str> = store.schema().column_names().collect();
        csv_writer.write_record(&columns)?;

        for row in store.rows() {
            let record: Vec<String> = columns
                .iter()
                .map(|column| store.get_value(row.key(), column).to_string())
                .collect();
            csv_writer.write_record(&record)?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}
