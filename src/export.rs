//! CSV export of ledger rows

use crate::ledger::FinalRow;
use crate::LedgerError;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Write rows as CSV with a header line, blank cells for absent amounts
pub fn write_csv<W: Write>(rows: &[FinalRow], writer: W) -> Result<(), LedgerError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    if rows.is_empty() {
        csv_writer.write_record([
            "identifier_original",
            "identifier_clean",
            "description",
            "debit",
            "credit",
        ])?;
    }
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write rows to a CSV file, replacing it if present
pub fn write_csv_file<P: AsRef<Path>>(rows: &[FinalRow], path: P) -> Result<(), LedgerError> {
    let file = std::fs::File::create(path)?;
    write_csv(rows, std::io::BufWriter::new(file))
}

/// Default output path for a source statement: `Resultado_<stem>.csv` beside it
pub fn output_file_name<P: AsRef<Path>>(source: P) -> PathBuf {
    let source = source.as_ref();
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "statement".to_string());
    source.with_file_name(format!("Resultado_{}.csv", stem))
}
