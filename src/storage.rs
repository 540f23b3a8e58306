use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::model::error::EtlError;
use crate::model::table::Table;

/// Result of writing one table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WriteOutcome {
    Written(usize),
    Skipped,
}

/// One directory of named CSV tables.
pub struct CsvStore {
    dir: PathBuf,
}

impl CsvStore {

    pub fn new(dir: impl Into<PathBuf>) -> Self {
        CsvStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn exists(&self) -> bool {
        self.dir.is_dir()
    }

    pub fn ensure_dir(&self) -> Result<(), EtlError> {
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    pub fn table_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", name))
    }

    /// Reads one table. A missing file is an empty table; an unreadable or
    /// malformed file is an error.
    pub fn read_table(&self, name: &str) -> Result<Table, EtlError> {
        let path = self.table_path(name);
        if !path.exists() {
            return Ok(Table::empty());
        }

        let file = File::open(&path)?;
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(file);

        let headers = reader.headers()?.iter().map(str::to_string).collect();
        let mut table = Table::new(headers);
        for record in reader.records() {
            let record = record?;
            table.push_row(record.iter().map(cell_value).collect());
        }
        Ok(table)
    }

    /// Writes one table, or writes nothing at all when it has no rows;
    /// a header-only file must never appear downstream.
    pub fn write_table(&self, name: &str, table: &Table) -> Result<WriteOutcome, EtlError> {
        if table.is_empty() {
            return Ok(WriteOutcome::Skipped);
        }

        let mut writer = csv::Writer::from_path(self.table_path(name))?;
        writer.write_record(table.columns())?;
        for row in table.rows() {
            writer.write_record(row.iter().map(|value| value.as_deref().unwrap_or("")))?;
        }
        writer.flush()?;
        Ok(WriteOutcome::Written(table.len()))
    }
}

fn cell_value(cell: &str) -> Option<String> {
    if cell.is_empty() {
        None
    } else {
        Some(cell.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_reads_as_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvStore::new(dir.path());

        let table = store.read_table("nothing_here").unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn empty_table_is_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvStore::new(dir.path());

        let outcome = store.write_table("out", &Table::empty()).unwrap();
        assert_eq!(outcome, WriteOutcome::Skipped);
        assert!(!store.table_path("out").exists());
    }

    #[test]
    fn null_cells_round_trip_as_empty_fields() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvStore::new(dir.path());

        let mut table = Table::new(vec!["a".to_string(), "b".to_string()]);
        table.push_row(vec![Some("1".to_string()), None]);
        assert_eq!(store.write_table("t", &table).unwrap(), WriteOutcome::Written(1));

        let read = store.read_table("t").unwrap();
        assert_eq!(read.value(0, "a"), Some("1"));
        assert_eq!(read.value(0, "b"), None);
    }

    #[test]
    fn ragged_rows_are_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad.csv"), "a,b\n1\n").unwrap();

        let store = CsvStore::new(dir.path());
        assert!(store.read_table("bad").is_err());
    }

    #[test]
    fn header_only_file_counts_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("hdr.csv"), "a,b\n").unwrap();

        let store = CsvStore::new(dir.path());
        let table = store.read_table("hdr").unwrap();
        assert!(table.is_empty());
        assert!(table.has_column("a"));
    }
}
