//! Tabular datasets loaded from delimited text files.
//!
//! A [`Dataset`] keeps the header row apart from the data rows. Fields are
//! plain strings addressed by position; [`Dataset::column`] maps a header
//! name to its position so callers are not tied to magic indices.

use anyhow::{Context, Result, bail, ensure};
use csv::ReaderBuilder;
use std::path::Path;
use tracing::{debug, info};

/// One record, fields in file order.
pub type Row = Vec<String>;

/// Header plus data rows of one delimited file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    /// Human readable label used in log events and error messages.
    pub label: String,
    pub header: Row,
    pub rows: Vec<Row>,
}

impl Dataset {
    pub fn new(label: impl Into<String>, header: Row, rows: Vec<Row>) -> Self {
        Self {
            label: label.into(),
            header,
            rows,
        }
    }

    /// Loads a comma separated file whose first record is the header.
    ///
    /// Records are read in flexible mode: a row with a missing or extra
    /// field is kept as-is, since such rows are removed later by position.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or is not valid CSV.
    #[tracing::instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load(label: &str, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("opening {label} dataset at {}", path.display()))?;

        let header: Row = rdr
            .headers()
            .with_context(|| format!("reading {label} header"))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for (index, result) in rdr.records().enumerate() {
            let record = result.with_context(|| format!("reading {label} row {index}"))?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        info!(
            dataset = label,
            rows = rows.len(),
            columns = header.len(),
            "Dataset loaded"
        );
        Ok(Self::new(label, header, rows))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of the header field called `name`.
    pub fn column(&self, name: &str) -> Result<usize> {
        self.header
            .iter()
            .position(|h| h == name)
            .with_context(|| format!("{} has no column named {name:?}", self.label))
    }

    /// Header name of the column at `index`, for diagnostics.
    pub fn column_name(&self, index: usize) -> &str {
        self.header.get(index).map(String::as_str).unwrap_or("?")
    }

    /// Field `index` of data row `row`, erroring on short rows.
    pub fn field(&self, row: usize, index: usize) -> Result<&str> {
        let Some(record) = self.rows.get(row) else {
            bail!("{} has no row {row}", self.label);
        };
        field_of(record, index).with_context(|| {
            format!(
                "{} row {row}: column {index} ({})",
                self.label,
                self.column_name(index)
            )
        })
    }

    /// Parses field `index` of data row `row` as a number.
    pub fn number(&self, row: usize, index: usize) -> Result<f64> {
        let raw = self.field(row, index)?;
        parse_number(raw).with_context(|| {
            format!(
                "{} row {row}: column {index} ({}) is not numeric",
                self.label,
                self.column_name(index)
            )
        })
    }

    /// Copy of this dataset holding only `rows`, header and label kept.
    pub fn with_rows(&self, rows: Vec<Row>) -> Self {
        Self::new(self.label.clone(), self.header.clone(), rows)
    }

    /// Drops the data row at `index`.
    ///
    /// # Errors
    ///
    /// Returns an error if `index` is past the end of the dataset.
    pub fn remove_row(mut self, index: usize) -> Result<Self> {
        ensure!(
            index < self.rows.len(),
            "{}: cannot remove row {index}, dataset has {} rows",
            self.label,
            self.rows.len()
        );
        let removed = self.rows.remove(index);
        debug!(dataset = %self.label, index, ?removed, "Removed defective row");
        Ok(self)
    }

    /// Rows in `[start, end)`, clamped to the dataset.
    pub fn slice(&self, start: usize, end: usize) -> &[Row] {
        let end = end.min(self.rows.len());
        let start = start.min(end);
        &self.rows[start..end]
    }

    /// Column count of the first data row, if any.
    pub fn column_count(&self) -> Option<usize> {
        self.rows.first().map(Vec::len)
    }

    /// Writes header and rows to a CSV file, replacing it.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(path.as_ref())?;
        writer.write_record(&self.header)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Field `index` of a single row.
pub fn field_of(row: &[String], index: usize) -> Result<&str> {
    match row.get(index) {
        Some(value) => Ok(value),
        None => bail!("row has only {} fields", row.len()),
    }
}

/// Parses a plain numeric field.
pub fn parse_number(raw: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .with_context(|| format!("invalid number {raw:?}"))
}
