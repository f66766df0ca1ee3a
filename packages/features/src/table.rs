//! Raw string tables loaded from accident CSV files.

use std::io::Read;
use std::path::Path;

use crate::EncodeError;

/// Values treated as missing, compared case-insensitively after trimming.
const NULL_MARKERS: &[&str] = &["", "nan", "-nan", "null", "none", "na", "n/a", "#n/a", "<na>"];

/// Whether a raw cell is a missing value.
#[must_use]
pub fn is_null(value: &str) -> bool {
    let value = value.trim();
    NULL_MARKERS.iter().any(|m| value.eq_ignore_ascii_case(m))
}

/// Column-oriented access to a CSV file whose cells are kept as strings.
///
/// Column types are inferred later by [`crate::one_hot`]; the table itself
/// only knows headers and rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Builds a table from headers and rows.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::Data`] if any row's width differs from the
    /// header width.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, EncodeError> {
        if let Some((i, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != headers.len())
        {
            return Err(EncodeError::Data {
                message: format!(
                    "row {i} has {} fields, expected {}",
                    row.len(),
                    headers.len()
                ),
            });
        }
        Ok(Self { headers, rows })
    }

    /// Reads a headed CSV file.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] if the file cannot be opened or is not valid
    /// CSV.
    pub fn from_path(path: &Path) -> Result<Self, EncodeError> {
        let file = std::fs::File::open(path)?;
        let table = Self::from_reader(file)?;
        log::debug!(
            "Loaded {} rows x {} columns from {}",
            table.len(),
            table.headers.len(),
            path.display()
        );
        Ok(table)
    }

    /// Reads headed CSV from any reader.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::Csv`] if the input is not valid CSV.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, EncodeError> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

        let headers: Vec<String> = rdr.headers()?.iter().map(String::from).collect();
        let mut rows = Vec::new();
        for record in rdr.records() {
            rows.push(record?.iter().map(String::from).collect());
        }

        Ok(Self { headers, rows })
    }

    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by exact header name.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Position of a column, or [`EncodeError::MissingColumn`].
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::MissingColumn`] if no header matches `name`.
    pub fn require_column(&self, name: &str) -> Result<usize, EncodeError> {
        self.column_index(name)
            .ok_or_else(|| EncodeError::MissingColumn {
                column: name.to_string(),
            })
    }

    /// All values of one column, top to bottom.
    pub fn column(&self, index: usize) -> impl Iterator<Item = &str> + Clone {
        self.rows.iter().map(move |row| row[index].as_str())
    }

    /// Removes every row that has a missing value in any column and returns
    /// how many were removed.
    pub fn drop_incomplete_rows(&mut self) -> usize {
        let before = self.rows.len();
        self.rows.retain(|row| !row.iter().any(|v| is_null(v)));
        before - self.rows.len()
    }

    /// Removes a column, returning its values.
    pub fn remove_column(&mut self, index: usize) -> (String, Vec<String>) {
        let name = self.headers.remove(index);
        let values = self.rows.iter_mut().map(|row| row.remove(index)).collect();
        (name, values)
    }

    /// Appends a column.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::Data`] if `values` does not have one entry per
    /// row.
    pub fn push_column(&mut self, name: &str, values: Vec<String>) -> Result<(), EncodeError> {
        if values.len() != self.rows.len() {
            return Err(EncodeError::Data {
                message: format!(
                    "column {name} has {} values for {} rows",
                    values.len(),
                    self.rows.len()
                ),
            });
        }
        self.headers.push(name.to_string());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
        Ok(())
    }
}
