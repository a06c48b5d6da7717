use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use log::info;

use crate::error::PredictorError;

/// A delimited table held as strings: one header row and data rows of the
/// same width. Used both for the reference dataset and for uploads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Creates a table from headers and rows
    ///
    /// # Errors
    /// - `InvalidValue` if a header repeats or a row has the wrong width
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, PredictorError> {
        for (i, header) in headers.iter().enumerate() {
            if headers[..i].contains(header) {
                return Err(PredictorError::InvalidValue {
                    field: header.clone(),
                    reason: "column appears more than once".into(),
                });
            }
        }
        if let Some(row) = rows.iter().position(|r| r.len() != headers.len()) {
            return Err(PredictorError::InvalidValue {
                field: format!("row {}", row),
                reason: format!("expected {} cells, found {}", headers.len(), rows[row].len()),
            });
        }
        Ok(Self { headers, rows })
    }

    /// Reads a table with a header row from any reader
    pub fn from_reader<R: Read>(reader: R, delimiter: u8) -> Result<Self, PredictorError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Self::new(headers, rows)
    }

    /// Reads a table from a delimited file
    pub fn from_path<P: AsRef<Path>>(path: P, delimiter: u8) -> Result<Self, PredictorError> {
        let path = path.as_ref();
        let table = Self::from_reader(File::open(path)?, delimiter)?;
        info!("Loaded {} rows x {} columns from {:?}", table.len(), table.width(), path);
        Ok(table)
    }

    /// Writes the table, header first
    pub fn write_to<W: Write>(&self, writer: W, delimiter: u8) -> Result<(), PredictorError> {
        let mut csv_writer = csv::WriterBuilder::new().delimiter(delimiter).from_writer(writer);
        csv_writer.write_record(&self.headers)?;
        for row in &self.rows {
            csv_writer.write_record(row)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.headers.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Iterates the cells of one column
    pub fn column<'a>(&'a self, name: &str) -> Option<impl Iterator<Item = &'a str> + 'a> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(move |r| r[index].as_str()))
    }

    /// True when every non-empty cell of the column parses as a number and
    /// at least one cell is non-empty
    pub fn is_numeric_column(&self, name: &str) -> bool {
        match self.column(name) {
            Some(cells) => {
                let mut any = false;
                for cell in cells.filter(|c| !c.is_empty()) {
                    if cell.parse::<f64>().is_err() {
                        return false;
                    }
                    any = true;
                }
                any
            }
            None => false,
        }
    }

    /// Appends a column. Fails if the name is taken or the length is wrong.
    pub fn push_column(&mut self, name: impl Into<String>, cells: Vec<String>) -> Result<(), PredictorError> {
        let name = name.into();
        if self.has_column(&name) {
            return Err(PredictorError::InvalidValue {
                field: name,
                reason: "column appears more than once".into(),
            });
        }
        if cells.len() != self.rows.len() {
            return Err(PredictorError::InvalidValue {
                field: name,
                reason: format!("expected {} cells, found {}", self.rows.len(), cells.len()),
            });
        }
        self.headers.push(name);
        for (row, cell) in self.rows.iter_mut().zip(cells) {
            row.push(cell);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "platform, likes ,caption\nTwitter,10,hello\nTikTok,,\"a, b\"\n";

    #[test]
    fn test_reads_and_trims() {
        let table = Table::from_reader(SAMPLE.as_bytes(), b',').unwrap();
        assert_eq!(table.headers(), &["platform", "likes", "caption"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[1], vec!["TikTok", "", "a, b"]);
    }

    #[test]
    fn test_numeric_column_detection() {
        let table = Table::from_reader(SAMPLE.as_bytes(), b',').unwrap();
        assert!(table.is_numeric_column("likes"));
        assert!(!table.is_numeric_column("platform"));
        assert!(!table.is_numeric_column("missing"));
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = Table::from_reader("a,b\n1\n".as_bytes(), b',').unwrap_err();
        assert!(matches!(err, PredictorError::Csv(_)));
    }

    #[test]
    fn test_duplicate_headers_rejected() {
        assert!(Table::new(vec!["a".into(), "a".into()], vec![]).is_err());
    }

    #[test]
    fn test_write_round_trip_with_new_column() {
        let mut table = Table::from_reader("a;b\n1;2\n".as_bytes(), b';').unwrap();
        table.push_column("Prediction", vec!["Viral".into()]).unwrap();
        let mut out = Vec::new();
        table.write_to(&mut out, b',').unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "a,b,Prediction\n1,2,Viral\n");
    }
}
