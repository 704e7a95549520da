//! Loading caller-supplied points from CSV
//!
//! Files carry a header row with `value` and `period` columns; periods
//! are ISO dates (`2024-03-01`).

use crate::error::Result;
use crate::model::InputPoint;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Data loader for input series
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load points from a CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Vec<InputPoint>> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// Load points from any CSV source
    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<InputPoint>> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut points = Vec::new();
        for record in csv_reader.deserialize() {
            let point: InputPoint = record?;
            points.push(point);
        }

        Ok(points)
    }
}
