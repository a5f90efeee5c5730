//! CSV import of part lists.
//!
//! The expected header is `Label,Length (ft),Width (ft),Quantity`. The
//! shorter names `Length`, `Width` and `Qty` are accepted as well. Cells are
//! trimmed; dimensions are read as given and converted later by the unit
//! factor of the run.

use std::io;

use serde::Deserialize;
use thiserror::Error;

use crate::model::PartSpec;

/// Reading a part list failed.
#[derive(Debug, Error)]
pub enum PartsCsvError {
    #[error("Invalid CSV: {0}")]
    Csv(#[from] csv::Error),
}

impl PartsCsvError {
    /// 1-based line of the offending record, when known.
    pub fn line(&self) -> Option<u64> {
        match self {
            PartsCsvError::Csv(err) => err.position().map(csv::Position::line),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PartRecord {
    #[serde(rename = "Label")]
    label: String,
    #[serde(rename = "Length (ft)", alias = "Length")]
    length: f64,
    #[serde(rename = "Width (ft)", alias = "Width")]
    width: f64,
    #[serde(rename = "Quantity", alias = "Qty")]
    quantity: u32,
}

impl From<PartRecord> for PartSpec {
    fn from(record: PartRecord) -> Self {
        PartSpec::new(record.label, record.length, record.width, record.quantity)
    }
}

/// Reads part specifications from CSV with a header row.
///
/// Rows are returned in file order. Dimension and quantity checks are left to
/// the normalizer, which reports them with the row's index.
pub fn read_parts_csv(reader: impl io::Read) -> Result<Vec<PartSpec>, PartsCsvError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    rdr.deserialize::<PartRecord>()
        .map(|record| record.map(PartSpec::from).map_err(PartsCsvError::from))
        .collect()
}

/// [`read_parts_csv`] on an in-memory string.
pub fn parse_parts_csv(text: &str) -> Result<Vec<PartSpec>, PartsCsvError> {
    read_parts_csv(text.as_bytes())
}
