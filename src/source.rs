//! Record sources: one hand-entered record or the rows of an uploaded table

use polars::prelude::DataFrame;

use crate::data::{column_cells, Cell};
use crate::error::Error;
use crate::model::{CustomerAttributes, CustomerRecord, INPUT_COLUMNS};

/// Wraps exactly one validated record.
#[derive(Debug, Clone)]
pub struct SingleRecordSource {
    record: CustomerRecord,
}

impl SingleRecordSource {
    /// Validate form input; fails with a validation error naming the offending field.
    pub fn new(attributes: CustomerAttributes) -> crate::Result<Self> {
        Ok(Self {
            record: CustomerRecord::try_from(attributes)?,
        })
    }

    pub fn record(&self) -> &CustomerRecord {
        &self.record
    }
}

/// Rows of an uploaded table, parsed and checked up front so a bad file is rejected before any
/// record is scored.
#[derive(Debug, Clone)]
pub struct TabularRecordSource {
    records: Vec<CustomerRecord>,
}

impl TabularRecordSource {
    /// Parse every row of `df`. Extra columns are ignored.
    pub fn from_frame(df: &DataFrame) -> crate::Result<Self> {
        let mut columns = Vec::with_capacity(INPUT_COLUMNS.len());
        let mut missing = Vec::new();
        for name in INPUT_COLUMNS {
            match column_cells(df, name)? {
                Some(cells) => columns.push(cells),
                None => missing.push(name),
            }
        }

        if !missing.is_empty() {
            return Err(Error::Format(format!(
                "missing required column(s): {}",
                missing.join(", ")
            )));
        }

        let records = (0..df.height())
            .map(|idx| parse_row(&columns, idx))
            .collect::<crate::Result<Vec<_>>>()?;

        tracing::debug!(rows = records.len(), "parsed uploaded records");
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Ordered, one-shot sequence of records to score
#[derive(Debug, Clone)]
pub enum RecordSource {
    Single(SingleRecordSource),
    Tabular(TabularRecordSource),
}

impl RecordSource {
    pub fn len(&self) -> usize {
        match self {
            RecordSource::Single(_) => 1,
            RecordSource::Tabular(source) => source.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<SingleRecordSource> for RecordSource {
    fn from(source: SingleRecordSource) -> Self {
        RecordSource::Single(source)
    }
}

impl From<TabularRecordSource> for RecordSource {
    fn from(source: TabularRecordSource) -> Self {
        RecordSource::Tabular(source)
    }
}

impl IntoIterator for RecordSource {
    type Item = CustomerRecord;
    type IntoIter = std::vec::IntoIter<CustomerRecord>;

    fn into_iter(self) -> Self::IntoIter {
        match self {
            RecordSource::Single(source) => vec![source.record].into_iter(),
            RecordSource::Tabular(source) => source.records.into_iter(),
        }
    }
}

/// Spreadsheet row number of a data row: headers occupy row 1.
pub fn sheet_row(idx: usize) -> usize {
    idx + 2
}

fn parse_row(columns: &[Vec<Cell>], idx: usize) -> crate::Result<CustomerRecord> {
    let cells: Vec<&Cell> = columns.iter().map(|column| &column[idx]).collect();
    let row = sheet_row(idx);

    let attributes = CustomerAttributes {
        total_spent: number(cells[0], row, INPUT_COLUMNS[0])?,
        avg_order_value: number(cells[1], row, INPUT_COLUMNS[1])?,
        avg_purchase_frequency: number(cells[2], row, INPUT_COLUMNS[2])?,
        days_since_last_purchase: whole_number(cells[3], row, INPUT_COLUMNS[3])?,
        discount_behavior: number(cells[4], row, INPUT_COLUMNS[4])?,
        loyalty_program_member: flag(cells[5], row, INPUT_COLUMNS[5])?,
        days_in_advance: whole_number(cells[6], row, INPUT_COLUMNS[6])?,
        flight_type: text(cells[7], row, INPUT_COLUMNS[7])?
            .parse()
            .map_err(|e| cell_error(row, INPUT_COLUMNS[7], e))?,
        cabin_class: text(cells[8], row, INPUT_COLUMNS[8])?
            .parse()
            .map_err(|e| cell_error(row, INPUT_COLUMNS[8], e))?,
    };

    CustomerRecord::try_from(attributes).map_err(|e| match e {
        Error::Validation { field, reason } => cell_error(row, field, reason),
        other => other,
    })
}

fn cell_error(row: usize, column: &str, reason: impl std::fmt::Display) -> Error {
    Error::Format(format!("row {row}, column '{column}': {reason}"))
}

pub(crate) fn number(cell: &Cell, row: usize, column: &str) -> crate::Result<f64> {
    match cell {
        Cell::Number(n) => Ok(*n),
        Cell::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| cell_error(row, column, format!("'{s}' is not a number"))),
        Cell::Bool(b) => Err(cell_error(row, column, format!("expected a number, got {b}"))),
        Cell::Empty => Err(cell_error(row, column, "value is missing")),
    }
}

fn whole_number(cell: &Cell, row: usize, column: &str) -> crate::Result<u32> {
    let value = number(cell, row, column)?;
    if value.fract() != 0.0 || value < 0.0 || value > f64::from(u32::MAX) {
        return Err(cell_error(
            row,
            column,
            format!("{value} is not a non-negative whole number"),
        ));
    }
    Ok(value as u32)
}

pub(crate) fn flag(cell: &Cell, row: usize, column: &str) -> crate::Result<bool> {
    match cell {
        Cell::Bool(b) => Ok(*b),
        Cell::Number(n) if *n == 0.0 => Ok(false),
        Cell::Number(n) if *n == 1.0 => Ok(true),
        Cell::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(true),
            "false" | "no" | "0" => Ok(false),
            _ => Err(cell_error(row, column, format!("'{s}' is not a yes/no value"))),
        },
        Cell::Number(n) => Err(cell_error(row, column, format!("{n} is not 0 or 1"))),
        Cell::Empty => Err(cell_error(row, column, "value is missing")),
    }
}

fn text<'a>(cell: &'a Cell, row: usize, column: &str) -> crate::Result<&'a str> {
    match cell {
        Cell::Text(s) => Ok(s),
        Cell::Empty => Err(cell_error(row, column, "value is missing")),
        other => Err(cell_error(row, column, format!("expected text, got {other:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::sample_attributes;
    use crate::model::{CabinClass, FlightType};
    use polars::prelude::{DataFrame, NamedFrom, Series};

    fn upload(rows: &[(f64, f64, &str)]) -> DataFrame {
        let n = rows.len();
        DataFrame::new(vec![
            Series::new("total_spent", rows.iter().map(|r| r.0).collect::<Vec<_>>()),
            Series::new("avg_order_value", vec![120.0f64; n]),
            Series::new("avg_purchase_frequency", vec![0.5f64; n]),
            Series::new("days_since_last_purchase", vec![30i64; n]),
            Series::new("discount_behavior", rows.iter().map(|r| r.1).collect::<Vec<_>>()),
            Series::new("loyalty_program_member", vec![1i64; n]),
            Series::new("days_in_advance", vec![14i64; n]),
            Series::new("flight_type", rows.iter().map(|r| r.2).collect::<Vec<_>>()),
            Series::new("cabin_class", vec!["business"; n]),
            Series::new("customer_id", (0..n as i64).collect::<Vec<_>>()),
        ])
        .unwrap()
    }

    #[test]
    fn test_single_source_validates() {
        let source = SingleRecordSource::new(sample_attributes()).unwrap();
        assert_eq!(source.record().attributes(), &sample_attributes());

        let bad = CustomerAttributes {
            discount_behavior: 1.01,
            ..sample_attributes()
        };
        assert!(matches!(
            SingleRecordSource::new(bad),
            Err(Error::Validation { .. })
        ));
    }

    #[test]
    fn test_tabular_rows_in_file_order() {
        let df = upload(&[
            (100.0, 0.1, "domestic"),
            (200.0, 0.0, "International"),
            (300.0, 1.0, "domestic"),
        ]);

        let source = RecordSource::from(TabularRecordSource::from_frame(&df).unwrap());
        assert_eq!(source.len(), 3);

        let records: Vec<CustomerRecord> = source.into_iter().collect();
        let spent: Vec<f64> = records.iter().map(|r| r.attributes().total_spent).collect();
        assert_eq!(spent, vec![100.0, 200.0, 300.0]);

        let second = records[1].attributes();
        assert_eq!(second.flight_type, FlightType::International);
        assert_eq!(second.cabin_class, CabinClass::Business);
        assert!(second.loyalty_program_member);
        assert_eq!(second.days_in_advance, 14);
    }

    #[test]
    fn test_missing_column_is_format_error() {
        let df = upload(&[(100.0, 0.1, "domestic")])
            .drop("cabin_class")
            .unwrap();

        match TabularRecordSource::from_frame(&df) {
            Err(Error::Format(msg)) => assert!(msg.contains("cabin_class"), "{msg}"),
            other => panic!("expected format error, got {other:?}"),
        }
    }

    #[test]
    fn test_bad_cell_names_row_and_column() {
        let df = upload(&[(100.0, 0.1, "domestic"), (50.0, 0.3, "lunar")]);

        match TabularRecordSource::from_frame(&df) {
            Err(Error::Format(msg)) => {
                assert!(msg.contains("row 3"), "{msg}");
                assert!(msg.contains("flight_type"), "{msg}");
            }
            other => panic!("expected format error, got {other:?}"),
        }
    }

    #[test]
    fn test_out_of_range_cell_is_format_error() {
        let df = upload(&[(100.0, 1.5, "domestic")]);

        match TabularRecordSource::from_frame(&df) {
            Err(Error::Format(msg)) => assert!(msg.contains("discount_behavior"), "{msg}"),
            other => panic!("expected format error, got {other:?}"),
        }
    }

    #[test]
    fn test_cell_coercions() {
        assert_eq!(number(&Cell::Text(" 12.5 ".into()), 2, "x").unwrap(), 12.5);
        assert!(number(&Cell::Empty, 2, "x").is_err());

        assert_eq!(whole_number(&Cell::Number(14.0), 2, "x").unwrap(), 14);
        assert!(whole_number(&Cell::Number(14.5), 2, "x").is_err());
        assert!(whole_number(&Cell::Number(-1.0), 2, "x").is_err());

        assert!(flag(&Cell::Text("Yes".into()), 2, "x").unwrap());
        assert!(!flag(&Cell::Number(0.0), 2, "x").unwrap());
        assert!(flag(&Cell::Number(2.0), 2, "x").is_err());
    }

    #[test]
    fn test_header_only_upload_is_empty() {
        let df = upload(&[]);
        let source = TabularRecordSource::from_frame(&df).unwrap();
        assert!(source.is_empty());
    }
}
