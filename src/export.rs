//! Export of scored batches as downloadable spreadsheets

use polars::prelude::*;

use crate::batch::ScoredTable;
use crate::data::{write_table, TableFormat};
use crate::model::{CustomerAttributes, INPUT_COLUMNS};

pub const PREDICTION_COLUMN: &str = "Prediction";
pub const PROBABILITY_COLUMN: &str = "Probability";

/// Lay out a scored table as the nine input columns followed by `Prediction` and
/// `Probability`. Absent results become nulls.
pub fn to_frame(table: &ScoredTable) -> crate::Result<DataFrame> {
    let rows = table.rows();
    let attrs: Vec<&CustomerAttributes> = rows.iter().map(|row| row.record.attributes()).collect();

    let columns = vec![
        Series::new(INPUT_COLUMNS[0], attrs.iter().map(|a| a.total_spent).collect::<Vec<_>>()),
        Series::new(INPUT_COLUMNS[1], attrs.iter().map(|a| a.avg_order_value).collect::<Vec<_>>()),
        Series::new(
            INPUT_COLUMNS[2],
            attrs.iter().map(|a| a.avg_purchase_frequency).collect::<Vec<_>>(),
        ),
        Series::new(
            INPUT_COLUMNS[3],
            attrs.iter()
                .map(|a| i64::from(a.days_since_last_purchase))
                .collect::<Vec<_>>(),
        ),
        Series::new(INPUT_COLUMNS[4], attrs.iter().map(|a| a.discount_behavior).collect::<Vec<_>>()),
        Series::new(
            INPUT_COLUMNS[5],
            attrs.iter()
                .map(|a| i64::from(a.loyalty_program_member))
                .collect::<Vec<_>>(),
        ),
        Series::new(
            INPUT_COLUMNS[6],
            attrs.iter().map(|a| i64::from(a.days_in_advance)).collect::<Vec<_>>(),
        ),
        Series::new(
            INPUT_COLUMNS[7],
            attrs.iter().map(|a| a.flight_type.as_str()).collect::<Vec<_>>(),
        ),
        Series::new(
            INPUT_COLUMNS[8],
            attrs.iter().map(|a| a.cabin_class.as_str()).collect::<Vec<_>>(),
        ),
        Series::new(
            PREDICTION_COLUMN,
            rows.iter()
                .map(|row| row.result.map(|r| r.will_continue))
                .collect::<Vec<_>>(),
        ),
        Series::new(
            PROBABILITY_COLUMN,
            rows.iter()
                .map(|row| row.result.map(|r| r.probability))
                .collect::<Vec<_>>(),
        ),
    ];

    Ok(DataFrame::new(columns)?)
}

/// Serialize a scored table, one header row, in the requested format.
pub fn export(table: &ScoredTable, format: TableFormat) -> crate::Result<Vec<u8>> {
    let df = to_frame(table)?;
    let bytes = write_table(&df, format)?;
    tracing::debug!(rows = df.height(), bytes = bytes.len(), ?format, "scored table exported");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{column_cells, read_table, Cell};
    use crate::model::tests::sample_attributes;
    use crate::model::{CustomerRecord, PredictionResult};

    fn table() -> ScoredTable {
        let record = CustomerRecord::try_from(sample_attributes()).unwrap();
        let mut table = ScoredTable::new();
        table.push(
            record.clone(),
            Some(PredictionResult {
                will_continue: true,
                probability: 0.8125,
            }),
        );
        table.push(record, None);
        table
    }

    #[test]
    fn test_columns_follow_input_order() {
        let df = to_frame(&table()).unwrap();

        let mut expected: Vec<&str> = INPUT_COLUMNS.to_vec();
        expected.extend([PREDICTION_COLUMN, PROBABILITY_COLUMN]);
        assert_eq!(df.get_column_names(), expected);
        assert_eq!(df.height(), 2);
    }

    #[test]
    fn test_absent_results_export_as_empty_cells() {
        for format in [TableFormat::Xlsx, TableFormat::Csv] {
            let bytes = export(&table(), format).unwrap();
            let df = read_table(bytes, format).unwrap();

            assert_eq!(
                column_cells(&df, PREDICTION_COLUMN).unwrap().unwrap(),
                vec![Cell::Bool(true), Cell::Empty]
            );
            assert_eq!(
                column_cells(&df, PROBABILITY_COLUMN).unwrap().unwrap(),
                vec![Cell::Number(0.8125), Cell::Empty]
            );
        }
    }
}
