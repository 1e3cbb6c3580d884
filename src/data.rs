//! Spreadsheet loading and writing on top of Polars data frames

use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use polars::prelude::*;
use rust_xlsxwriter::Workbook;

use crate::error::Error;

/// File formats accepted for uploads and exports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Xlsx,
    Csv,
}

impl TableFormat {
    /// Pick the format from a file extension.
    pub fn from_path(path: &Path) -> crate::Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "xlsx" => Ok(TableFormat::Xlsx),
            "csv" => Ok(TableFormat::Csv),
            _ => Err(Error::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// One cell of a loaded table, independent of the column's storage type.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Bool(bool),
    Text(String),
}

/// Load a table from disk, choosing the parser from the file extension.
pub fn load_table(path: &Path) -> crate::Result<DataFrame> {
    let format = TableFormat::from_path(path)?;
    let bytes = std::fs::read(path)?;
    let df = read_table(bytes, format)?;

    tracing::debug!(
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        "table loaded"
    );
    Ok(df)
}

/// Parse an in-memory upload into a data frame. The first row holds the headers and CSV
/// column types are inferred from every row.
pub fn read_table(bytes: Vec<u8>, format: TableFormat) -> crate::Result<DataFrame> {
    match format {
        TableFormat::Csv => {
            let df = CsvReadOptions::default()
                .with_has_header(true)
                .with_infer_schema_length(None)
                .into_reader_with_file_handle(Cursor::new(bytes))
                .finish()?;
            Ok(df)
        }
        TableFormat::Xlsx => read_xlsx(bytes),
    }
}

fn read_xlsx(bytes: Vec<u8>) -> crate::Result<DataFrame> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| Error::Format("workbook has no worksheets".to_string()))??;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(DataFrame::empty());
    };

    let names: Vec<String> = header.iter().map(|cell| cell.to_string()).collect();
    for (idx, name) in names.iter().enumerate() {
        if !name.is_empty() && names[..idx].contains(name) {
            return Err(Error::Format(format!("duplicate column '{name}' in header row")));
        }
    }
    let mut columns: Vec<Vec<Cell>> = vec![Vec::new(); names.len()];
    for row in rows {
        for (idx, column) in columns.iter_mut().enumerate() {
            column.push(row.get(idx).map(to_cell).unwrap_or(Cell::Empty));
        }
    }

    let series = names
        .iter()
        .zip(columns)
        .filter(|(name, _)| !name.is_empty())
        .map(|(name, cells)| cells_to_series(name, cells))
        .collect::<Vec<_>>();

    Ok(DataFrame::new(series)?)
}

fn to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::Bool(b) => Cell::Bool(*b),
        Data::String(s) if s.trim().is_empty() => Cell::Empty,
        other => Cell::Text(other.to_string()),
    }
}

/// Build a typed column: all-numeric and all-boolean columns keep their type, anything mixed
/// falls back to text.
fn cells_to_series(name: &str, cells: Vec<Cell>) -> Series {
    let filled = || cells.iter().filter(|c| **c != Cell::Empty);

    if filled().all(|c| matches!(c, Cell::Number(_))) {
        let values: Vec<Option<f64>> = cells
            .iter()
            .map(|c| match c {
                Cell::Number(n) => Some(*n),
                _ => None,
            })
            .collect();
        return Series::new(name, values);
    }

    if filled().all(|c| matches!(c, Cell::Bool(_))) {
        let values: Vec<Option<bool>> = cells
            .iter()
            .map(|c| match c {
                Cell::Bool(b) => Some(*b),
                _ => None,
            })
            .collect();
        return Series::new(name, values);
    }

    let values: Vec<Option<String>> = cells
        .into_iter()
        .map(|c| match c {
            Cell::Empty => None,
            Cell::Number(n) => Some(n.to_string()),
            Cell::Bool(b) => Some(b.to_string()),
            Cell::Text(s) => Some(s),
        })
        .collect();
    Series::new(name, values)
}

/// Read a whole column as cells, or `None` if the frame has no such column.
pub fn column_cells(df: &DataFrame, name: &str) -> crate::Result<Option<Vec<Cell>>> {
    let Ok(series) = df.column(name) else {
        return Ok(None);
    };
    Ok(Some(series_cells(series)?))
}

fn series_cells(series: &Series) -> crate::Result<Vec<Cell>> {
    let cells = match series.dtype() {
        DataType::Boolean => series
            .bool()?
            .into_iter()
            .map(|v| v.map_or(Cell::Empty, Cell::Bool))
            .collect(),
        dtype if dtype.is_numeric() => series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| v.map_or(Cell::Empty, Cell::Number))
            .collect(),
        DataType::String => series
            .str()?
            .into_iter()
            .map(|v| match v {
                Some(s) if !s.trim().is_empty() => Cell::Text(s.to_string()),
                _ => Cell::Empty,
            })
            .collect(),
        _ => {
            let as_text = series.cast(&DataType::String)?;
            return series_cells(&as_text);
        }
    };
    Ok(cells)
}

/// Serialize a data frame with one header row.
pub fn write_table(df: &DataFrame, format: TableFormat) -> crate::Result<Vec<u8>> {
    match format {
        TableFormat::Csv => {
            let mut buf = Vec::new();
            let mut df = df.clone();
            CsvWriter::new(&mut buf)
                .include_header(true)
                .finish(&mut df)?;
            Ok(buf)
        }
        TableFormat::Xlsx => write_xlsx(df),
    }
}

fn write_xlsx(df: &DataFrame) -> crate::Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    for (col_idx, series) in df.get_columns().iter().enumerate() {
        let col = u16::try_from(col_idx)
            .map_err(|_| Error::Format(format!("too many columns: {}", df.width())))?;
        sheet.write_string(0, col, series.name())?;

        for (row_idx, cell) in series_cells(series)?.into_iter().enumerate() {
            let row = u32::try_from(row_idx + 1)
                .map_err(|_| Error::Format(format!("too many rows: {}", df.height())))?;
            match cell {
                Cell::Empty => {}
                Cell::Number(n) => {
                    sheet.write_number(row, col, n)?;
                }
                Cell::Bool(b) => {
                    sheet.write_boolean(row, col, b)?;
                }
                Cell::Text(s) => {
                    sheet.write_string(row, col, s)?;
                }
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}
