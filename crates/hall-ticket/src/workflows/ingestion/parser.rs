use std::io::Read;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};

use super::normalizer::{CellValue, RawRow};
use super::IngestionError;

/// Accepted upload container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Xlsx,
    Xls,
    Csv,
}

impl SourceFormat {
    /// Resolve the format from a file name's extension, case-insensitively.
    pub fn from_file_name(file_name: &str) -> Result<Self, IngestionError> {
        let extension = Path::new(file_name.trim())
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "xlsx" => Ok(Self::Xlsx),
            "xls" => Ok(Self::Xls),
            "csv" => Ok(Self::Csv),
            _ => Err(IngestionError::UnsupportedExtension(file_name.to_string())),
        }
    }

    pub const fn extension(self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Xls => "xls",
            Self::Csv => "csv",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("failed to read upload: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid workbook: {0}")]
    Workbook(#[from] calamine::Error),
}

/// Read the first sheet of `path`. The first row supplies the headers.
pub fn read_table(path: &Path, format: SourceFormat) -> Result<Vec<RawRow>, TableError> {
    match format {
        SourceFormat::Csv => {
            let file = std::fs::File::open(path)?;
            read_csv(file)
        }
        SourceFormat::Xlsx | SourceFormat::Xls => read_workbook(path),
    }
}

pub fn read_csv<R: Read>(reader: R) -> Result<Vec<RawRow>, TableError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let mut rows = Vec::new();

    for record in csv_reader.records() {
        let record = record?;
        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .map(|(header, value)| (header.to_string(), CellValue::text(value)))
            .collect();
        if !is_blank(&row) {
            rows.push(row);
        }
    }

    Ok(rows)
}

fn read_workbook(path: &Path) -> Result<Vec<RawRow>, TableError> {
    let mut workbook = open_workbook_auto(path)?;
    let Some(sheet) = workbook.sheet_names().first().cloned() else {
        return Ok(Vec::new());
    };
    let range = workbook.worksheet_range(&sheet)?;

    let mut sheet_rows = range.rows();
    let Some(header_row) = sheet_rows.next() else {
        return Ok(Vec::new());
    };
    let headers: Vec<String> = header_row
        .iter()
        .map(|cell| cell_value(cell).as_text().unwrap_or_default())
        .collect();

    let mut rows = Vec::new();
    for cells in sheet_rows {
        let row: RawRow = headers
            .iter()
            .zip(cells.iter())
            .filter(|(header, _)| !header.is_empty())
            .map(|(header, cell)| (header.clone(), cell_value(cell)))
            .collect();
        if !is_blank(&row) {
            rows.push(row);
        }
    }

    Ok(rows)
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::String(value) => CellValue::text(value.clone()),
        Data::Int(value) => CellValue::Number(*value as f64),
        Data::Float(value) => CellValue::Number(*value),
        Data::Bool(value) => CellValue::Bool(*value),
        other => CellValue::text(other.to_string()),
    }
}

fn is_blank(row: &RawRow) -> bool {
    row.iter().all(|(_, value)| value.is_empty())
}
