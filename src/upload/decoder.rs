//! Spreadsheet decoding.
//!
//! Workbooks (xlsx, xlsm, xlsb, xls, ods) are read with calamine, delimited
//! text (csv, tsv) with the csv crate. Either way only the first sheet is
//! returned, as rows of [`CellValue`].

use crate::error::UploadError;
use crate::models::CellValue;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// How the bytes of an uploaded file should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// Any workbook calamine can sniff.
    Workbook,
    /// Delimited text with the given separator byte.
    Delimited(u8),
}

impl InputFormat {
    /// Pick the format from the file extension. `csv_delimiter` applies to
    /// `.csv` files; `.tsv` always uses a tab.
    pub fn from_path(path: &Path, csv_delimiter: u8) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("csv") => InputFormat::Delimited(csv_delimiter),
            Some("tsv") | Some("tab") => InputFormat::Delimited(b'\t'),
            _ => InputFormat::Workbook,
        }
    }
}

/// Decode `bytes` into the rows of the first sheet.
pub fn decode(bytes: Vec<u8>, format: InputFormat) -> Result<Vec<Vec<CellValue>>, UploadError> {
    match format {
        InputFormat::Workbook => decode_workbook(bytes),
        InputFormat::Delimited(delimiter) => decode_delimited(&bytes, delimiter),
    }
}

fn decode_workbook(bytes: Vec<u8>) -> Result<Vec<Vec<CellValue>>, UploadError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;

    let sheet_names = workbook.sheet_names();
    debug!("Workbook sheets: {:?}", sheet_names);

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| UploadError::Decode("workbook has no sheets".to_string()))??;

    // Keep column letters absolute when the used range does not start at A.
    // Rows are not padded: rows[0] is the first used row, and that row is
    // the one skipped as the header, wherever it sits on the sheet.
    let leading_cols = range.start().map(|(_, col)| col as usize).unwrap_or(0);

    let rows: Vec<Vec<CellValue>> = range
        .rows()
        .map(|cells| {
            std::iter::repeat(CellValue::Empty)
                .take(leading_cols)
                .chain(cells.iter().map(CellValue::from))
                .collect()
        })
        .collect();

    debug!("Decoded {} rows from first sheet", rows.len());
    Ok(rows)
}

fn decode_delimited(bytes: &[u8], delimiter: u8) -> Result<Vec<Vec<CellValue>>, UploadError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(CellValue::from_text).collect());
    }

    debug!("Decoded {} delimited rows", rows.len());
    Ok(rows)
}

impl From<&Data> for CellValue {
    fn from(cell: &Data) -> Self {
        match cell {
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Float(f) => CellValue::Number(*f),
            Data::Bool(b) => CellValue::Bool(*b),
            Data::String(s) => CellValue::Text(s.clone()),
            Data::Empty | Data::Error(_) => CellValue::Empty,
            // Dates and durations are never ages.
            other => CellValue::Text(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    fn xlsx_bytes(build: impl FnOnce(&mut rust_xlsxwriter::Worksheet)) -> Vec<u8> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        build(sheet);
        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            InputFormat::from_path(Path::new("a.CSV"), b';'),
            InputFormat::Delimited(b';')
        );
        assert_eq!(
            InputFormat::from_path(Path::new("a.tsv"), b','),
            InputFormat::Delimited(b'\t')
        );
        assert_eq!(
            InputFormat::from_path(Path::new("a.xlsx"), b','),
            InputFormat::Workbook
        );
        assert_eq!(
            InputFormat::from_path(Path::new("noext"), b','),
            InputFormat::Workbook
        );
    }

    #[test]
    fn test_decode_csv() {
        let csv = b"Fornavn,Etternavn,Klasse,Alder\nKari,Hansen,4B,9\nPer,Olsen,4B,\nLise,Berg,4B,ti\n";
        let rows = decode(csv.to_vec(), InputFormat::Delimited(b',')).unwrap();

        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0][3], CellValue::Text("Alder".to_string()));
        assert_eq!(rows[1][3], CellValue::Number(9.0));
        assert_eq!(rows[2][3], CellValue::Empty);
        assert_eq!(rows[3][3], CellValue::Text("ti".to_string()));
    }

    #[test]
    fn test_decode_csv_ragged_rows() {
        let csv = b"a,b,c,d\n1\n1,2,3,4,5\n";
        let rows = decode(csv.to_vec(), InputFormat::Delimited(b',')).unwrap();
        assert_eq!(rows[1].len(), 1);
        assert_eq!(rows[2].len(), 5);
    }

    #[test]
    fn test_decode_semicolon_csv() {
        let csv = b"a;b;c;d\nx;y;z;44\n";
        let rows = decode(csv.to_vec(), InputFormat::Delimited(b';')).unwrap();
        assert_eq!(rows[1][3], CellValue::Number(44.0));
    }

    #[test]
    fn test_decode_invalid_utf8_csv() {
        let bytes = vec![b'a', b',', 0xFF, 0xFE, b'\n'];
        let result = decode(bytes, InputFormat::Delimited(b','));
        assert!(matches!(result, Err(UploadError::Decode(_))));
    }

    #[test]
    fn test_decode_garbage_workbook() {
        let result = decode(b"definitely not a workbook".to_vec(), InputFormat::Workbook);
        assert!(matches!(result, Err(UploadError::Decode(_))));
    }

    #[test]
    fn test_decode_xlsx() {
        let bytes = xlsx_bytes(|sheet| {
            sheet.write_string(0, 0, "Fornavn").unwrap();
            sheet.write_string(0, 3, "Alder").unwrap();
            sheet.write_string(1, 0, "Kari").unwrap();
            sheet.write_number(1, 3, 9).unwrap();
            sheet.write_string(2, 0, "Per").unwrap();
            sheet.write_string(2, 3, "x").unwrap();
            sheet.write_string(3, 0, "Lise").unwrap();
            sheet.write_boolean(3, 3, true).unwrap();
        });

        let rows = decode(bytes, InputFormat::Workbook).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1][3], CellValue::Number(9.0));
        assert_eq!(rows[2][3], CellValue::Text("x".to_string()));
        assert_eq!(rows[3][3], CellValue::Bool(true));
    }

    #[test]
    fn test_decode_xlsx_keeps_absolute_columns() {
        // Used range starts at column B; the age still lives in column D.
        let bytes = xlsx_bytes(|sheet| {
            sheet.write_string(0, 1, "Navn").unwrap();
            sheet.write_string(0, 3, "Alder").unwrap();
            sheet.write_string(1, 1, "Kari").unwrap();
            sheet.write_number(1, 3, 33).unwrap();
        });

        let rows = decode(bytes, InputFormat::Workbook).unwrap();
        assert_eq!(rows[1][3], CellValue::Number(33.0));
    }

    #[test]
    fn test_decode_xlsx_rows_start_at_first_used_row() {
        // Two blank rows above the header.
        let bytes = xlsx_bytes(|sheet| {
            sheet.write_string(2, 3, "Alder").unwrap();
            sheet.write_number(3, 3, 12).unwrap();
        });

        let rows = decode(bytes, InputFormat::Workbook).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][3], CellValue::Text("Alder".to_string()));
        assert_eq!(rows[1][3], CellValue::Number(12.0));
    }
}
