//! Spreadsheet decoding into plain text grids.

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::io::Cursor;

use super::error::ImportError;

/// One worksheet as trimmed cell text, row-major.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetGrid {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

impl SheetGrid {
    pub fn new(name: &str, rows: Vec<Vec<&str>>) -> Self {
        Self {
            name: name.to_string(),
            rows: rows
                .into_iter()
                .map(|r| r.into_iter().map(|c| c.trim().to_string()).collect())
                .collect(),
        }
    }

    /// Returns the trimmed text of a cell, or "" when out of range.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn is_blank(&self) -> bool {
        self.rows.iter().flatten().all(|c| c.is_empty())
    }
}

/// Decodes an xlsx/xls/ods upload into one grid per worksheet, in sheet order.
pub fn read_workbook(bytes: Vec<u8>) -> Result<Vec<SheetGrid>, ImportError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| ImportError::Workbook(e.to_string()))?;

    let sheet_names = workbook.sheet_names().to_owned();
    let mut sheets = Vec::with_capacity(sheet_names.len());

    for name in sheet_names {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| ImportError::Workbook(format!("sheet '{name}': {e}")))?;

        let rows = range
            .rows()
            .map(|row| row.iter().map(cell_text).collect())
            .collect();

        sheets.push(SheetGrid { name, rows });
    }

    Ok(sheets)
}

/// Renders a cell as text; integral numbers lose their ".0".
pub fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string().trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&Data::Empty), "");
        assert_eq!(cell_text(&Data::String("  Toán ".to_string())), "Toán");
        assert_eq!(cell_text(&Data::Float(3.0)), "3");
        assert_eq!(cell_text(&Data::Float(2.5)), "2.5");
        assert_eq!(cell_text(&Data::Int(7)), "7");
    }

    #[test]
    fn test_grid_cell_out_of_range() {
        let grid = SheetGrid::new("10A1", vec![vec!["Tiết", "Thứ 2"], vec!["1"]]);
        assert_eq!(grid.cell(0, 1), "Thứ 2");
        assert_eq!(grid.cell(1, 1), "");
        assert_eq!(grid.cell(9, 9), "");
        assert!(!grid.is_blank());
        assert!(SheetGrid::new("x", vec![vec!["", " "]]).is_blank());
    }

    #[test]
    fn test_reads_fixture_workbook() {
        let bytes = include_bytes!("../../tests/fixtures/timetable.xlsx").to_vec();
        let sheets = read_workbook(bytes).unwrap();

        let names: Vec<&str> = sheets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["10A1", "10A2"]);

        let first = &sheets[0];
        assert_eq!(first.rows[0], vec!["Tiết", "Thứ 2", "Thứ 3"]);
        // numeric slot labels render without ".0"
        assert_eq!(first.cell(1, 0), "1");
        assert_eq!(first.cell(1, 1), "Nguyen Van A - Toán (T01|S01) - P101");
        assert_eq!(first.cell(1, 2), "");
        assert_eq!(first.cell(2, 0), "2");
        assert_eq!(first.cell(2, 2), "Chào cờ");

        assert_eq!(sheets[1].cell(1, 0), "Tiết 1");
        assert_eq!(sheets[1].cell(1, 2), "Toán");
    }

    #[test]
    fn test_garbage_bytes_are_rejected() {
        let err = read_workbook(b"not a spreadsheet".to_vec()).unwrap_err();
        assert!(matches!(err, ImportError::Workbook(_)));
    }
}
