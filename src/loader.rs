use crate::cell::CellValue;
use crate::error::{FillError, SourceError};
use crate::resolver::{Table, TableSource};
use calamine::{Data, Reader, Xlsx, open_workbook};
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;

/// Convert one calamine cell into the crate's closed value variant.
fn convert_cell(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Blank,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Boolean(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(naive) => CellValue::DateTime(naive),
            // Out-of-range serial date; keep the raw serial number visible
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        // Surface Excel error literals (#DIV/0! etc.) as they display in the sheet
        Data::Error(e) => CellValue::Text(e.to_string()),
    }
}

/// A workbook-backed table source.
///
/// Tags address cells by absolute reference (`A1` is always the sheet's top
/// left corner), so the used range calamine reports is re-anchored at `A1`
/// and padded with blanks where the data starts further down or right.
pub struct XlsxSource<R> {
    workbook: Xlsx<R>,
}

impl XlsxSource<BufReader<File>> {
    /// Open a workbook from a file on disk.
    pub fn open(filepath: impl AsRef<Path>) -> Result<Self, FillError> {
        let workbook = open_workbook(filepath)
            .map_err(|e: calamine::XlsxError| FillError::BadDocument(e.to_string()))?;
        Ok(XlsxSource { workbook })
    }
}

impl XlsxSource<Cursor<Vec<u8>>> {
    /// Open a workbook from uploaded bytes held in memory.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, FillError> {
        let workbook = Xlsx::new(Cursor::new(bytes))
            .map_err(|e| FillError::BadDocument(e.to_string()))?;
        Ok(XlsxSource { workbook })
    }
}

impl<R: Read + Seek> TableSource for XlsxSource<R> {
    fn fetch_table(&mut self, name: &str) -> Result<Table, SourceError> {
        if !self.workbook.sheet_names().iter().any(|n| n == name) {
            return Err(SourceError::NotFound(name.to_string()));
        }

        let range = self
            .workbook
            .worksheet_range(name)
            .map_err(|e| SourceError::Unreadable(name.to_string(), e.to_string()))?;

        // Re-anchor the used range at A1
        let (start_row, start_col) = match range.start() {
            Some((r, c)) => (r as usize, c as usize),
            None => return Ok(Vec::new()), // empty sheet
        };

        let width = start_col + range.width();
        let mut table: Table = Vec::with_capacity(start_row + range.height());
        for _ in 0..start_row {
            table.push(vec![CellValue::Blank; width]);
        }
        for row in range.rows() {
            let mut cells: Vec<CellValue> = Vec::with_capacity(start_col + row.len());
            cells.resize(start_col, CellValue::Blank);
            cells.extend(row.iter().map(convert_cell));
            table.push(cells);
        }
        Ok(table)
    }

    fn sheet_names(&self) -> Vec<String> {
        self.workbook.sheet_names()
    }
}

/// A single-table source backed by a CSV file.
///
/// CSV has no sheets, so the one table answers any requested name; in
/// automatic configuration mode it is addressed by the file stem.
pub struct CsvSource {
    name: String,
    table: Table,
}

impl CsvSource {
    pub fn open(filepath: impl AsRef<Path>) -> Result<Self, FillError> {
        let path = filepath.as_ref();
        let content = std::fs::read_to_string(path)?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Data")
            .to_string();
        Ok(CsvSource::from_str_named(&content, name))
    }

    pub fn from_str_named(content: &str, name: String) -> Self {
        let table = content
            .lines()
            .map(|line| {
                parse_csv_row(line)
                    .into_iter()
                    .map(|field| {
                        if field.is_empty() {
                            CellValue::Blank
                        } else if let Ok(n) = field.parse::<f64>() {
                            CellValue::Number(n)
                        } else {
                            CellValue::Text(field)
                        }
                    })
                    .collect()
            })
            .collect();
        CsvSource { name, table }
    }
}

impl TableSource for CsvSource {
    fn fetch_table(&mut self, _name: &str) -> Result<Table, SourceError> {
        Ok(self.table.clone())
    }

    fn sheet_names(&self) -> Vec<String> {
        vec![self.name.clone()]
    }
}

// Parse a CSV row into a vector of fields, honoring quoted fields and
// doubled quotes
fn parse_csv_row(line: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current_field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                if let Some(&next) = chars.peek() {
                    if next == '"' && in_quotes {
                        current_field.push('"');
                        chars.next();
                    } else {
                        in_quotes = !in_quotes;
                    }
                } else {
                    in_quotes = !in_quotes;
                }
            }
            ',' if !in_quotes => {
                result.push(current_field);
                current_field = String::new();
            }
            _ => {
                current_field.push(c);
            }
        }
    }

    result.push(current_field);
    result
}

/// Detect file type and open the appropriate source.
///
/// Examines the file extension and dispatches to the workbook or CSV loader.
pub fn open_source(filepath: impl AsRef<Path>) -> Result<Box<dyn TableSource>, FillError> {
    let path = filepath.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    match extension.as_deref() {
        Some("csv") => Ok(Box::new(CsvSource::open(path)?)),
        Some("xlsx") | Some("xlsm") | Some("xls") => Ok(Box::new(XlsxSource::open(path)?)),
        Some(ext) => Err(FillError::BadConfig(format!(
            "unsupported data file extension: {}",
            ext
        ))),
        None => Err(FillError::BadConfig(
            "data file has no extension".to_string(),
        )),
    }
}
