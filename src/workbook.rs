use std::fs;
use std::path::{Path, PathBuf};

use calamine::{open_workbook, Data, Reader, Xlsx};
use rust_xlsxwriter::Workbook;

use crate::consts::SHEET_NAME;
use crate::schema::Schema;
use crate::store::StoreError;

/// Whole-table persistence behind the vocabulary store.
///
/// Rows exclude the header. `load` returns every data row padded to the
/// schema width, `save` replaces the entire table.
pub trait TableBackend: Send + Sync {
    fn schema(&self) -> Schema;

    /// Create an empty table with just the header. Returns false if one already exists.
    fn initialize(&self) -> Result<bool, StoreError>;

    fn load(&self) -> Result<Vec<Vec<String>>, StoreError>;

    fn save(&self, rows: &[Vec<String>]) -> Result<(), StoreError>;
}

/// Single-sheet `.xlsx` file. Row 0 is the header, data starts at row 1.
#[derive(Debug, Clone)]
pub struct XlsxWorkbook {
    path: PathBuf,
    schema: Schema,
}

impl XlsxWorkbook {
    pub fn new(path: impl Into<PathBuf>, schema: Schema) -> Self {
        Self {
            path: path.into(),
            schema,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling path the new file is written to before it replaces the workbook
    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn render(&self, rows: &[Vec<String>]) -> Result<Vec<u8>, StoreError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(SHEET_NAME)?;

        for (col, label) in self.schema.header().into_iter().enumerate() {
            if !label.is_empty() {
                worksheet.write_string(0, col as u16, label)?;
            }
        }

        let width = self.schema.width();
        for (index, row) in rows.iter().enumerate() {
            let excel_row = (index + 1) as u32;
            for (col, value) in row.iter().take(width).enumerate() {
                if !value.is_empty() {
                    worksheet.write_string(excel_row, col as u16, value)?;
                }
            }
        }

        // Widths are reapplied on every write
        for (col, width) in self.schema.column_widths().into_iter().enumerate() {
            worksheet.set_column_width(col as u16, width)?;
        }

        Ok(workbook.save_to_buffer()?)
    }
}

impl TableBackend for XlsxWorkbook {
    fn schema(&self) -> Schema {
        self.schema
    }

    fn initialize(&self) -> Result<bool, StoreError> {
        if self.path.exists() {
            return Ok(false);
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        self.save(&[])?;
        Ok(true)
    }

    fn load(&self) -> Result<Vec<Vec<String>>, StoreError> {
        let mut workbook: Xlsx<_> = open_workbook(&self.path)?;
        let range = workbook.worksheet_range_at(0).ok_or(StoreError::NoSheet)??;

        let Some((last_row, _)) = range.end() else {
            return Ok(Vec::new());
        };

        let width = self.schema.width();
        let mut rows = Vec::new();
        for r in 1..=last_row {
            let row: Vec<String> = (0..width)
                .map(|c| {
                    range
                        .get_value((r, c as u32))
                        .map(cell_text)
                        .unwrap_or_default()
                })
                .collect();
            if row.iter().any(|cell| !cell.is_empty()) {
                rows.push(row);
            }
        }

        Ok(rows)
    }

    fn save(&self, rows: &[Vec<String>]) -> Result<(), StoreError> {
        let buffer = self.render(rows)?;
        let staging = self.staging_path();
        fs::write(&staging, buffer)?;
        fs::rename(&staging, &self.path)?;
        Ok(())
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}
