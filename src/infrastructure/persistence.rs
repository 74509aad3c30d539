use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{DomainError, Sheet, SheetConfig};

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid file format - {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("{0}")]
    Format(String),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Largest grid a sheet file may describe.
pub const MAX_CELLS: usize = 1_000_000;

/// One non-empty cell as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCell {
    pub row: usize,
    pub col: usize,
    pub expression: String,
}

/// On-disk form of a sheet: dimensions plus the expressions entered.
/// Rendered values are recomputed after loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetSnapshot {
    pub rows: usize,
    pub cols: usize,
    pub cells: Vec<StoredCell>,
}

impl SheetSnapshot {
    /// Records the dimensions and every non-empty expression of `sheet`.
    pub fn capture(sheet: &Sheet) -> Self {
        let mut cells = Vec::new();
        for row in 0..sheet.rows() {
            for col in 0..sheet.cols() {
                if let Some(cell) = sheet.cell_at(row, col).filter(|cell| cell.has_expression()) {
                    cells.push(StoredCell {
                        row,
                        col,
                        expression: cell.expression.clone(),
                    });
                }
            }
        }

        Self {
            rows: sheet.rows(),
            cols: sheet.cols(),
            cells,
        }
    }

    /// Builds a sheet large enough for every stored cell.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Format`] when the grid would hold more
    /// than [`MAX_CELLS`] cells or a stored position does not fit in one.
    pub fn restore(&self) -> PersistenceResult<Sheet> {
        let mut rows = self.rows;
        let mut cols = self.cols;
        for cell in &self.cells {
            rows = rows.max(Self::extent(cell.row, "row")?);
            cols = cols.max(Self::extent(cell.col, "column")?);
        }

        let cell_count = rows.max(1).checked_mul(cols.max(1));
        if cell_count.is_none_or(|count| count > MAX_CELLS) {
            return Err(PersistenceError::Format(format!(
                "Sheet of {}x{} exceeds the limit of {} cells",
                rows, cols, MAX_CELLS
            )));
        }

        let mut sheet = Sheet::new(rows, cols);
        for stored in &self.cells {
            if let Some(id) = sheet.id_at(stored.row, stored.col) {
                sheet.set_expression(id, &stored.expression)?;
            }
        }
        Ok(sheet)
    }

    fn extent(index: usize, axis: &str) -> PersistenceResult<usize> {
        index
            .checked_add(1)
            .filter(|extent| *extent <= MAX_CELLS)
            .ok_or_else(|| PersistenceError::Format(format!("{} {} is out of range", axis, index)))
    }
}

/// Repository for saving and loading sheets as JSON.
pub struct FileRepository;

impl FileRepository {
    /// Saves the expressions of `sheet` to a JSON file.
    ///
    /// # Arguments
    ///
    /// * `sheet` - Sheet to save
    /// * `filename` - Path to write
    ///
    /// # Returns
    ///
    /// The filename written, for display in the status line.
    pub fn save_sheet(sheet: &Sheet, filename: &str) -> PersistenceResult<String> {
        let json = serde_json::to_string_pretty(&SheetSnapshot::capture(sheet))?;
        fs::write(filename, json)?;
        log::debug!("saved sheet to {}", filename);
        Ok(filename.to_string())
    }

    /// Loads a sheet saved by [`FileRepository::save_sheet`].
    ///
    /// Values are not computed; the caller recalculates the sheet.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors, malformed JSON, or a sheet too large to build.
    pub fn load_sheet(filename: &str) -> PersistenceResult<(Sheet, String)> {
        let content = fs::read_to_string(filename)?;
        let snapshot: SheetSnapshot = serde_json::from_str(&content)?;
        log::debug!("loaded {} cells from {}", snapshot.cells.len(), filename);
        Ok((snapshot.restore()?, filename.to_string()))
    }
}

/// CSV import and export of expression text, one record per row.
pub struct CsvExporter;

impl CsvExporter {
    /// Writes the expression text of every cell, one record per row.
    pub fn export_to_csv(sheet: &Sheet, filename: &str) -> PersistenceResult<String> {
        let mut writer = csv::WriterBuilder::new().flexible(true).from_path(filename)?;

        for row in 0..sheet.rows() {
            let record: Vec<&str> = (0..sheet.cols())
                .map(|col| {
                    sheet
                        .cell_at(row, col)
                        .map(|cell| cell.expression.as_str())
                        .unwrap_or("")
                })
                .collect();
            writer.write_record(&record)?;
        }

        writer.flush()?;
        Ok(filename.to_string())
    }

    /// Reads a CSV file into a new sheet. Ragged rows are allowed; the
    /// widest row decides the column count.
    pub fn import_from_csv(filename: &str) -> PersistenceResult<Sheet> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(filename)?;

        let mut cells = Vec::new();
        let mut rows = 0;
        let mut cols = 0;

        for (row, record) in reader.records().enumerate() {
            let record = record?;
            rows = row + 1;
            cols = cols.max(record.len());

            for (col, field) in record.iter().enumerate() {
                if !field.is_empty() {
                    cells.push(StoredCell {
                        row,
                        col,
                        expression: field.to_string(),
                    });
                }
            }
        }

        if rows == 0 {
            return Err(PersistenceError::Format("CSV file is empty".to_string()));
        }

        SheetSnapshot { rows, cols, cells }.restore()
    }
}

/// Loads [`SheetConfig`] files.
pub struct ConfigRepository;

impl ConfigRepository {
    pub fn load_config(path: impl AsRef<Path>) -> PersistenceResult<SheetConfig> {
        let content = fs::read_to_string(path)?;
        Ok(SheetConfig::from_json(&content)?)
    }
}
