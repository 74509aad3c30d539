//! Workbook session state.
//!
//! This module holds the sheet being edited together with the session
//! bookkeeping around it (dirty flag, file name, status line) and exposes
//! the operations a front-end calls: set and commit expressions, bulk
//! recompute, and structural edits.

use crate::domain::{
    commit, recalculate_all, CellUpdate, DomainResult, EvaluationOutcome, Sheet, SheetConfig,
};

/// Main session state containing the sheet and its bookkeeping.
///
/// # Examples
///
/// ```
/// use cellsheet::application::Workbook;
///
/// let mut workbook = Workbook::default();
/// workbook.edit("A1", "5").unwrap();
/// let outcome = workbook.edit("B1", "A1 + 1").unwrap();
/// assert_eq!(outcome.cell.value, "6");
/// assert!(workbook.dirty);
/// ```
#[derive(Debug)]
pub struct Workbook {
    pub sheet: Sheet,
    pub config: SheetConfig,
    /// Set by any edit, cleared by save and load.
    pub dirty: bool,
    /// Current filename (if the sheet has been saved or loaded)
    pub filename: Option<String>,
    /// Temporary status message to display
    pub status_message: Option<String>,
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new(SheetConfig::default())
    }
}

impl Workbook {
    /// Creates a session with an empty sheet sized by `config`.
    pub fn new(config: SheetConfig) -> Self {
        Self {
            sheet: Sheet::from_config(&config),
            config,
            dirty: false,
            filename: None,
            status_message: None,
        }
    }

    /// Records new text for a cell without evaluating it.
    pub fn set_expression(&mut self, name: &str, text: &str) -> DomainResult<()> {
        let id = self.sheet.resolve(name)?;
        self.sheet.set_expression(id, text)?;
        self.dirty = true;
        Ok(())
    }

    /// Evaluates a cell and refreshes everything that depends on it.
    pub fn commit(&mut self, name: &str) -> DomainResult<EvaluationOutcome> {
        let id = self.sheet.resolve(name)?;
        let outcome = commit(&mut self.sheet, id, &self.config);
        self.status_message = outcome.message.clone();
        Ok(outcome)
    }

    /// Sets and commits in one step.
    pub fn edit(&mut self, name: &str, text: &str) -> DomainResult<EvaluationOutcome> {
        self.set_expression(name, text)?;
        self.commit(name)
    }

    /// Re-evaluates every cell and returns the refreshed values.
    pub fn recalculate_all(&mut self) -> Vec<CellUpdate> {
        recalculate_all(&mut self.sheet, &self.config)
    }

    /// Appends an empty row and recomputes the sheet.
    pub fn add_row(&mut self) -> DomainResult<Vec<CellUpdate>> {
        let at = self.sheet.rows();
        self.sheet.insert_row(at)?;
        Ok(self.structure_changed())
    }

    /// Appends an empty column and recomputes the sheet.
    pub fn add_column(&mut self) -> DomainResult<Vec<CellUpdate>> {
        let at = self.sheet.cols();
        self.sheet.insert_column(at)?;
        Ok(self.structure_changed())
    }

    /// Removes the last row.
    pub fn delete_row(&mut self) -> DomainResult<Vec<CellUpdate>> {
        let at = self.sheet.rows().saturating_sub(1);
        self.sheet.delete_row(at)?;
        Ok(self.structure_changed())
    }

    /// Removes the last column.
    pub fn delete_column(&mut self) -> DomainResult<Vec<CellUpdate>> {
        let at = self.sheet.cols().saturating_sub(1);
        self.sheet.delete_column(at)?;
        Ok(self.structure_changed())
    }

    /// Starts over with an empty sheet of the configured size.
    pub fn new_sheet(&mut self) {
        self.sheet = Sheet::from_config(&self.config);
        self.dirty = false;
        self.filename = None;
        self.status_message = None;
    }

    /// Installs a loaded sheet and recomputes it.
    pub fn replace_sheet(&mut self, sheet: Sheet, filename: Option<String>) -> Vec<CellUpdate> {
        self.sheet = sheet;
        self.filename = filename;
        let updates = self.recalculate_all();
        self.dirty = false;
        updates
    }

    /// Marks the current contents as saved under `filename`.
    pub fn mark_saved(&mut self, filename: &str) {
        self.filename = Some(filename.to_string());
        self.dirty = false;
        self.status_message = Some(format!("Saved to {}", filename));
    }

    fn structure_changed(&mut self) -> Vec<CellUpdate> {
        self.dirty = true;
        log::debug!(
            "sheet resized to {}x{}",
            self.sheet.rows(),
            self.sheet.cols()
        );
        self.recalculate_all()
    }
}
