//! Core data structures for the cell grid.
//!
//! A [`Sheet`] owns every [`Cell`] and indexes them three ways: by stable
//! [`CellId`], by zero-based `(row, col)` position, and by `A1`-style name.
//! Dependency edges between cells are stored as ids, so renaming cells after
//! a structural edit never touches the edges themselves.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::config::SheetConfig;
use super::errors::{DomainError, DomainResult};

/// Stable identity of a cell.
///
/// Ids never change for the lifetime of a cell, while names and positions
/// shift with row/column edits. Dependency edges are stored as ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellId(u32);

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A named formula slot with its last rendered value.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub id: CellId,
    /// Column letters plus 1-based row number, e.g. `B3`.
    pub name: String,
    /// Raw text as last entered. Empty means no formula.
    pub expression: String,
    /// Last rendered display string.
    pub value: String,
    /// Cells whose formulas reference this one, in insertion order.
    pub dependents: Vec<CellId>,
}

impl Cell {
    fn new(id: CellId, name: String) -> Self {
        Self {
            id,
            name,
            expression: String::new(),
            value: String::new(),
            dependents: Vec::new(),
        }
    }

    /// Registers `dependent` unless it is already present.
    pub fn add_dependent(&mut self, dependent: CellId) -> bool {
        if self.dependents.contains(&dependent) {
            false
        } else {
            self.dependents.push(dependent);
            true
        }
    }

    /// Removes `dependent` if present.
    pub fn remove_dependent(&mut self, dependent: CellId) {
        self.dependents.retain(|id| *id != dependent);
    }

    /// Whether the cell holds any text at all.
    pub fn has_expression(&self) -> bool {
        !self.expression.is_empty()
    }
}

/// The grid of cells, indexed by id, position and name.
///
/// Positions are zero-based `(row, col)` pairs; names are derived from them.
///
/// # Examples
///
/// ```
/// use cellsheet::domain::Sheet;
///
/// let sheet = Sheet::new(3, 2);
/// assert_eq!(sheet.len(), 6);
/// assert_eq!(sheet.cell_at(2, 1).unwrap().name, "B3");
/// assert!(sheet.lookup("b3").is_some());
/// assert!(sheet.lookup("C1").is_none());
/// ```
#[derive(Debug, Clone)]
pub struct Sheet {
    cells: HashMap<CellId, Cell>,
    positions: HashMap<(usize, usize), CellId>,
    names: HashMap<String, CellId>,
    rows: usize,
    cols: usize,
    next_id: u32,
}

impl Default for Sheet {
    fn default() -> Self {
        Self::from_config(&SheetConfig::default())
    }
}

impl Sheet {
    /// Creates a grid with every position materialized as an empty cell.
    ///
    /// Dimensions are clamped to at least one row and one column.
    pub fn new(rows: usize, cols: usize) -> Self {
        let mut sheet = Self {
            cells: HashMap::new(),
            positions: HashMap::new(),
            names: HashMap::new(),
            rows: rows.max(1),
            cols: cols.max(1),
            next_id: 0,
        };
        for row in 0..sheet.rows {
            for col in 0..sheet.cols {
                sheet.materialize(row, col);
            }
        }
        sheet
    }

    /// Creates a grid sized by `config`.
    pub fn from_config(config: &SheetConfig) -> Self {
        Self::new(config.rows, config.cols)
    }

    /// Number of rows in the grid.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns in the grid.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of cells, which is always `rows * cols`.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Converts a zero-based column index to its letters (`0 -> A`, `26 -> AA`).
    pub fn column_label(col: usize) -> String {
        let mut result = String::new();
        let mut c = col;
        loop {
            result.insert(0, char::from(b'A' + (c % 26) as u8));
            if c < 26 {
                break;
            }
            c = c / 26 - 1;
        }
        result
    }

    /// Builds the `A1`-style name for a zero-based position.
    ///
    /// # Examples
    ///
    /// ```
    /// use cellsheet::domain::Sheet;
    ///
    /// assert_eq!(Sheet::cell_name(0, 0), "A1");
    /// assert_eq!(Sheet::cell_name(9, 27), "AB10");
    /// ```
    pub fn cell_name(row: usize, col: usize) -> String {
        format!("{}{}", Self::column_label(col), row + 1)
    }

    /// Parses an `A1`-style name into a zero-based `(row, col)` pair.
    pub fn parse_cell_reference(cell_ref: &str) -> Option<(usize, usize)> {
        let split = cell_ref.find(|ch: char| ch.is_ascii_digit())?;
        let (letters, digits) = cell_ref.split_at(split);

        if letters.is_empty() || !letters.chars().all(|ch| ch.is_ascii_alphabetic()) {
            return None;
        }
        if !digits.chars().all(|ch| ch.is_ascii_digit()) {
            return None;
        }

        let mut col = 0usize;
        for ch in letters.chars() {
            let digit = (ch.to_ascii_uppercase() as u8 - b'A') as usize + 1;
            col = col.checked_mul(26)?.checked_add(digit)?;
        }
        let row = digits.parse::<usize>().ok()?.checked_sub(1)?;

        Some((row, col - 1))
    }

    /// Returns the cell with `id`, or `None` once it has been deleted.
    pub fn get(&self, id: CellId) -> Option<&Cell> {
        self.cells.get(&id)
    }

    pub fn get_mut(&mut self, id: CellId) -> Option<&mut Cell> {
        self.cells.get_mut(&id)
    }

    /// Id of the cell currently at a zero-based position.
    pub fn id_at(&self, row: usize, col: usize) -> Option<CellId> {
        self.positions.get(&(row, col)).copied()
    }

    pub fn cell_at(&self, row: usize, col: usize) -> Option<&Cell> {
        self.id_at(row, col).and_then(|id| self.cells.get(&id))
    }

    /// Finds a cell by name, ignoring letter case.
    pub fn lookup(&self, name: &str) -> Option<CellId> {
        self.names.get(&name.to_ascii_uppercase()).copied()
    }

    pub fn cell_by_name(&self, name: &str) -> Option<&Cell> {
        self.lookup(name).and_then(|id| self.cells.get(&id))
    }

    /// Resolves a user-supplied cell name.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidCellReference`] when `name` is not an
    /// `A1`-style reference, or [`DomainError::UnknownCell`] when it lies
    /// outside the grid.
    pub fn resolve(&self, name: &str) -> DomainResult<CellId> {
        if Self::parse_cell_reference(name).is_none() {
            return Err(DomainError::InvalidCellReference(name.to_string()));
        }
        self.lookup(name)
            .ok_or_else(|| DomainError::UnknownCell(name.to_string()))
    }

    /// Returns a clone of the cell's name, or its id when the cell is gone.
    pub fn name_of(&self, id: CellId) -> String {
        self.cells
            .get(&id)
            .map(|cell| cell.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    /// All cell ids in row-major order.
    pub fn ids(&self) -> Vec<CellId> {
        let mut positions: Vec<_> = self.positions.iter().collect();
        positions.sort_by_key(|(pos, _)| **pos);
        positions.into_iter().map(|(_, id)| *id).collect()
    }

    /// Replaces the raw text of a cell. The rendered value is left alone
    /// until the cell is committed or recalculated.
    ///
    /// # Arguments
    ///
    /// * `id` - Cell to update
    /// * `text` - New formula or literal text, stored verbatim
    pub fn set_expression(&mut self, id: CellId, text: &str) -> DomainResult<()> {
        let cell = self
            .cells
            .get_mut(&id)
            .ok_or_else(|| DomainError::UnknownCell(id.to_string()))?;
        cell.expression = text.to_string();
        Ok(())
    }

    /// Stores a rendered display value. Unknown ids are ignored.
    pub fn set_value(&mut self, id: CellId, value: String) {
        if let Some(cell) = self.cells.get_mut(&id) {
            cell.value = value;
        }
    }

    /// Records that `dependent` references `source`.
    pub fn add_dependent(&mut self, source: CellId, dependent: CellId) -> bool {
        self.cells
            .get_mut(&source)
            .is_some_and(|cell| cell.add_dependent(dependent))
    }

    /// Drops every edge pointing at `dependent`.
    pub fn remove_dependent_everywhere(&mut self, dependent: CellId) {
        for cell in self.cells.values_mut() {
            cell.remove_dependent(dependent);
        }
    }

    /// Inserts an empty row before `at`; `at == rows` appends.
    pub fn insert_row(&mut self, at: usize) -> DomainResult<()> {
        if at > self.rows {
            return Err(DomainError::RowOutOfRange(at));
        }
        self.remap(|row, col| Some(if row >= at { (row + 1, col) } else { (row, col) }));
        self.rows += 1;
        for col in 0..self.cols {
            self.materialize(at, col);
        }
        Ok(())
    }

    /// Inserts an empty column before `at`; `at == cols` appends.
    pub fn insert_column(&mut self, at: usize) -> DomainResult<()> {
        if at > self.cols {
            return Err(DomainError::ColumnOutOfRange(at));
        }
        self.remap(|row, col| Some(if col >= at { (row, col + 1) } else { (row, col) }));
        self.cols += 1;
        for row in 0..self.rows {
            self.materialize(row, at);
        }
        Ok(())
    }

    /// Destroys the row at `at`, shifting later rows up.
    ///
    /// Edges pointing at the destroyed cells are purged.
    ///
    /// # Errors
    ///
    /// Fails with [`DomainError::LastRow`] when only one row remains.
    pub fn delete_row(&mut self, at: usize) -> DomainResult<()> {
        if self.rows <= 1 {
            return Err(DomainError::LastRow);
        }
        if at >= self.rows {
            return Err(DomainError::RowOutOfRange(at));
        }
        self.remap(|row, col| match row.cmp(&at) {
            std::cmp::Ordering::Less => Some((row, col)),
            std::cmp::Ordering::Equal => None,
            std::cmp::Ordering::Greater => Some((row - 1, col)),
        });
        self.rows -= 1;
        Ok(())
    }

    /// Destroys the column at `at`, shifting later columns left.
    pub fn delete_column(&mut self, at: usize) -> DomainResult<()> {
        if self.cols <= 1 {
            return Err(DomainError::LastColumn);
        }
        if at >= self.cols {
            return Err(DomainError::ColumnOutOfRange(at));
        }
        self.remap(|row, col| match col.cmp(&at) {
            std::cmp::Ordering::Less => Some((row, col)),
            std::cmp::Ordering::Equal => None,
            std::cmp::Ordering::Greater => Some((row, col - 1)),
        });
        self.cols -= 1;
        Ok(())
    }

    fn materialize(&mut self, row: usize, col: usize) -> CellId {
        let id = CellId(self.next_id);
        self.next_id += 1;

        let name = Self::cell_name(row, col);
        self.names.insert(name.clone(), id);
        self.positions.insert((row, col), id);
        self.cells.insert(id, Cell::new(id, name));
        id
    }

    /// Moves every cell to the position `f` returns, destroying cells mapped
    /// to `None`, then renames survivors and rebuilds the name index.
    fn remap<F>(&mut self, f: F)
    where
        F: Fn(usize, usize) -> Option<(usize, usize)>,
    {
        let mut positions = HashMap::with_capacity(self.positions.len());
        let mut removed = Vec::new();

        for (&(row, col), &id) in &self.positions {
            match f(row, col) {
                Some(pos) => {
                    positions.insert(pos, id);
                }
                None => removed.push(id),
            }
        }

        for id in &removed {
            self.cells.remove(id);
        }
        for id in &removed {
            self.remove_dependent_everywhere(*id);
        }

        self.names.clear();
        for (&(row, col), &id) in &positions {
            let name = Self::cell_name(row, col);
            if let Some(cell) = self.cells.get_mut(&id) {
                cell.name = name.clone();
            }
            self.names.insert(name, id);
        }
        self.positions = positions;
    }
}
