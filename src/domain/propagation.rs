//! Change propagation over the dependents graph.
//!
//! An edge `A -> B` means B's formula references A and is stored as
//! `A.dependents` containing B. Committing a cell re-evaluates it and then
//! walks its dependents depth-first, refreshing each reachable cell once.

use std::collections::HashSet;

use super::config::SheetConfig;
use super::models::{CellId, Sheet};
use super::services::{process_cell, CellOutcome};

/// A cell whose rendered value was refreshed.
#[derive(Debug, Clone, PartialEq)]
pub struct CellUpdate {
    pub id: CellId,
    pub name: String,
    pub value: String,
}

impl CellUpdate {
    fn capture(sheet: &Sheet, id: CellId) -> Self {
        let (name, value) = match sheet.get(id) {
            Some(cell) => (cell.name.clone(), cell.value.clone()),
            None => (id.to_string(), String::new()),
        };
        Self { id, name, value }
    }
}

/// Result of committing one cell.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationOutcome {
    /// The committed cell.
    pub cell: CellUpdate,
    /// Cycle or missing-reference message, only when the committed cell's
    /// rendered value changed.
    pub message: Option<String>,
    /// Every dependent refreshed by the walk, in visiting order.
    pub dependents: Vec<CellUpdate>,
}

impl EvaluationOutcome {
    /// The committed cell followed by its refreshed dependents.
    pub fn updates(&self) -> impl Iterator<Item = &CellUpdate> {
        std::iter::once(&self.cell).chain(self.dependents.iter())
    }
}

/// One propagation trigger. Marker state lives only as long as the value.
pub struct Propagator<'a> {
    sheet: &'a mut Sheet,
    config: &'a SheetConfig,
    propagated: HashSet<CellId>,
    updates: Vec<CellUpdate>,
}

impl<'a> Propagator<'a> {
    /// Starts a propagation trigger with an empty marker set.
    pub fn new(sheet: &'a mut Sheet, config: &'a SheetConfig) -> Self {
        Self {
            sheet,
            config,
            propagated: HashSet::new(),
            updates: Vec::new(),
        }
    }

    /// Re-evaluates `id` with freshly rebuilt references, then refreshes
    /// every transitive dependent.
    pub fn commit(mut self, id: CellId) -> EvaluationOutcome {
        let previous = self
            .sheet
            .get(id)
            .map(|cell| cell.value.clone())
            .unwrap_or_default();

        self.sheet.remove_dependent_everywhere(id);
        let outcome = process_cell(self.sheet, id, self.config);
        let cell = CellUpdate::capture(self.sheet, id);

        let message = outcome
            .message()
            .filter(|_| cell.value != previous)
            .map(str::to_string);
        if let Some(message) = &message {
            log::warn!("{}: {}", cell.name, message);
        }
        log::debug!("committed {} = {:?}", cell.name, cell.value);

        self.propagated.insert(id);
        self.propagate(id);

        EvaluationOutcome {
            cell,
            message,
            dependents: self.updates,
        }
    }

    fn propagate(&mut self, id: CellId) {
        let dependents = match self.sheet.get(id) {
            Some(cell) => cell.dependents.clone(),
            None => return,
        };

        for dependent in dependents {
            if !self.propagated.insert(dependent) {
                continue;
            }

            process_cell(self.sheet, dependent, self.config);
            let update = CellUpdate::capture(self.sheet, dependent);
            log::debug!("propagated to {} = {:?}", update.name, update.value);
            self.updates.push(update);

            self.propagate(dependent);
        }
    }
}

/// Commits `id` and propagates the change to its dependents.
///
/// # Examples
///
/// ```
/// use cellsheet::domain::{commit, Sheet, SheetConfig};
///
/// let config = SheetConfig::default();
/// let mut sheet = Sheet::new(1, 2);
/// let a1 = sheet.lookup("A1").unwrap();
/// let b1 = sheet.lookup("B1").unwrap();
///
/// sheet.set_expression(b1, "A1 + 1").unwrap();
/// commit(&mut sheet, b1, &config);
///
/// sheet.set_expression(a1, "5").unwrap();
/// let outcome = commit(&mut sheet, a1, &config);
/// assert_eq!(outcome.cell.value, "5");
/// assert_eq!(outcome.dependents[0].value, "6");
/// ```
pub fn commit(sheet: &mut Sheet, id: CellId, config: &SheetConfig) -> EvaluationOutcome {
    Propagator::new(sheet, config).commit(id)
}

/// Re-evaluates every cell once, in row-major order, ignoring the existing
/// dependents graph, which is rebuilt from scratch as a side effect.
///
/// Cells that show another cell's value verbatim are settled afterwards so
/// the result does not depend on evaluation order.
pub fn recalculate_all(sheet: &mut Sheet, config: &SheetConfig) -> Vec<CellUpdate> {
    let ids = sheet.ids();
    for &id in &ids {
        if let Some(cell) = sheet.get_mut(id) {
            cell.dependents.clear();
        }
    }

    let mut passthrough = Vec::new();
    for &id in &ids {
        if let CellOutcome::Passthrough { source, .. } = process_cell(sheet, id, config) {
            passthrough.push((id, source));
        }
    }

    for _ in 0..passthrough.len() {
        let mut changed = false;
        for (id, source) in &passthrough {
            let Some(value) = sheet.cell_by_name(source).map(|cell| cell.value.clone()) else {
                continue;
            };
            if sheet.get(*id).is_some_and(|cell| cell.value != value) {
                sheet.set_value(*id, value);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    log::debug!("recalculated {} cells", ids.len());
    ids.into_iter()
        .map(|id| CellUpdate::capture(sheet, id))
        .collect()
}
