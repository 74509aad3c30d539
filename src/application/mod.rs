//! Application layer managing workbook state and editing workflows.
//!
//! This module coordinates between the domain layer and the front-end,
//! tracking session state around the sheet being edited.

pub mod state;

pub use state::*;
