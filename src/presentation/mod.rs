//! Presentation layer handling the line-oriented front-end.
//!
//! This module parses typed commands, runs them against a workbook,
//! and renders the sheet as plain text.

pub mod ui;
pub mod input;

pub use ui::*;
pub use input::*;
