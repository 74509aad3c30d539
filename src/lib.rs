//! CellSheet - Spreadsheet Evaluation Library
//!
//! A spreadsheet cell-expression evaluator with automatic dependency tracking
//! and change propagation, built in Rust.

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
pub use application::*;
