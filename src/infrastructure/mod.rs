//! Infrastructure layer providing external service integrations.
//!
//! This module contains file persistence for sheets and configuration.

pub mod persistence;

pub use persistence::*;
