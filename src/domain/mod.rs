pub mod models;
pub mod parser;
pub mod services;
pub mod propagation;
pub mod config;
pub mod errors;

pub use models::*;
pub use parser::*;
pub use services::*;
pub use propagation::*;
pub use config::*;
pub use errors::*;
