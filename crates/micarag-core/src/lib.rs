//! Shared domain types, capability traits, errors and configuration for the
//! MiCA question-answering pipeline.

pub mod config;
pub mod error;
pub mod records;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
