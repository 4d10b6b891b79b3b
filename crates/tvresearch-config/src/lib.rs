//! # tvresearch Config
//!
//! Configuration management for the research pipeline: schema, TOML loading
//! with environment variable expansion, and validation.

mod error;
mod loader;
mod schema;
mod validator;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
pub use validator::{ConfigValidator, ValidationError, ValidationResult, ValidationWarning};
