//! Configuration check.

use std::path::Path;

use tvresearch_config::{ConfigLoader, ConfigValidator};

/// Load and validate a configuration file, printing every finding.
pub(crate) fn check_config(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigLoader::load(path)?;
    let result = ConfigValidator::validate(&config)?;

    for warning in &result.warnings {
        println!("warning: {}: {}", warning.path, warning.message);
    }
    for error in &result.errors {
        println!("error: {}: {}", error.path, error.message);
    }

    if result.is_valid() {
        println!("{}: OK", path.display());
        Ok(())
    } else {
        Err(format!("{} has {} error(s)", path.display(), result.errors.len()).into())
    }
}
