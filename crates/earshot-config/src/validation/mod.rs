//! Full configuration validation.
//!
//! Each section has its own check; this orchestrator runs them all and
//! collects the errors into a single `ConfigError`.

mod helpers;
mod sections;


use crate::schema::EarshotConfig;
use earshot_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &EarshotConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    sections::validate_identity(&mut errors, config);
    sections::validate_hub(&mut errors, config);
    sections::validate_session(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
