#![allow(clippy::result_large_err)]

use super::FlowguardConfig;
use crate::core::error::AppError;

pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration rules
    pub fn validate(config: &FlowguardConfig) -> Result<(), AppError> {
        if config.versions.max_versions == 0 {
            return Err(AppError::new(
                crate::core::types::ErrorCategory::ConfigError,
                "versions.max_versions must be at least 1",
            )
            .with_code("FG-CFG-001"));
        }

        if config.versions.root.as_os_str().is_empty() {
            return Err(AppError::new(
                crate::core::types::ErrorCategory::ConfigError,
                "versions.root cannot be empty",
            )
            .with_code("FG-CFG-001"));
        }

        Ok(())
    }
}
