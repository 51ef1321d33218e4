//! Configuration validation.

use crate::schema::Config;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();
        Self::validate_server(config, &mut result);
        Self::validate_queue(config, &mut result);
        Self::validate_dispatch(config, &mut result);
        result
    }

    fn validate_server(config: &Config, result: &mut ValidationResult) {
        if config.server.port == 0 {
            result.add_error(ValidationError::new("server.port", "Port cannot be 0"));
        }

        if config.server.host.is_empty() {
            result.add_error(ValidationError::new("server.host", "Host cannot be empty"));
        }
    }

    fn validate_queue(config: &Config, result: &mut ValidationResult) {
        if config.queue.tick_interval_ms == 0 {
            result.add_error(ValidationError::new(
                "queue.tick_interval_ms",
                "tick_interval_ms must be greater than 0",
            ));
        }

        if config.queue.workspace.is_empty() {
            result.add_error(ValidationError::new(
                "queue.workspace",
                "workspace cannot be empty",
            ));
        }

        if config.queue.retain {
            result.add_warning(ValidationWarning::new(
                "queue.retain",
                "completed jobs are kept; the snapshot grows without bound",
            ));
        }
    }

    fn validate_dispatch(config: &Config, result: &mut ValidationResult) {
        if config.dispatch.timeout_seconds == 0 {
            result.add_error(ValidationError::new(
                "dispatch.timeout_seconds",
                "timeout_seconds must be greater than 0",
            ));
        }

        if config.dispatch.max_response_bytes == 0 {
            result.add_error(ValidationError::new(
                "dispatch.max_response_bytes",
                "max_response_bytes must be greater than 0",
            ));
        }
    }
}
