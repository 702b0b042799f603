//! Model State
//!
//! Per-request record of bound values and binding errors.

use std::collections::BTreeMap;

/// Validation state of a model or field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelValidationState {
    /// Nothing recorded for the field.
    Unvalidated,
    /// No errors.
    Valid,
    /// At least one error.
    Invalid,
}

/// Caller-safe error attached to a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelError {
    /// Error message.
    pub message: String,
}

#[derive(Debug, Clone, Default)]
struct ModelStateEntry {
    raw_value: Option<String>,
    errors: Vec<ModelError>,
}

/// Field-keyed binding results.
#[derive(Debug, Clone)]
pub struct ModelStateDictionary {
    entries: BTreeMap<String, ModelStateEntry>,
    max_allowed_errors: usize,
    error_count: usize,
    has_reached_max_errors: bool,
}

impl Default for ModelStateDictionary {
    fn default() -> Self {
        Self::with_max_errors(crate::DEFAULT_MAX_MODEL_ERRORS)
    }
}

impl ModelStateDictionary {
    /// Create dictionary with the default error limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create dictionary that stops accepting errors after `max_allowed_errors`.
    pub fn with_max_errors(max_allowed_errors: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            max_allowed_errors,
            error_count: 0,
            has_reached_max_errors: false,
        }
    }

    /// Record the raw value supplied for `key`.
    pub fn set_model_value(&mut self, key: &str, raw_value: Option<&str>) {
        self.entries.entry(key.to_string()).or_default().raw_value =
            raw_value.map(str::to_string);
    }

    /// The raw value recorded for `key`.
    pub fn raw_value(&self, key: &str) -> Option<&str> {
        self.entries.get(key)?.raw_value.as_deref()
    }

    /// Add an error for `key`. Returns `false` once the error limit has been reached.
    pub fn try_add_model_error(&mut self, key: &str, message: impl Into<String>) -> bool {
        if self.error_count >= self.max_allowed_errors {
            self.has_reached_max_errors = true;
            return false;
        }
        self.entries
            .entry(key.to_string())
            .or_default()
            .errors
            .push(ModelError {
                message: message.into(),
            });
        self.error_count += 1;
        true
    }

    /// Errors recorded for `key`.
    pub fn errors(&self, key: &str) -> &[ModelError] {
        self.entries
            .get(key)
            .map(|entry| entry.errors.as_slice())
            .unwrap_or_default()
    }

    /// Total number of errors.
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// Whether an error was dropped because of the limit.
    pub fn has_reached_max_errors(&self) -> bool {
        self.has_reached_max_errors
    }

    /// Whether no errors were recorded.
    pub fn is_valid(&self) -> bool {
        self.error_count == 0
    }

    /// State of the whole dictionary.
    pub fn validation_state(&self) -> ModelValidationState {
        if self.error_count > 0 {
            ModelValidationState::Invalid
        } else {
            ModelValidationState::Valid
        }
    }

    /// State of one field.
    pub fn field_validation_state(&self, key: &str) -> ModelValidationState {
        match self.entries.get(key) {
            None => ModelValidationState::Unvalidated,
            Some(entry) if entry.errors.is_empty() => ModelValidationState::Valid,
            Some(_) => ModelValidationState::Invalid,
        }
    }

    /// Keys with at least one entry.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}
