//! Input validation for request builders.

use crate::error::ProtoError;

/// Maximum number of replicas a single lambda run may request.
pub const MAX_LAMBDA_COUNT: u32 = 1024;

/// Validation error with detailed information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The field that failed validation.
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl ValidationError {
    /// Create a new validation error.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for ProtoError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e.to_string())
    }
}

/// Accumulates validation errors across several fields.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    errors: Vec<ValidationError>,
}

impl ValidationResult {
    /// Create a new empty validation result.
    #[must_use]
    pub const fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// Record the error of a failed check, if any.
    pub fn check(&mut self, outcome: Result<(), ValidationError>) {
        if let Err(e) = outcome {
            self.errors.push(e);
        }
    }

    /// Get all errors.
    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Convert to Result, returning the first error if there is one.
    ///
    /// # Errors
    ///
    /// Returns the first validation error if validation failed.
    pub fn into_result(self) -> Result<(), ValidationError> {
        self.errors.into_iter().next().map_or(Ok(()), Err)
    }
}

/// Validate a non-empty identifier without whitespace.
///
/// # Errors
///
/// Returns an error if the value is empty or contains whitespace.
pub fn validate_name(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::new(field, "cannot be empty"));
    }
    if value.contains(char::is_whitespace) {
        return Err(ValidationError::new(field, "cannot contain whitespace"));
    }
    Ok(())
}

/// Validate a container image reference.
///
/// # Errors
///
/// Returns an error if the image reference is invalid.
pub fn validate_image(image: &str) -> Result<(), ValidationError> {
    validate_name("image", image)?;

    let name_tag = image.rsplit('/').next().unwrap_or_default();
    if name_tag.is_empty() || image.starts_with(':') || image.starts_with('@') {
        return Err(ValidationError::new(
            "image",
            "image must have a name component",
        ));
    }
    Ok(())
}

/// Validate an environment variable key.
///
/// # Errors
///
/// Returns an error if the key is empty or contains `=` or NUL.
pub fn validate_env_key(key: &str) -> Result<(), ValidationError> {
    if key.is_empty() {
        return Err(ValidationError::new("env", "key cannot be empty"));
    }
    if key.contains('=') || key.contains('\0') {
        return Err(ValidationError::new(
            "env",
            format!("invalid key '{key}'"),
        ));
    }
    Ok(())
}

/// Validate a lambda replica count.
///
/// # Errors
///
/// Returns an error if the count is zero or above [`MAX_LAMBDA_COUNT`].
pub fn validate_count(count: u32) -> Result<(), ValidationError> {
    if count == 0 {
        return Err(ValidationError::new("count", "must be at least 1"));
    }
    if count > MAX_LAMBDA_COUNT {
        return Err(ValidationError::new(
            "count",
            format!("must not exceed {MAX_LAMBDA_COUNT}"),
        ));
    }
    Ok(())
}

/// Split a `KEY=VALUE` argument.
///
/// # Errors
///
/// Returns an error if there is no `=` or the key is invalid.
pub fn parse_env_pair(pair: &str) -> Result<(String, String), ValidationError> {
    let (key, value) = pair.split_once('=').ok_or_else(|| {
        ValidationError::new(
            "env",
            format!("invalid environment variable format: {pair}, expected KEY=VALUE"),
        )
    })?;
    validate_env_key(key)?;
    Ok((key.to_string(), value.to_string()))
}
