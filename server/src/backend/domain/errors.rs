use shared::validation::describe_errors;
use shared::FieldError;
use thiserror::Error;

/// Failures a caller can act on. Anything else travelling through
/// `anyhow::Error` is treated as an internal fault.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(errors: Vec<FieldError>) -> Self {
        DomainError::Validation(describe_errors(&errors))
    }

    pub fn not_found(what: &str) -> Self {
        DomainError::NotFound(format!("{} not found", what))
    }
}

/// Turn a form validation result into a domain error
pub fn validated(result: Result<(), Vec<FieldError>>) -> Result<(), DomainError> {
    result.map_err(DomainError::validation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::ValidationError;

    #[test]
    fn test_validation_message_lists_fields() {
        let err = DomainError::validation(vec![
            FieldError { field: "title".to_string(), error: ValidationError::Required },
            FieldError { field: "points".to_string(), error: ValidationError::OutOfRange { min: 0.0, max: 100_000.0 } },
        ]);
        let message = err.to_string();
        assert!(message.starts_with("title is required; points"));
    }

    #[test]
    fn test_domain_error_survives_anyhow() {
        let err: anyhow::Error = DomainError::not_found("Chore").into();
        assert_eq!(err.downcast_ref::<DomainError>(), Some(&DomainError::NotFound("Chore not found".to_string())));
    }
}
