use crate::{
    Error,
    error::{StorageError, ValidationError},
};

/// Extension trait for Result types to simplify database error mapping
///
/// Storage backends use this to log the underlying driver error and surface
/// a stable, context-bearing [`StorageError::Database`] instead.
///
/// # Example
///
/// ```rust,ignore
/// use hourglass_core::error::utilities::DatabaseResultExt;
///
/// query.execute(&pool).await.map_db_err("Failed to close session")?;
/// ```
pub trait DatabaseResultExt<T> {
    /// Log the error and convert it to a storage error carrying `context`
    fn map_db_err(self, context: &str) -> Result<T, Error>;
}

impl<T, E: std::fmt::Display> DatabaseResultExt<T> for Result<T, E> {
    fn map_db_err(self, context: &str) -> Result<T, Error> {
        self.map_err(|e| {
            tracing::error!(error = %e, "{context}");
            Error::Storage(StorageError::Database(context.to_string()))
        })
    }
}

/// Extension trait for Option types to simplify required field validation
///
/// # Example
///
/// ```rust,ignore
/// use hourglass_core::error::utilities::RequiredFieldExt;
///
/// let email = self.email.require_field("Email")?;
/// ```
pub trait RequiredFieldExt<T> {
    /// Convert None to a ValidationError::MissingField
    fn require_field(self, field_name: &str) -> Result<T, ValidationError>;
}

impl<T> RequiredFieldExt<T> for Option<T> {
    fn require_field(self, field_name: &str) -> Result<T, ValidationError> {
        self.ok_or_else(|| ValidationError::MissingField(format!("{field_name} is required")))
    }
}
