//! The field contract shared by the form object graph

use serde_json::Value;

/// Error produced while cleaning a single field value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
	#[error("{0}")]
	Required(String),
	#[error("{0}")]
	Invalid(String),
	#[error("{0}")]
	Validation(String),
}

impl FieldError {
	/// A required-field error with an optional custom message
	///
	/// # Examples
	///
	/// ```
	/// use formhandler_forms::FieldError;
	///
	/// let err = FieldError::required(None);
	/// assert_eq!(err.to_string(), "This field is required");
	/// ```
	pub fn required(message: Option<&str>) -> Self {
		Self::Required(message.unwrap_or("This field is required").to_string())
	}
}

pub type FieldResult<T> = Result<T, FieldError>;

/// A form field that can clean a submitted value.
///
/// Rendering is not part of this contract; fields only describe themselves
/// and validate.
pub trait FormField: Send + Sync {
	fn name(&self) -> &str;

	fn label(&self) -> Option<&str> {
		None
	}

	fn required(&self) -> bool;

	fn help_text(&self) -> Option<&str> {
		None
	}

	fn initial(&self) -> Option<&Value> {
		None
	}

	/// Validates and normalizes a submitted value
	fn clean(&self, value: Option<&Value>) -> FieldResult<Value>;
}
