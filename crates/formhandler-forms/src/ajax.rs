//! Single-field validation for asynchronous requests
//!
//! A page can validate one field while the user is still filling in the
//! form. The dispatcher looks the field up by name, runs the submitted value
//! through the encoding filter and the field's own cleaning, and answers
//! with a JSON verdict.

use crate::encoding::EncodingFilter;
use crate::field::FormField;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Incoming request: which field, and what the user typed so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AjaxValidationRequest {
	pub field: String,
	#[serde(default)]
	pub value: Value,
}

/// Verdict for one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AjaxValidationResponse {
	pub field: String,
	pub valid: bool,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub errors: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
	#[error("no field named '{0}' is registered")]
	UnknownField(String),
	#[error("malformed validation request: {0}")]
	Decode(#[from] serde_json::Error),
}

/// Routes validation requests to registered fields.
///
/// # Examples
///
/// ```
/// use formhandler_forms::ajax::{AjaxDispatcher, AjaxValidationRequest};
/// use formhandler_forms::fields::UploadField;
/// use serde_json::json;
///
/// let dispatcher = AjaxDispatcher::new().register(UploadField::new("cv").required());
/// let response = dispatcher
///     .dispatch(&AjaxValidationRequest { field: "cv".to_string(), value: json!(null) })
///     .unwrap();
/// assert!(!response.valid);
/// ```
#[derive(Default)]
pub struct AjaxDispatcher {
	fields: Vec<Box<dyn FormField>>,
	filter: Option<Box<dyn EncodingFilter>>,
}

impl AjaxDispatcher {
	pub fn new() -> Self {
		Self::default()
	}

	/// Filter applied to every string value before cleaning
	pub fn with_filter(mut self, filter: Box<dyn EncodingFilter>) -> Self {
		self.filter = Some(filter);
		self
	}

	/// Add a field; a later field with the same name shadows an earlier one
	pub fn register(mut self, field: impl FormField + 'static) -> Self {
		self.fields.push(Box::new(field));
		self
	}

	pub fn register_boxed(mut self, field: Box<dyn FormField>) -> Self {
		self.fields.push(field);
		self
	}

	pub fn field(&self, name: &str) -> Option<&dyn FormField> {
		self.fields
			.iter()
			.rev()
			.find(|field| field.name() == name)
			.map(|field| field.as_ref())
	}

	/// Validate one field value
	pub fn dispatch(
		&self,
		request: &AjaxValidationRequest,
	) -> Result<AjaxValidationResponse, DispatchError> {
		let field = self
			.field(&request.field)
			.ok_or_else(|| DispatchError::UnknownField(request.field.clone()))?;

		let value = self.apply_filter(&request.value);
		let input = (!value.is_null()).then_some(&value);

		let response = match field.clean(input) {
			Ok(_) => AjaxValidationResponse {
				field: request.field.clone(),
				valid: true,
				errors: Vec::new(),
			},
			Err(e) => AjaxValidationResponse {
				field: request.field.clone(),
				valid: false,
				errors: vec![e.to_string()],
			},
		};

		tracing::debug!(
			field = %response.field,
			valid = response.valid,
			"ajax field validation"
		);
		Ok(response)
	}

	/// Decode a JSON request body, validate, and encode the verdict
	///
	/// # Examples
	///
	/// ```
	/// use formhandler_forms::ajax::AjaxDispatcher;
	/// use formhandler_forms::fields::UploadField;
	///
	/// let dispatcher = AjaxDispatcher::new().register(UploadField::new("cv"));
	/// let body = dispatcher.dispatch_json(r#"{"field": "cv"}"#).unwrap();
	/// assert_eq!(body, r#"{"field":"cv","valid":true}"#);
	/// ```
	pub fn dispatch_json(&self, body: &str) -> Result<String, DispatchError> {
		let request: AjaxValidationRequest = serde_json::from_str(body)?;
		let response = self.dispatch(&request)?;
		Ok(serde_json::to_string(&response)?)
	}

	/// Run raw request bytes through the filter, then [`Self::dispatch_json`]
	///
	/// Invalid UTF-8 in the body is replaced by the filter before decoding,
	/// so a stray byte in a value does not reject the whole request.
	pub fn dispatch_body(&self, body: &[u8]) -> Result<String, DispatchError> {
		let body = match &self.filter {
			Some(filter) => filter.filter(body),
			None => String::from_utf8_lossy(body).into_owned(),
		};
		self.dispatch_json(&body)
	}

	// JSON strings are valid UTF-8 already; here the filter only normalizes.
	fn apply_filter(&self, value: &Value) -> Value {
		let Some(filter) = &self.filter else {
			return value.clone();
		};
		match value {
			Value::String(s) => Value::String(filter.filter(s.as_bytes())),
			Value::Array(items) => Value::Array(
				items
					.iter()
					.map(|item| match item {
						Value::String(s) => Value::String(filter.filter(s.as_bytes())),
						other => other.clone(),
					})
					.collect(),
			),
			other => other.clone(),
		}
	}
}
