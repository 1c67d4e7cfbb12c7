//! Form-level context handed to pluggable components

/// What a filter or dispatcher may know about the surrounding form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormContext {
	pub form_name: String,
	/// Declared character set of submitted data, lower-cased
	pub charset: String,
}

impl FormContext {
	/// Create a context for the named form with the default `utf-8` charset
	///
	/// # Examples
	///
	/// ```
	/// use formhandler_forms::FormContext;
	///
	/// let ctx = FormContext::new("signup").with_charset("UTF-8");
	/// assert_eq!(ctx.charset, "utf-8");
	/// assert!(ctx.is_utf8());
	/// ```
	pub fn new(form_name: impl Into<String>) -> Self {
		Self {
			form_name: form_name.into(),
			charset: "utf-8".to_string(),
		}
	}

	pub fn with_charset(mut self, charset: impl AsRef<str>) -> Self {
		self.charset = charset.as_ref().trim().to_ascii_lowercase();
		self
	}

	pub fn is_utf8(&self) -> bool {
		matches!(self.charset.as_str(), "utf-8" | "utf8")
	}
}

impl Default for FormContext {
	fn default() -> Self {
		Self::new("form")
	}
}
