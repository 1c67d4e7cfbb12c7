//! Pluggable encoding filters for submitted values
//!
//! A filter turns the raw bytes of a submitted value into the string the
//! fields validate. Variants are looked up by name in a [`FilterRegistry`].

use crate::context::FormContext;
use std::collections::HashMap;

const BOM: &[u8] = b"\xEF\xBB\xBF";

/// Capability every encoding filter provides.
pub trait EncodingFilter: Send + Sync {
	/// Called once with the form the filter is attached to
	fn initialize(&mut self, ctx: &FormContext);

	fn filter(&self, value: &[u8]) -> String;
}

#[derive(Debug, thiserror::Error)]
pub enum FilterError {
	#[error("unknown encoding filter: '{0}'")]
	UnknownFilter(String),
}

/// Enforces UTF-8: invalid sequences become U+FFFD and a leading
/// byte-order mark is dropped.
///
/// Replacement only happens on raw bytes, such as a request body handed to
/// [`AjaxDispatcher::dispatch_body`](crate::ajax::AjaxDispatcher::dispatch_body).
/// Values that are already Rust strings are valid UTF-8, so for them only
/// the byte-order mark is stripped.
///
/// # Examples
///
/// ```
/// use formhandler_forms::encoding::{EncodingFilter, Utf8Filter};
///
/// let filter = Utf8Filter::new();
/// assert_eq!(filter.filter(b"caf\xC3\xA9"), "café");
/// assert_eq!(filter.filter(b"bad\xFF"), "bad\u{FFFD}");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Utf8Filter {
	charset: Option<String>,
}

impl Utf8Filter {
	pub fn new() -> Self {
		Self::default()
	}

	/// Charset recorded at initialization, if any
	pub fn charset(&self) -> Option<&str> {
		self.charset.as_deref()
	}
}

impl EncodingFilter for Utf8Filter {
	fn initialize(&mut self, ctx: &FormContext) {
		if !ctx.is_utf8() {
			tracing::warn!(
				form = %ctx.form_name,
				charset = %ctx.charset,
				"form declares a non-UTF-8 charset, values will be decoded as UTF-8"
			);
		}
		self.charset = Some(ctx.charset.clone());
	}

	fn filter(&self, value: &[u8]) -> String {
		let value = value.strip_prefix(BOM).unwrap_or(value);
		String::from_utf8_lossy(value).into_owned()
	}
}

/// Decodes without any further normalization.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughFilter;

impl EncodingFilter for PassthroughFilter {
	fn initialize(&mut self, _ctx: &FormContext) {}

	fn filter(&self, value: &[u8]) -> String {
		String::from_utf8_lossy(value).into_owned()
	}
}

type FilterFactory = Box<dyn Fn() -> Box<dyn EncodingFilter> + Send + Sync>;

/// Named encoding filter variants.
///
/// # Examples
///
/// ```
/// use formhandler_forms::FormContext;
/// use formhandler_forms::encoding::FilterRegistry;
///
/// let registry = FilterRegistry::default();
/// let filter = registry.create("UTF-8", &FormContext::new("contact")).unwrap();
/// assert_eq!(filter.filter(b"\xEF\xBB\xBFhi"), "hi");
/// assert!(registry.create("ebcdic", &FormContext::new("contact")).is_err());
/// ```
pub struct FilterRegistry {
	factories: HashMap<String, FilterFactory>,
}

impl FilterRegistry {
	/// A registry with no variants
	pub fn empty() -> Self {
		Self {
			factories: HashMap::new(),
		}
	}

	/// Register a variant under a case-insensitive name, replacing any
	/// earlier one with the same name
	pub fn register<F>(&mut self, name: impl AsRef<str>, factory: F)
	where
		F: Fn() -> Box<dyn EncodingFilter> + Send + Sync + 'static,
	{
		self.factories
			.insert(name.as_ref().to_ascii_lowercase(), Box::new(factory));
	}

	pub fn contains(&self, name: &str) -> bool {
		self.factories.contains_key(&name.to_ascii_lowercase())
	}

	/// Build the named filter and initialize it for `ctx`
	pub fn create(
		&self,
		name: &str,
		ctx: &FormContext,
	) -> Result<Box<dyn EncodingFilter>, FilterError> {
		let factory = self
			.factories
			.get(&name.to_ascii_lowercase())
			.ok_or_else(|| FilterError::UnknownFilter(name.to_string()))?;
		let mut filter = factory();
		filter.initialize(ctx);
		Ok(filter)
	}

	/// Registered names, sorted
	pub fn names(&self) -> Vec<&str> {
		let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
		names.sort_unstable();
		names
	}
}

impl Default for FilterRegistry {
	fn default() -> Self {
		let mut registry = Self::empty();
		registry.register("utf-8", || Box::new(Utf8Filter::new()));
		registry.register("utf8", || Box::new(Utf8Filter::new()));
		registry.register("none", || Box::new(PassthroughFilter));
		registry
	}
}
