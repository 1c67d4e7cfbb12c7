use crate::field::{FieldError, FieldResult, FormField};
use formhandler_uploads::{
	FileSystem, PendingUpload, PlacementPolicy, PlacementResult, UploadDescriptor,
	UploadErrorCode, UploadPlacer, UploadResult, UploadSettings, UploadTransport, file_extension,
	format_size,
};
use serde_json::Value;
use std::path::Path;

/// Field for one uploaded file, or several when `multiple` is set.
///
/// The submitted value is a descriptor object (an array of them for a
/// multiple field) as produced by the request layer:
///
/// ```json
/// { "temp_path": "/tmp/php1a2b", "filename": "cv.pdf", "size": 1024, "error": 0 }
/// ```
///
/// Cleaning checks the transport status, emptiness, the size ceiling and the
/// extension allow-list. Placing the cleaned upload on disk is done with
/// [`UploadField::save`].
#[derive(Debug, Clone)]
pub struct UploadField {
	pub name: String,
	pub label: Option<String>,
	pub required: bool,
	pub help_text: Option<String>,
	pub multiple: bool,
	pub max_size: Option<u64>,
	/// Lower-case extensions without the dot; empty allows everything
	pub allowed_extensions: Vec<String>,
	pub max_length: Option<usize>,
	pub allow_empty_file: bool,
	pub policy: PlacementPolicy,
	pub create_dir_if_missing: bool,
}

impl UploadField {
	/// Create a new UploadField
	///
	/// # Examples
	///
	/// ```
	/// use formhandler_forms::fields::UploadField;
	/// use formhandler_uploads::PlacementPolicy;
	///
	/// let field = UploadField::new("attachment");
	/// assert_eq!(field.name, "attachment");
	/// assert!(!field.required);
	/// assert_eq!(field.policy, PlacementPolicy::Overwrite);
	/// ```
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			label: None,
			required: false,
			help_text: None,
			multiple: false,
			max_size: None,
			allowed_extensions: Vec::new(),
			max_length: None,
			allow_empty_file: false,
			policy: PlacementPolicy::Overwrite,
			create_dir_if_missing: false,
		}
	}

	pub fn required(mut self) -> Self {
		self.required = true;
		self
	}

	/// Accept an array of files for this field
	pub fn multiple(mut self) -> Self {
		self.multiple = true;
		self
	}

	pub fn with_label(mut self, label: impl Into<String>) -> Self {
		self.label = Some(label.into());
		self
	}

	pub fn with_help_text(mut self, help_text: impl Into<String>) -> Self {
		self.help_text = Some(help_text.into());
		self
	}

	pub fn with_max_size(mut self, bytes: u64) -> Self {
		self.max_size = Some(bytes);
		self
	}

	/// Limit uploads to the effective maximum of the given settings
	///
	/// # Examples
	///
	/// ```
	/// use formhandler_forms::fields::UploadField;
	/// use formhandler_uploads::UploadSettings;
	///
	/// let field = UploadField::new("cv").with_settings(&UploadSettings::new(true, "5m", "2m"));
	/// assert_eq!(field.max_size, Some(2 * 1024 * 1024));
	/// ```
	pub fn with_settings(self, settings: &UploadSettings) -> Self {
		self.with_max_size(settings.effective_max_upload_size())
	}

	/// Restrict accepted extensions (case-insensitive, leading dot optional)
	pub fn with_allowed_extensions<I, S>(mut self, extensions: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		self.allowed_extensions = extensions
			.into_iter()
			.map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
			.collect();
		self
	}

	/// Maximum length of the declared filename
	pub fn with_max_length(mut self, max_length: usize) -> Self {
		self.max_length = Some(max_length);
		self
	}

	pub fn with_allow_empty_file(mut self, allow: bool) -> Self {
		self.allow_empty_file = allow;
		self
	}

	pub fn with_policy(mut self, policy: PlacementPolicy) -> Self {
		self.policy = policy;
		self
	}

	pub fn with_create_dir(mut self, create: bool) -> Self {
		self.create_dir_if_missing = create;
		self
	}

	/// Decode the submitted value into the pending upload(s).
	///
	/// Entries the transport reports as [`UploadErrorCode::NoFile`], or with
	/// an empty filename, count as absent. Returns `None` when nothing is left.
	pub fn pending(&self, value: &Value) -> FieldResult<Option<PendingUpload>> {
		if value.is_null() {
			return Ok(None);
		}

		if self.multiple {
			let descriptors: Vec<UploadDescriptor> = match value {
				Value::Array(_) => serde_json::from_value(value.clone()),
				_ => serde_json::from_value(value.clone()).map(|d| vec![d]),
			}
			.map_err(|e| FieldError::Invalid(format!("Invalid upload data: {}", e)))?;

			let present: Vec<UploadDescriptor> =
				descriptors.into_iter().filter(is_present).collect();
			if present.is_empty() {
				return Ok(None);
			}
			return Ok(Some(PendingUpload::Multiple(present)));
		}

		if value.is_array() {
			return Err(FieldError::Invalid(
				"Expected a single file, got several".to_string(),
			));
		}
		let descriptor: UploadDescriptor = serde_json::from_value(value.clone())
			.map_err(|e| FieldError::Invalid(format!("Invalid upload data: {}", e)))?;
		Ok(is_present(&descriptor).then_some(PendingUpload::Single(descriptor)))
	}

	fn validate_descriptor(&self, descriptor: &UploadDescriptor) -> FieldResult<()> {
		if !descriptor.error.is_ok() {
			return Err(FieldError::Validation(descriptor.error.message().to_string()));
		}

		if let Some(max) = self.max_length
			&& descriptor.filename.len() > max
		{
			return Err(FieldError::Validation(format!(
				"Filename is too long (max {} characters)",
				max
			)));
		}

		if !self.allow_empty_file && descriptor.size == 0 {
			return Err(FieldError::Validation(
				"The submitted file is empty".to_string(),
			));
		}

		match self.max_size {
			Some(0) => {
				return Err(FieldError::Validation(
					"File uploads are disabled".to_string(),
				));
			}
			Some(max) if descriptor.size > max => {
				return Err(FieldError::Validation(format!(
					"The file '{}' exceeds the maximum size of {}",
					descriptor.filename,
					format_size(max)
				)));
			}
			_ => {}
		}

		if !self.allowed_extensions.is_empty() {
			let extension = file_extension(&descriptor.filename);
			let allowed = extension
				.as_ref()
				.is_some_and(|ext| self.allowed_extensions.contains(ext));
			if !allowed {
				return Err(FieldError::Validation(format!(
					"Files of type '{}' are not allowed (allowed: {})",
					extension.unwrap_or_default(),
					self.allowed_extensions.join(", ")
				)));
			}
		}

		Ok(())
	}

	/// Place a cleaned upload on the local disk using the field's policy
	pub fn save(
		&self,
		pending: &PendingUpload,
		destination: impl AsRef<Path>,
	) -> UploadResult<PlacementResult> {
		self.save_with(&UploadPlacer::local(), pending, destination)
	}

	/// Place a cleaned upload through the given placer
	pub fn save_with<F: FileSystem, T: UploadTransport>(
		&self,
		placer: &UploadPlacer<F, T>,
		pending: &PendingUpload,
		destination: impl AsRef<Path>,
	) -> UploadResult<PlacementResult> {
		tracing::debug!(
			field = %self.name,
			files = pending.len(),
			policy = %self.policy,
			"saving upload"
		);
		placer.move_pending(
			pending,
			destination,
			self.policy,
			self.create_dir_if_missing,
		)
	}
}

fn is_present(descriptor: &UploadDescriptor) -> bool {
	descriptor.error != UploadErrorCode::NoFile && !descriptor.filename.is_empty()
}

impl FormField for UploadField {
	fn name(&self) -> &str {
		&self.name
	}

	fn label(&self) -> Option<&str> {
		self.label.as_deref()
	}

	fn required(&self) -> bool {
		self.required
	}

	fn help_text(&self) -> Option<&str> {
		self.help_text.as_deref()
	}

	fn clean(&self, value: Option<&Value>) -> FieldResult<Value> {
		let pending = match value {
			Some(v) => self.pending(v)?,
			None => None,
		};

		let Some(pending) = pending else {
			if self.required {
				return Err(FieldError::required(None));
			}
			return Ok(Value::Null);
		};

		for descriptor in pending.descriptors() {
			self.validate_descriptor(descriptor)?;
		}

		serde_json::to_value(&pending).map_err(|e| FieldError::Invalid(e.to_string()))
	}
}
