//! Upload configuration
//!
//! The size-limit and placement calls never read process state. Callers load
//! an [`UploadSettings`] once and pass it in.

use crate::errors::SettingsError;
use crate::size::effective_max_upload_size;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Upload limits as configured by the deployment.
///
/// Size values stay raw strings so that a malformed value can be ignored at
/// use time instead of failing the whole settings load.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadSettings {
	/// Whether the transport accepts file uploads at all
	#[serde(default = "default_uploads_enabled")]
	pub uploads_enabled: bool,

	/// Ceiling for a single uploaded file, e.g. `"2M"`
	#[serde(default = "default_upload_max_filesize")]
	pub upload_max_filesize: String,

	/// Ceiling for the whole request body, e.g. `"8M"`
	#[serde(default = "default_post_max_size")]
	pub post_max_size: String,
}

fn default_uploads_enabled() -> bool {
	true
}

fn default_upload_max_filesize() -> String {
	"2M".to_string()
}

fn default_post_max_size() -> String {
	"8M".to_string()
}

impl Default for UploadSettings {
	fn default() -> Self {
		Self {
			uploads_enabled: default_uploads_enabled(),
			upload_max_filesize: default_upload_max_filesize(),
			post_max_size: default_post_max_size(),
		}
	}
}

impl UploadSettings {
	/// Create settings with the given values
	///
	/// # Examples
	///
	/// ```
	/// use formhandler_uploads::UploadSettings;
	///
	/// let settings = UploadSettings::new(true, "5m", "2m");
	/// assert_eq!(settings.effective_max_upload_size(), 2 * 1024 * 1024);
	/// ```
	pub fn new(
		uploads_enabled: bool,
		upload_max_filesize: impl Into<String>,
		post_max_size: impl Into<String>,
	) -> Self {
		Self {
			uploads_enabled,
			upload_max_filesize: upload_max_filesize.into(),
			post_max_size: post_max_size.into(),
		}
	}

	/// Settings with uploads switched off
	pub fn disabled() -> Self {
		Self {
			uploads_enabled: false,
			..Self::default()
		}
	}

	/// The binding per-file limit in bytes, `0` when uploads are refused.
	pub fn effective_max_upload_size(&self) -> u64 {
		effective_max_upload_size(
			self.uploads_enabled,
			&self.upload_max_filesize,
			&self.post_max_size,
		)
	}

	/// Build settings from ini-style key/value pairs.
	///
	/// Recognised keys are `file_uploads`, `upload_max_filesize` and
	/// `post_max_size`; other keys are skipped. Flag values `1`, `on`, `yes`
	/// and `true` enable uploads.
	///
	/// # Examples
	///
	/// ```
	/// use formhandler_uploads::UploadSettings;
	///
	/// let settings = UploadSettings::from_pairs([
	///     ("file_uploads", "Off"),
	///     ("upload_max_filesize", "10M"),
	/// ]);
	/// assert!(!settings.uploads_enabled);
	/// assert_eq!(settings.upload_max_filesize, "10M");
	/// ```
	pub fn from_pairs<I, K, V>(pairs: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: AsRef<str>,
		V: AsRef<str>,
	{
		let mut settings = Self::default();
		for (key, value) in pairs {
			let value = value.as_ref().trim();
			match key.as_ref().trim() {
				"file_uploads" => {
					settings.uploads_enabled = matches!(
						value.to_ascii_lowercase().as_str(),
						"1" | "on" | "yes" | "true"
					);
				}
				"upload_max_filesize" => settings.upload_max_filesize = value.to_string(),
				"post_max_size" => settings.post_max_size = value.to_string(),
				_ => {}
			}
		}
		settings
	}

	/// Load settings from a `.toml` or `.json` file
	pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
		let path = path.into();
		let contents = std::fs::read_to_string(&path).map_err(|e| {
			SettingsError::FileError(format!("Failed to read {}: {}", path.display(), e))
		})?;

		match path.extension().and_then(|s| s.to_str()) {
			Some("toml") => toml::from_str(&contents)
				.map_err(|e| SettingsError::ParseError(format!("TOML parse error: {}", e))),
			Some("json") => serde_json::from_str(&contents)
				.map_err(|e| SettingsError::ParseError(format!("JSON parse error: {}", e))),
			_ => Err(SettingsError::UnsupportedFormat(
				"Supported formats: .toml, .json".to_string(),
			)),
		}
	}
}
