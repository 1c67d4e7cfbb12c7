//! Pending upload metadata handed over by the request layer

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Per-file status reported by the upload transport.
///
/// Serialized as the transport's numeric code (`0` is success).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum UploadErrorCode {
	#[default]
	Ok,
	/// Larger than the server-wide per-file ceiling
	IniSize,
	/// Larger than the limit declared by the form
	FormSize,
	/// Only part of the file arrived
	Partial,
	/// No file was sent for the field
	NoFile,
	/// The server has no temporary directory
	NoTmpDir,
	/// The temporary file could not be written
	CantWrite,
	/// A server extension stopped the upload
	Extension,
}

impl UploadErrorCode {
	/// Numeric transport code
	pub fn code(self) -> u8 {
		match self {
			Self::Ok => 0,
			Self::IniSize => 1,
			Self::FormSize => 2,
			Self::Partial => 3,
			Self::NoFile => 4,
			Self::NoTmpDir => 6,
			Self::CantWrite => 7,
			Self::Extension => 8,
		}
	}

	/// Message suitable for showing next to the field
	pub fn message(self) -> &'static str {
		match self {
			Self::Ok => "The file was uploaded successfully",
			Self::IniSize => "The uploaded file exceeds the maximum upload size",
			Self::FormSize => "The uploaded file exceeds the maximum size allowed by the form",
			Self::Partial => "The uploaded file was only partially uploaded",
			Self::NoFile => "No file was uploaded",
			Self::NoTmpDir => "Missing a temporary folder",
			Self::CantWrite => "Failed to write the file to disk",
			Self::Extension => "The upload was stopped by a server extension",
		}
	}

	pub fn is_ok(self) -> bool {
		self == Self::Ok
	}
}

impl TryFrom<u8> for UploadErrorCode {
	type Error = String;

	fn try_from(code: u8) -> Result<Self, Self::Error> {
		match code {
			0 => Ok(Self::Ok),
			1 => Ok(Self::IniSize),
			2 => Ok(Self::FormSize),
			3 => Ok(Self::Partial),
			4 => Ok(Self::NoFile),
			6 => Ok(Self::NoTmpDir),
			7 => Ok(Self::CantWrite),
			8 => Ok(Self::Extension),
			other => Err(format!("unknown upload error code: {}", other)),
		}
	}
}

impl From<UploadErrorCode> for u8 {
	fn from(code: UploadErrorCode) -> Self {
		code.code()
	}
}

/// One received file waiting to be placed.
///
/// # Examples
///
/// ```
/// use formhandler_uploads::UploadDescriptor;
///
/// let upload = UploadDescriptor::new("/tmp/php1a2b", "report.pdf", 2048)
///     .with_content_type("application/pdf");
/// assert_eq!(upload.filename, "report.pdf");
/// assert!(upload.error.is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadDescriptor {
	/// Where the transport stored the received bytes
	pub temp_path: PathBuf,
	/// Filename as declared by the client
	pub filename: String,
	/// Declared size in bytes
	#[serde(default)]
	pub size: u64,
	/// Declared MIME type
	#[serde(default)]
	pub content_type: Option<String>,
	#[serde(default)]
	pub error: UploadErrorCode,
}

impl UploadDescriptor {
	pub fn new(temp_path: impl Into<PathBuf>, filename: impl Into<String>, size: u64) -> Self {
		Self {
			temp_path: temp_path.into(),
			filename: filename.into(),
			size,
			content_type: None,
			error: UploadErrorCode::Ok,
		}
	}

	pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
		self.content_type = Some(content_type.into());
		self
	}

	pub fn with_error(mut self, error: UploadErrorCode) -> Self {
		self.error = error;
		self
	}

	pub fn temp_path(&self) -> &Path {
		&self.temp_path
	}
}

/// The upload(s) submitted for one logical field.
///
/// `Multiple` corresponds to an array-valued file input; it yields a list of
/// destinations even when only one file arrived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PendingUpload {
	Single(UploadDescriptor),
	Multiple(Vec<UploadDescriptor>),
}

impl PendingUpload {
	pub fn descriptors(&self) -> &[UploadDescriptor] {
		match self {
			Self::Single(descriptor) => std::slice::from_ref(descriptor),
			Self::Multiple(descriptors) => descriptors,
		}
	}

	pub fn is_multiple(&self) -> bool {
		matches!(self, Self::Multiple(_))
	}

	pub fn len(&self) -> usize {
		self.descriptors().len()
	}

	pub fn is_empty(&self) -> bool {
		self.descriptors().is_empty()
	}
}

impl From<UploadDescriptor> for PendingUpload {
	fn from(descriptor: UploadDescriptor) -> Self {
		Self::Single(descriptor)
	}
}

impl From<Vec<UploadDescriptor>> for PendingUpload {
	fn from(descriptors: Vec<UploadDescriptor>) -> Self {
		Self::Multiple(descriptors)
	}
}
