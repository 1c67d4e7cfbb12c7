//! Error types for size parsing and upload placement

use std::io;
use std::path::PathBuf;

/// Errors raised by the size parser and the upload placer.
///
/// Every variant is fatal to the operation that produced it. Nothing is
/// retried and nothing already moved is rolled back.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
	/// The value is not `<number><unit>` with a known unit
	#[error("invalid size format: '{value}'")]
	InvalidSizeFormat { value: String },

	/// More than one file was sent to a destination that names a single file
	#[error(
		"cannot place {count} files at '{}': destination must be a directory",
		destination.display()
	)]
	MultipleFilesSingleDestination { destination: PathBuf, count: usize },

	/// The destination directory does not exist and creation was not requested
	#[error("destination directory '{}' does not exist", directory.display())]
	DestinationDirectoryMissing { directory: PathBuf },

	/// Creating the destination directory failed
	#[error("failed to create directory '{}': {source}", directory.display())]
	DirectoryCreationFailed {
		directory: PathBuf,
		#[source]
		source: io::Error,
	},

	/// The destination directory exists but cannot be written to
	#[error("directory '{}' is not writable", directory.display())]
	DirectoryNotWritable { directory: PathBuf },

	/// The target exists and the policy forbids replacing it
	#[error("destination '{}' already exists", path.display())]
	DestinationAlreadyExists { path: PathBuf },

	/// The policy name does not match any known collision policy
	#[error("unsupported placement policy: '{policy}'")]
	UnsupportedPolicy { policy: String },

	/// The transport could not move the file
	#[error("failed to move '{}' to '{}': {source}", from.display(), to.display())]
	MoveFailed {
		from: PathBuf,
		to: PathBuf,
		#[source]
		source: io::Error,
	},

	/// The declared filename has no usable final component
	#[error("invalid upload filename: '{filename}'")]
	InvalidFilename { filename: String },
}

/// Result alias for upload operations.
pub type UploadResult<T> = Result<T, UploadError>;

/// Errors raised while loading [`UploadSettings`](crate::settings::UploadSettings).
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
	#[error("failed to read settings file: {0}")]
	FileError(String),
	#[error("failed to parse settings: {0}")]
	ParseError(String),
	#[error("unsupported settings format: {0}")]
	UnsupportedFormat(String),
}
