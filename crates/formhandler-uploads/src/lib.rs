//! Upload placement and size limits for formhandler
//!
//! This crate holds the parts of form handling that touch the disk:
//! - Human-readable size parsing (`"5M"` to bytes) and the effective
//!   per-file upload ceiling from two configured limits
//! - Upload descriptors as handed over by the request layer
//! - Destination resolution with overwrite / rename / raise collision
//!   policies, optional directory creation and the final move
//!
//! All operations are synchronous and blocking. Existence checks are not
//! atomic with the move that follows them; concurrent writers to the same
//! directory can still collide.

pub mod descriptor;
pub mod errors;
pub mod filesystem;
pub mod placement;
pub mod settings;
pub mod size;

pub use descriptor::{PendingUpload, UploadDescriptor, UploadErrorCode};
pub use errors::{SettingsError, UploadError, UploadResult};
pub use filesystem::{FileSystem, LocalFileSystem, UploadTransport};
pub use placement::{
	PlacementPolicy, PlacementResult, UploadPlacer, file_extension, resolve_non_conflicting_path,
	sanitize_filename,
};
pub use settings::UploadSettings;
pub use size::{effective_max_upload_size, format_size, parse_size};
