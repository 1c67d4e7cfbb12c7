//! # formhandler
//!
//! Server-side form handling for Rust: the parts of a form library that
//! deal with submitted files and submitted text before the application sees
//! them.
//!
//! ## Feature Flags
//!
//! - `uploads` - size parsing, upload settings and upload placement
//! - `forms` - form fields, encoding filters and AJAX field validation
//!   (implies `uploads`)
//! - `full` (default) - everything
//!
//! ## Quick Example
//!
//! ```rust
//! use formhandler::prelude::*;
//! use serde_json::json;
//!
//! let settings = UploadSettings::new(true, "5M", "2M");
//! let field = UploadField::new("photo")
//!     .with_settings(&settings)
//!     .with_allowed_extensions(["png", "jpg"])
//!     .with_policy(PlacementPolicy::Rename);
//!
//! let submitted = json!({
//!     "temp_path": "/tmp/php1a2b",
//!     "filename": "holiday.png",
//!     "size": 3 * 1024 * 1024,
//!     "error": 0
//! });
//! assert!(field.clean(Some(&submitted)).is_err());
//! ```
//!
//! ## Concurrency
//!
//! Everything is synchronous. Collision checks and the move that follows are
//! not atomic, so concurrent writers into one directory can still collide.

#[cfg(feature = "forms")]
pub mod forms;
#[cfg(feature = "uploads")]
pub mod uploads;

#[cfg(feature = "uploads")]
pub use formhandler_uploads::{
	PendingUpload, PlacementPolicy, PlacementResult, UploadDescriptor, UploadError,
	UploadErrorCode, UploadPlacer, UploadResult, UploadSettings, effective_max_upload_size,
	parse_size, resolve_non_conflicting_path,
};

#[cfg(feature = "forms")]
pub use formhandler_forms::{
	AjaxDispatcher, EncodingFilter, FieldError, FilterRegistry, FormContext, FormField,
	UploadField,
};

/// Commonly used types
pub mod prelude {
	#[cfg(feature = "forms")]
	pub use crate::forms::{
		AjaxDispatcher, EncodingFilter, FieldError, FieldResult, FilterRegistry, FormContext,
		FormField, UploadField,
	};
	#[cfg(feature = "uploads")]
	pub use crate::uploads::{
		PendingUpload, PlacementPolicy, PlacementResult, UploadDescriptor, UploadError,
		UploadPlacer, UploadSettings, effective_max_upload_size, parse_size,
	};
}
