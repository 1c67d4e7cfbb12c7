//! Upload placement and size limits
//!
//! ## Example
//!
//! ```rust,no_run
//! use formhandler::uploads::{PlacementPolicy, UploadDescriptor, UploadPlacer, UploadSettings};
//!
//! let settings = UploadSettings::from_file("uploads.toml").unwrap_or_default();
//! let max = settings.effective_max_upload_size();
//!
//! let upload = UploadDescriptor::new("/tmp/php1a2b", "report.pdf", 2048);
//! assert!(upload.size <= max);
//!
//! let placed = UploadPlacer::local()
//!     .move_pending(&upload.into(), "/srv/reports/", PlacementPolicy::Rename, true)
//!     .unwrap();
//! println!("stored at {:?}", placed.paths());
//! ```

pub use formhandler_uploads::*;
