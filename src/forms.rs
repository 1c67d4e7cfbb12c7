//! Form fields, encoding filters and single-field validation
//!
//! ## Example
//!
//! ```rust
//! use formhandler::forms::{AjaxDispatcher, FilterRegistry, FormContext, UploadField};
//!
//! let ctx = FormContext::new("application");
//! let filter = FilterRegistry::default().create("utf-8", &ctx).unwrap();
//!
//! let dispatcher = AjaxDispatcher::new()
//!     .with_filter(filter)
//!     .register(UploadField::new("cv").required().with_allowed_extensions(["pdf"]));
//!
//! let body = dispatcher.dispatch_json(r#"{"field": "cv"}"#).unwrap();
//! assert!(body.contains("\"valid\":false"));
//! ```

pub use formhandler_forms::*;
