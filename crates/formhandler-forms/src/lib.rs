//! Form field processing for formhandler
//!
//! This crate provides the field side of form handling:
//! - The [`FormField`] contract fields implement to clean submitted values
//! - An upload field checking transport status, size ceilings and
//!   extensions before handing files to the placer
//! - Pluggable encoding filters selected by name from a registry
//! - A dispatcher answering single-field validation requests with JSON

pub mod ajax;
pub mod context;
pub mod encoding;
pub mod field;
pub mod fields;

pub use ajax::{AjaxDispatcher, AjaxValidationRequest, AjaxValidationResponse, DispatchError};
pub use context::FormContext;
pub use encoding::{EncodingFilter, FilterError, FilterRegistry, PassthroughFilter, Utf8Filter};
pub use field::{FieldError, FieldResult, FormField};
pub use fields::UploadField;
