pub mod upload_field;

pub use upload_field::UploadField;
