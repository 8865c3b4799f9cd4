//! Loading spreadsheets into the active sample source.

pub mod decoder;
pub mod session;

pub use session::{Session, UploadOptions};
