//! Shared error plumbing: crates implement [`FromMessage`] for their error
//! type and invoke [`impl_context!`] to get `.context()` helpers.

pub mod error;

pub use error::FromMessage;
