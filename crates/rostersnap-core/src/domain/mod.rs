//! Domain layer
//!
//! - [`errors`] - Domain and remote error types
//! - [`newtypes`] - Validated identifiers ([`newtypes::LogicalPhotoName`])
//! - [`photo`] - Photo records on both sides of the sync and the name matching rules

pub mod errors;
pub mod newtypes;
pub mod photo;

pub use errors::{DomainError, RemoteError, RemoteErrorKind};
pub use newtypes::LogicalPhotoName;
pub use photo::{LocalPhotoRecord, PhotoExtension, RemoteObjectRecord};
