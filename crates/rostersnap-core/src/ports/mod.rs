//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. The sync engine depends on these traits; their
//! implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IRemoteBucket`] - Remote object bucket (Supabase Storage)
//! - [`IPhotoStore`] - Local photo files and the durable pending-upload queue

pub mod photo_store;
pub mod remote_bucket;

pub use photo_store::{IPhotoStore, PendingUpload};
pub use remote_bucket::{IRemoteBucket, ObjectAccess};
