//! Rostersnap Storage - Supabase Storage client
//!
//! Provides an async client for the object-storage endpoints used by
//! the photo sync engine:
//! - Listing the objects of a bucket
//! - Upserting an object
//! - Downloading an object through the public or authenticated URL
//!
//! ## Modules
//!
//! - [`client`] - Supabase Storage HTTP client
//! - [`provider`] - [`IRemoteBucket`](rostersnap_core::ports::IRemoteBucket) adapter

pub mod client;
pub mod provider;

pub use client::StorageClient;
pub use provider::SupabaseBucket;
