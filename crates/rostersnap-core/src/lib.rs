//! Rostersnap Core - Domain types, ports, and configuration
//!
//! This crate contains the hexagonal core of the player photo sync system:
//! - **Domain types** - `LogicalPhotoName`, `LocalPhotoRecord`, `RemoteObjectRecord`
//! - **Error taxonomy** - `RemoteError` and its retry classification
//! - **Port definitions** - Traits for adapters: `IPhotoStore`, `IRemoteBucket`
//! - **Configuration** - YAML-backed [`config::Config`]
//!
//! # Architecture
//!
//! The domain module contains pure logic with no I/O. Ports define the trait
//! interfaces that the storage and sync crates implement or consume.

pub mod config;
pub mod domain;
pub mod ports;
