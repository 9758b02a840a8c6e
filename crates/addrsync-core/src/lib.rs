//! addrsync Core - Domain model and ports for address book synchronization
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `AddressBookEntity`, `Change`, the entries document model
//! - **Port definitions** - Traits for adapters and collaborators: `ICloudAgent`,
//!   `IAddressBookRegistry`, `IAuthDelegate`, `INetworkObservable`, `IMetricsSink`
//! - **Configuration** - YAML-backed settings for the cloud agent and upload pipeline
//!
//! # Architecture
//!
//! The domain module holds plain value types with no I/O. Ports define the
//! trait interfaces the synchronization engine depends on; their
//! implementations live in adapter crates (`addrsync-cloud`,
//! `addrsync-telemetry`) or on the embedding platform.

pub mod config;
pub mod domain;
pub mod ports;
