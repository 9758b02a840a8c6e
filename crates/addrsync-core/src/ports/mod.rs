//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the traits at the boundaries of the synchronization
//! engine. The engine depends only on these; implementations live in adapter
//! crates or on the embedding platform.
//!
//! ## Ports Overview
//!
//! - [`ICloudAgent`] - Address book cloud service operations
//! - [`IAddressBookRegistry`] - Local address books and their entries
//! - [`IAuthDelegate`] - Bearer tokens and authorization state
//! - [`INetworkObservable`] - Connectivity notifications
//! - [`IMetricsSink`] - Fire-and-forget pipeline metrics

pub mod auth;
pub mod cloud_agent;
pub mod device;
pub mod metrics;
pub mod network;
pub mod registry;

pub use auth::{AuthState, IAuthDelegate, IAuthObserver};
pub use cloud_agent::{CloudAddressBook, CloudAgentError, CloudResult, HttpResponse, ICloudAgent};
pub use device::DeviceInfo;
pub use metrics::{IMetricsSink, NoopMetricsSink, SyncMetric};
pub use network::{INetworkObservable, INetworkObserver, NetworkInterfaceChangeStatus, NetworkStatus};
pub use registry::{IAddressBookEntriesFactory, IAddressBookObserver, IAddressBookRegistry};
