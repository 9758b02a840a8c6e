//! Network reachability port

use std::{
    fmt::{self, Display, Formatter},
    sync::Arc,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NetworkStatus {
    #[default]
    Unknown,
    Disconnected,
    Disconnecting,
    Connected,
    Connecting,
}

impl NetworkStatus {
    #[must_use]
    pub fn is_connected(&self) -> bool {
        *self == NetworkStatus::Connected
    }
}

impl Display for NetworkStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            NetworkStatus::Unknown => "unknown",
            NetworkStatus::Disconnected => "disconnected",
            NetworkStatus::Disconnecting => "disconnecting",
            NetworkStatus::Connected => "connected",
            NetworkStatus::Connecting => "connecting",
        };
        f.write_str(name)
    }
}

/// Lifecycle of a network interface switch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkInterfaceChangeStatus {
    Begin,
    Change,
    Completed,
}

pub trait INetworkObserver: Send + Sync {
    fn on_network_info_changed(&self, status: NetworkStatus);

    fn on_network_interface_change_status_changed(
        &self,
        network_interface: &str,
        status: NetworkInterfaceChangeStatus,
    );
}

/// Platform network monitor
pub trait INetworkObservable: Send + Sync {
    fn add_observer(&self, observer: Arc<dyn INetworkObserver>);

    fn remove_observer(&self, observer: &Arc<dyn INetworkObserver>);
}
