//! Device identity

/// Identity of the device the engine runs on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Sent as the client id on every cloud request
    pub serial_number: String,
}

impl DeviceInfo {
    pub fn new(serial_number: impl Into<String>) -> Self {
        Self {
            serial_number: serial_number.into(),
        }
    }
}
