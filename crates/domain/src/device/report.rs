//! Outbound snapshot of a device.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::DeviceStatus;
use crate::id::DeviceId;

/// Point-in-time snapshot of a device, as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub id: DeviceId,
    pub status: DeviceStatus,
    /// Time since the device was started; zero while stopped.
    #[serde(rename = "uptime_ms", with = "millis")]
    pub uptime: Duration,
    pub flux_capacitance: i32,
    pub gravitational_integrity: f64,
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
