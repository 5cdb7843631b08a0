// ── Lock device domain types ──

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable identifier of a lock, numeric on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub u64);

impl DeviceId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for DeviceId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DeviceId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// Server-confirmed lock status. Never set from client-side guesses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockStatus {
    pub is_locked: bool,
    /// Percentage, 0-100.
    pub battery_level: u8,
    pub last_activity: Option<DateTime<Utc>>,
}

/// A door lock as mirrored by the [`DataStore`](crate::DataStore).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockDevice {
    pub id: DeviceId,
    pub name: String,
    pub location: Option<String>,
    pub hardware_id: Option<String>,
    pub is_online: bool,
    pub status: LockStatus,
    /// Device configuration. Opaque to the engine.
    pub config: serde_json::Value,
}

impl LockDevice {
    pub fn is_locked(&self) -> bool {
        self.status.is_locked
    }

    pub fn is_low_battery(&self, threshold: u8) -> bool {
        self.status.battery_level < threshold
    }
}

/// Status-only update for one lock, as carried by the status poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub id: DeviceId,
    /// `None` keeps the current online flag.
    pub is_online: Option<bool>,
    pub status: LockStatus,
}
