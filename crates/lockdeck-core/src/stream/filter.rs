// ── Filter predicates for lock snapshots ──
//
// Lets consumers narrow a snapshot without re-querying the backend.

use strum::{Display, EnumString};

use crate::model::LockDevice;

/// Named filter over locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum DeviceFilter {
    #[default]
    All,
    Online,
    Offline,
    Locked,
    Unlocked,
    LowBattery,
}

impl DeviceFilter {
    pub fn matches(self, device: &LockDevice, low_battery_threshold: u8) -> bool {
        match self {
            Self::All => true,
            Self::Online => device.is_online,
            Self::Offline => !device.is_online,
            Self::Locked => device.is_locked(),
            Self::Unlocked => !device.is_locked(),
            Self::LowBattery => device.is_low_battery(low_battery_threshold),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DeviceId, LockStatus};

    #[test]
    fn filters_by_name() {
        let device = LockDevice {
            id: DeviceId(3),
            name: "Garage Door".into(),
            location: None,
            hardware_id: None,
            is_online: false,
            status: LockStatus {
                is_locked: true,
                battery_level: 23,
                last_activity: None,
            },
            config: serde_json::Value::Null,
        };

        assert_eq!("low-battery".parse::<DeviceFilter>().ok(), Some(DeviceFilter::LowBattery));
        assert!(DeviceFilter::Offline.matches(&device, 30));
        assert!(DeviceFilter::LowBattery.matches(&device, 30));
        assert!(!DeviceFilter::LowBattery.matches(&device, 20));
        assert!(!DeviceFilter::Unlocked.matches(&device, 30));
    }
}
