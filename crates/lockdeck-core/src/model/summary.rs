// ── Derived fleet views ──
//
// Recomputed from the device snapshot after every store mutation and
// published as one value, so subscribers never see counts from one
// snapshot next to sets from another.

use std::sync::Arc;

use serde::Serialize;

use super::LockDevice;

/// Aggregate counts over the fleet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FleetSummary {
    pub total: usize,
    pub online: usize,
    pub offline: usize,
    pub locked: usize,
    pub unlocked: usize,
    pub low_battery: usize,
    pub pending: usize,
}

/// Online/offline/low-battery sets plus the summary, all from one snapshot.
#[derive(Debug, Clone, Default)]
pub struct FleetViews {
    pub online: Arc<Vec<Arc<LockDevice>>>,
    pub offline: Arc<Vec<Arc<LockDevice>>>,
    pub low_battery: Arc<Vec<Arc<LockDevice>>>,
    pub summary: FleetSummary,
}

impl FleetViews {
    pub(crate) fn compute(
        devices: &[Arc<LockDevice>],
        low_battery_threshold: u8,
        pending: usize,
    ) -> Self {
        let mut online = Vec::new();
        let mut offline = Vec::new();
        let mut low_battery = Vec::new();
        let mut locked = 0;

        for device in devices {
            if device.is_online {
                online.push(Arc::clone(device));
            } else {
                offline.push(Arc::clone(device));
            }
            if device.is_low_battery(low_battery_threshold) {
                low_battery.push(Arc::clone(device));
            }
            if device.is_locked() {
                locked += 1;
            }
        }

        let summary = FleetSummary {
            total: devices.len(),
            online: online.len(),
            offline: offline.len(),
            locked,
            unlocked: devices.len() - locked,
            low_battery: low_battery.len(),
            pending,
        };

        Self {
            online: Arc::new(online),
            offline: Arc::new(offline),
            low_battery: Arc::new(low_battery),
            summary,
        }
    }
}
