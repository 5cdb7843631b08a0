// ── API-to-domain type conversions ──
//
// Bridges raw `lockdeck_api` response types into `lockdeck_core::model`
// domain types. Lock state is copied verbatim from the server payload.

use lockdeck_api::{LockRecord, LockStatusEntry, LockStatusPayload, NotificationRecord};

use crate::model::{DeviceId, LockDevice, LockStatus, Notification, StatusUpdate};

impl From<LockStatusPayload> for LockStatus {
    fn from(p: LockStatusPayload) -> Self {
        Self {
            is_locked: p.is_locked,
            battery_level: p.battery_level.min(100),
            last_activity: p.last_activity,
        }
    }
}

impl From<LockRecord> for LockDevice {
    fn from(r: LockRecord) -> Self {
        Self {
            id: DeviceId(r.id),
            name: r.name,
            location: r.location.filter(|s| !s.is_empty()),
            hardware_id: r.hardware_id.filter(|s| !s.is_empty()),
            is_online: r.is_online,
            status: r.status.into(),
            config: r.config,
        }
    }
}

impl From<LockStatusEntry> for StatusUpdate {
    fn from(e: LockStatusEntry) -> Self {
        Self {
            id: DeviceId(e.id),
            is_online: e.is_online,
            status: e.status.into(),
        }
    }
}

impl From<NotificationRecord> for Notification {
    fn from(r: NotificationRecord) -> Self {
        Self {
            id: r.id,
            kind: r.kind,
            message: r.message,
            created_at: r.timestamp,
            is_read: r.is_read,
        }
    }
}
