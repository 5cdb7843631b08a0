// ── Refresh application logic ──
//
// Applies server-confirmed lock data to the store. Every path runs the
// same pending-resolution rule: a marker clears as soon as the confirmed
// `is_locked` differs from the value captured when the command was issued.

use std::collections::HashMap;

use chrono::Utc;
use tracing::debug;

use super::DataStore;
use crate::model::{DeviceId, LockDevice, StatusUpdate};

impl DataStore {
    /// Replace the whole fleet with a directory listing.
    ///
    /// The new collection is published in one step. Markers for locks that
    /// no longer appear in the listing are dropped.
    pub fn replace_all(&self, devices: Vec<LockDevice>) {
        let confirmed: Vec<(DeviceId, bool)> = devices
            .iter()
            .map(|d| (d.id, d.status.is_locked))
            .collect();

        self.devices
            .replace_all(devices.into_iter().map(|d| (d.id, d)));

        let resolved = confirmed
            .into_iter()
            .filter(|(id, is_locked)| self.resolve_pending(*id, *is_locked))
            .count();
        let pruned = self.prune_pending();

        self.last_directory_refresh.send_replace(Some(Utc::now()));
        self.publish_pending();

        debug!(
            devices = self.device_count(),
            resolved, pruned, "directory refresh applied"
        );
    }

    /// Merge a status-only batch. Unknown ids are ignored.
    pub fn apply_status(&self, updates: Vec<StatusUpdate>) {
        let by_id: HashMap<DeviceId, StatusUpdate> =
            updates.into_iter().map(|u| (u.id, u)).collect();

        let changed = self.devices.update_each(|id, current| {
            let update = by_id.get(&id)?;
            let mut next = current.clone();
            next.status = update.status.clone();
            if let Some(online) = update.is_online {
                next.is_online = online;
            }
            (next != *current).then_some(next)
        });

        let mut resolved = 0;
        for (id, update) in &by_id {
            if self.devices.contains(*id) && self.resolve_pending(*id, update.status.is_locked) {
                resolved += 1;
            }
        }

        self.publish_pending();
        debug!(changed = changed.len(), resolved, "status poll applied");
    }

    /// Upsert one lock from a single-device probe.
    pub fn apply_probe(&self, device: LockDevice) {
        let id = device.id;
        let is_locked = device.status.is_locked;
        self.devices.upsert(id, device);
        let resolved = self.resolve_pending(id, is_locked);
        self.publish_pending();
        debug!(%id, resolved, "probe applied");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use lockdeck_api::ControlAction;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::LockStatus;

    fn lock(id: u64, online: bool, locked: bool, battery: u8) -> LockDevice {
        LockDevice {
            id: DeviceId(id),
            name: format!("Lock {id}"),
            location: None,
            hardware_id: None,
            is_online: online,
            status: LockStatus {
                is_locked: locked,
                battery_level: battery,
                last_activity: None,
            },
            config: serde_json::Value::Null,
        }
    }

    fn assert_counts_consistent(store: &DataStore) {
        let s = store.summary();
        assert_eq!(s.locked + s.unlocked, s.total);
        assert_eq!(s.online + s.offline, s.total);
        assert_eq!(s.total, store.device_count());
    }

    #[test]
    fn concurrent_writers_leave_views_matching_final_state() {
        let store = DataStore::new();
        let small = vec![lock(1, true, true, 85)];
        let large = vec![
            lock(1, true, true, 85),
            lock(2, true, false, 92),
            lock(3, false, true, 23),
            lock(4, true, false, 67),
        ];

        std::thread::scope(|s| {
            s.spawn(|| {
                for i in 0..200 {
                    let batch = if i % 2 == 0 { &large } else { &small };
                    store.replace_all(batch.clone());
                }
            });
            s.spawn(|| {
                for i in 0..200 {
                    store.apply_probe(lock(1, true, i % 2 == 0, 85));
                }
            });
        });

        assert_counts_consistent(&store);
        let locked = store
            .devices_snapshot()
            .iter()
            .filter(|d| d.is_locked())
            .count();
        assert_eq!(store.locked_count(), locked);
    }

    #[test]
    fn derived_counts_hold_across_refreshes() {
        let store = DataStore::new();
        let batches = vec![
            vec![],
            vec![lock(1, true, true, 85), lock(2, true, false, 92)],
            vec![
                lock(1, true, false, 85),
                lock(2, true, false, 92),
                lock(3, false, true, 23),
                lock(4, true, false, 67),
            ],
            vec![lock(3, false, true, 12)],
            vec![],
        ];

        for batch in batches {
            store.replace_all(batch);
            assert_counts_consistent(&store);
        }
    }

    #[test]
    fn derived_sets() {
        let store = DataStore::new();
        store.replace_all(vec![
            lock(1, true, true, 85),
            lock(2, true, false, 92),
            lock(3, false, true, 23),
            lock(4, true, false, 67),
        ]);

        assert_eq!(store.online_devices().len(), 3);
        assert_eq!(store.offline_devices()[0].id, DeviceId(3));
        assert_eq!(store.low_battery_devices()[0].id, DeviceId(3));
        assert_eq!(store.locked_count(), 2);
        assert_eq!(store.unlocked_count(), 2);
    }

    #[test]
    fn unlock_confirmed_by_directory_refresh() {
        let store = DataStore::new();
        store.replace_all(vec![lock(1, true, true, 80)]);
        store.begin_pending(DeviceId(1), ControlAction::Unlock, true);
        assert!(store.is_pending(DeviceId(1)));
        assert_eq!(store.summary().pending, 1);

        // Same state as at issue time: still pending.
        store.replace_all(vec![lock(1, true, true, 80)]);
        assert!(store.is_pending(DeviceId(1)));

        store.replace_all(vec![lock(1, true, false, 80)]);
        assert!(!store.is_pending(DeviceId(1)));
        assert_eq!(store.summary().pending, 0);
    }

    #[test]
    fn vanished_lock_drops_marker() {
        let store = DataStore::new();
        store.replace_all(vec![lock(1, true, true, 80), lock(2, true, true, 80)]);
        let ticket = store.begin_pending(DeviceId(2), ControlAction::Unlock, true);

        store.replace_all(vec![lock(1, true, true, 80)]);

        assert!(!store.is_pending(DeviceId(2)));
        assert!(ticket.cancel.is_cancelled());
    }

    #[test]
    fn status_batch_merges_and_resolves() {
        let store = DataStore::new();
        store.replace_all(vec![lock(1, true, true, 80), lock(2, false, false, 40)]);
        store.begin_pending(DeviceId(1), ControlAction::Unlock, true);

        store.apply_status(vec![
            StatusUpdate {
                id: DeviceId(1),
                is_online: None,
                status: LockStatus {
                    is_locked: false,
                    battery_level: 79,
                    last_activity: None,
                },
            },
            StatusUpdate {
                id: DeviceId(2),
                is_online: Some(true),
                status: LockStatus {
                    is_locked: false,
                    battery_level: 40,
                    last_activity: None,
                },
            },
            StatusUpdate {
                id: DeviceId(99),
                is_online: Some(true),
                status: LockStatus::default(),
            },
        ]);

        assert!(!store.is_pending(DeviceId(1)));
        assert_eq!(store.device(DeviceId(1)).unwrap().status.battery_level, 79);
        assert!(store.device(DeviceId(2)).unwrap().is_online);
        assert!(store.device(DeviceId(99)).is_none());
        assert_counts_consistent(&store);
    }

    #[test]
    fn probe_upserts_and_resolves() {
        let store = DataStore::new();
        store.replace_all(vec![lock(5, true, false, 50)]);
        store.begin_pending(DeviceId(5), ControlAction::Lock, false);

        store.apply_probe(lock(5, true, true, 50));

        assert!(!store.is_pending(DeviceId(5)));
        assert!(store.device(DeviceId(5)).unwrap().is_locked());
        assert_eq!(store.locked_count(), 1);
    }

    #[test]
    fn clear_resets_everything() {
        let store = DataStore::new();
        store.replace_all(vec![lock(1, true, true, 80)]);
        store.begin_pending(DeviceId(1), ControlAction::Unlock, true);

        store.clear();

        assert_eq!(store.device_count(), 0);
        assert_eq!(store.pending_count(), 0);
        assert_eq!(store.summary(), crate::model::FleetSummary::default());
        assert!(store.last_directory_refresh().is_none());
    }
}
