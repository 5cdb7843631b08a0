// ── Central reactive data store ──
//
// Authoritative in-memory mirror of the lock fleet, the pending-command
// markers, and the notification feed. Mutations are broadcast to
// subscribers via `watch` channels; derived views are recomputed and
// published after every device or marker change.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::watch;

use super::collection::EntityCollection;
use super::pending::PendingCommand;
use crate::model::{DeviceId, FleetSummary, FleetViews, LockDevice, Notification};
use crate::stream::EntityStream;

const DEFAULT_LOW_BATTERY_THRESHOLD: u8 = 30;

/// Central reactive store for locks, pending commands, and notifications.
///
/// Devices are only ever written from server-confirmed payloads: a
/// directory refresh, a status poll, or a single-device probe.
pub struct DataStore {
    pub(crate) devices: EntityCollection<DeviceId, LockDevice>,
    pub(crate) views: watch::Sender<Arc<FleetViews>>,
    pub(crate) pending: DashMap<DeviceId, PendingCommand>,
    pub(crate) pending_ids: watch::Sender<Arc<BTreeSet<DeviceId>>>,
    pub(crate) next_nonce: AtomicU64,
    pub(crate) notifications: watch::Sender<Arc<Vec<Arc<Notification>>>>,
    pub(crate) unread_count: watch::Sender<u64>,
    pub(crate) last_directory_refresh: watch::Sender<Option<DateTime<Utc>>>,
    pub(crate) last_notification_fetch: watch::Sender<Option<DateTime<Utc>>>,
    low_battery_threshold: u8,
}

impl DataStore {
    pub fn new() -> Self {
        Self::with_low_battery_threshold(DEFAULT_LOW_BATTERY_THRESHOLD)
    }

    pub fn with_low_battery_threshold(low_battery_threshold: u8) -> Self {
        let (views, _) = watch::channel(Arc::new(FleetViews::default()));
        let (pending_ids, _) = watch::channel(Arc::new(BTreeSet::new()));
        let (notifications, _) = watch::channel(Arc::new(Vec::new()));
        let (unread_count, _) = watch::channel(0);
        let (last_directory_refresh, _) = watch::channel(None);
        let (last_notification_fetch, _) = watch::channel(None);

        Self {
            devices: EntityCollection::new(),
            views,
            pending: DashMap::new(),
            pending_ids,
            next_nonce: AtomicU64::new(0),
            notifications,
            unread_count,
            last_directory_refresh,
            last_notification_fetch,
            low_battery_threshold,
        }
    }

    pub fn low_battery_threshold(&self) -> u8 {
        self.low_battery_threshold
    }

    // ── Snapshot accessors ───────────────────────────────────────────

    /// All locks, ordered by id.
    pub fn devices_snapshot(&self) -> Arc<Vec<Arc<LockDevice>>> {
        self.devices.snapshot()
    }

    pub fn device(&self, id: DeviceId) -> Option<Arc<LockDevice>> {
        self.devices.get(id)
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn device_ids(&self) -> Vec<DeviceId> {
        self.devices.keys()
    }

    // ── Derived views ────────────────────────────────────────────────

    pub fn views(&self) -> Arc<FleetViews> {
        self.views.borrow().clone()
    }

    pub fn summary(&self) -> FleetSummary {
        self.views.borrow().summary
    }

    pub fn online_devices(&self) -> Arc<Vec<Arc<LockDevice>>> {
        Arc::clone(&self.views.borrow().online)
    }

    pub fn offline_devices(&self) -> Arc<Vec<Arc<LockDevice>>> {
        Arc::clone(&self.views.borrow().offline)
    }

    pub fn low_battery_devices(&self) -> Arc<Vec<Arc<LockDevice>>> {
        Arc::clone(&self.views.borrow().low_battery)
    }

    pub fn locked_count(&self) -> usize {
        self.views.borrow().summary.locked
    }

    pub fn unlocked_count(&self) -> usize {
        self.views.borrow().summary.unlocked
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscribe_devices(&self) -> EntityStream<LockDevice> {
        EntityStream::new(self.devices.subscribe())
    }

    pub fn subscribe_views(&self) -> watch::Receiver<Arc<FleetViews>> {
        self.views.subscribe()
    }

    pub fn subscribe_pending(&self) -> watch::Receiver<Arc<BTreeSet<DeviceId>>> {
        self.pending_ids.subscribe()
    }

    // ── Metadata ─────────────────────────────────────────────────────

    pub fn last_directory_refresh(&self) -> Option<DateTime<Utc>> {
        *self.last_directory_refresh.borrow()
    }

    /// How long ago the last full directory refresh landed, or `None` if never.
    pub fn data_age(&self) -> Option<chrono::Duration> {
        self.last_directory_refresh().map(|t| Utc::now() - t)
    }

    /// Forget everything. Used on logout and session teardown.
    pub fn clear(&self) {
        self.cancel_all_pending();
        self.devices.clear();
        self.clear_notifications();
        self.last_directory_refresh.send_replace(None);
        self.publish_views();
    }

    /// Recompute views under the channel's write lock so concurrent
    /// publishers cannot overwrite newer views with older ones.
    pub(crate) fn publish_views(&self) {
        self.views.send_modify(|views| {
            let snapshot = self.devices.snapshot();
            let pending = self.pending.len();
            *views = Arc::new(FleetViews::compute(&snapshot, self.low_battery_threshold, pending));
        });
    }
}

impl Default for DataStore {
    fn default() -> Self {
        Self::new()
    }
}
