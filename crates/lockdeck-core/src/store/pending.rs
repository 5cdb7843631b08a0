// ── Pending-command bookkeeping ──
//
// One marker per lock with a command in flight. A marker is resolved by
// the first observed state that differs from `locked_at_issue`, or
// force-cleared by its own follow-up chain. Each marker carries a nonce
// so a chain only ever clears the marker it was started for.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use chrono::{DateTime, Utc};
use lockdeck_api::ControlAction;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::DataStore;
use crate::model::DeviceId;

/// A command that was sent but whose effect has not been observed yet.
#[derive(Debug, Clone)]
pub struct PendingCommand {
    pub action: ControlAction,
    pub issued_at: DateTime<Utc>,
    /// `is_locked` as the store saw it when the command was issued.
    pub locked_at_issue: bool,
    pub follow_up_attempts: u32,
    pub(crate) nonce: u64,
    pub(crate) cancel: CancellationToken,
}

/// Identifies one specific marker, returned by [`DataStore::begin_pending`].
#[derive(Debug, Clone)]
pub struct PendingTicket {
    pub id: DeviceId,
    pub nonce: u64,
    /// Cancelled when the marker is resolved, replaced or cleared.
    pub cancel: CancellationToken,
}

impl DataStore {
    /// Mark `id` as having a command in flight.
    ///
    /// An existing marker is overwritten and its follow-up chain cancelled.
    pub fn begin_pending(
        &self,
        id: DeviceId,
        action: ControlAction,
        locked_at_issue: bool,
    ) -> PendingTicket {
        let nonce = self.next_nonce.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = CancellationToken::new();

        let previous = self.pending.insert(
            id,
            PendingCommand {
                action,
                issued_at: Utc::now(),
                locked_at_issue,
                follow_up_attempts: 0,
                nonce,
                cancel: cancel.clone(),
            },
        );
        if let Some(previous) = previous {
            previous.cancel.cancel();
            debug!(%id, "replacing pending marker");
        }

        self.publish_pending();
        PendingTicket { id, nonce, cancel }
    }

    /// Count one follow-up probe against the ticket's marker.
    ///
    /// Returns `false` if that marker is gone (resolved or replaced).
    pub fn touch_pending(&self, ticket: &PendingTicket) -> bool {
        let Some(mut entry) = self.pending.get_mut(&ticket.id) else {
            return false;
        };
        if entry.nonce != ticket.nonce {
            return false;
        }
        entry.follow_up_attempts += 1;
        true
    }

    /// Whether the ticket's marker is still the current one.
    pub fn holds_pending(&self, ticket: &PendingTicket) -> bool {
        self.pending
            .get(&ticket.id)
            .is_some_and(|entry| entry.nonce == ticket.nonce)
    }

    /// Clear the marker only if it is still the one created for `nonce`.
    pub fn force_clear_pending(&self, id: DeviceId, nonce: u64) -> bool {
        let removed = self.pending.remove_if(&id, |_, p| p.nonce == nonce);
        self.finish_removal(removed.map(|(_, p)| p))
    }

    /// Clear whatever marker `id` has.
    pub fn clear_pending(&self, id: DeviceId) -> bool {
        let removed = self.pending.remove(&id);
        self.finish_removal(removed.map(|(_, p)| p))
    }

    /// Drop every marker and cancel every follow-up chain.
    pub fn cancel_all_pending(&self) {
        let ids: Vec<DeviceId> = self.pending.iter().map(|e| *e.key()).collect();
        for id in ids {
            if let Some((_, p)) = self.pending.remove(&id) {
                p.cancel.cancel();
            }
        }
        self.publish_pending();
    }

    pub fn is_pending(&self, id: DeviceId) -> bool {
        self.pending.contains_key(&id)
    }

    pub fn pending_command(&self, id: DeviceId) -> Option<PendingCommand> {
        self.pending.get(&id).map(|entry| entry.value().clone())
    }

    pub fn pending_ids(&self) -> Arc<BTreeSet<DeviceId>> {
        self.pending_ids.borrow().clone()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    // ── Crate-internal ───────────────────────────────────────────────

    /// Resolve the marker for `id` if the confirmed state moved away from
    /// the state at issue time. Does not publish.
    pub(crate) fn resolve_pending(&self, id: DeviceId, is_locked: bool) -> bool {
        match self
            .pending
            .remove_if(&id, |_, p| p.locked_at_issue != is_locked)
        {
            Some((_, p)) => {
                p.cancel.cancel();
                debug!(%id, action = %p.action, "pending command confirmed");
                true
            }
            None => false,
        }
    }

    /// Drop markers for locks that are no longer in the directory. Does not publish.
    pub(crate) fn prune_pending(&self) -> usize {
        let gone: Vec<DeviceId> = self
            .pending
            .iter()
            .map(|e| *e.key())
            .filter(|id| !self.devices.contains(*id))
            .collect();
        for id in &gone {
            if let Some((_, p)) = self.pending.remove(id) {
                p.cancel.cancel();
                debug!(%id, "dropping pending marker for vanished lock");
            }
        }
        gone.len()
    }

    pub(crate) fn publish_pending(&self) {
        self.pending_ids.send_modify(|ids| {
            *ids = Arc::new(self.pending.iter().map(|e| *e.key()).collect());
        });
        self.publish_views();
    }

    fn finish_removal(&self, removed: Option<PendingCommand>) -> bool {
        let Some(p) = removed else {
            return false;
        };
        p.cancel.cancel();
        self.publish_pending();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overwrite_cancels_previous_chain() {
        let store = DataStore::new();
        let first = store.begin_pending(DeviceId(1), ControlAction::Unlock, true);
        let second = store.begin_pending(DeviceId(1), ControlAction::Lock, true);

        assert!(first.cancel.is_cancelled());
        assert!(!second.cancel.is_cancelled());
        assert!(!store.holds_pending(&first));
        assert!(store.holds_pending(&second));
        assert_ne!(first.nonce, second.nonce);
    }

    #[test]
    fn force_clear_respects_nonce() {
        let store = DataStore::new();
        let stale = store.begin_pending(DeviceId(1), ControlAction::Unlock, true);
        let current = store.begin_pending(DeviceId(1), ControlAction::Unlock, true);

        assert!(!store.force_clear_pending(DeviceId(1), stale.nonce));
        assert!(store.is_pending(DeviceId(1)));
        assert!(store.force_clear_pending(DeviceId(1), current.nonce));
        assert!(!store.is_pending(DeviceId(1)));
        assert!(current.cancel.is_cancelled());
    }

    #[test]
    fn touch_counts_follow_ups() {
        let store = DataStore::new();
        let ticket = store.begin_pending(DeviceId(4), ControlAction::Lock, false);

        assert!(store.touch_pending(&ticket));
        assert!(store.touch_pending(&ticket));
        assert_eq!(
            store
                .pending_command(DeviceId(4))
                .map(|p| p.follow_up_attempts),
            Some(2)
        );

        store.clear_pending(DeviceId(4));
        assert!(!store.touch_pending(&ticket));
    }

    #[test]
    fn cancel_all_empties_markers() {
        let store = DataStore::new();
        let a = store.begin_pending(DeviceId(1), ControlAction::Lock, false);
        let b = store.begin_pending(DeviceId(2), ControlAction::Unlock, true);
        assert_eq!(store.pending_ids().len(), 2);

        store.cancel_all_pending();

        assert!(a.cancel.is_cancelled());
        assert!(b.cancel.is_cancelled());
        assert_eq!(store.pending_count(), 0);
        assert!(store.pending_ids().is_empty());
    }
}
