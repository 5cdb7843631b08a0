// ── Lock command dispatch ──
//
// Sends lock/unlock commands and drives the follow-up probes that watch
// for the lock's reported state to change. The store is never written
// optimistically: only a directory refresh, status poll, or probe moves
// `is_locked`.

use std::sync::Arc;
use std::time::Duration;

use lockdeck_api::{ControlAck, ControlAction, LockClient};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::model::{DeviceId, LockDevice};
use crate::store::{DataStore, PendingTicket};

enum ProbeOutcome {
    Applied,
    /// Failed or cut off; the chain carries on.
    Inconclusive,
    /// Cancelled or the session moved on; the chain ends.
    Abandoned,
}

/// Issues commands and owns their follow-up chains.
#[derive(Clone)]
pub struct CommandDispatcher {
    client: Arc<LockClient>,
    store: Arc<DataStore>,
    probe_offsets: Arc<[Duration]>,
}

impl CommandDispatcher {
    pub fn new(
        client: Arc<LockClient>,
        store: Arc<DataStore>,
        mut probe_offsets: Vec<Duration>,
    ) -> Self {
        probe_offsets.sort_unstable();
        Self {
            client,
            store,
            probe_offsets: probe_offsets.into(),
        }
    }

    /// Send `action` to lock `id`.
    ///
    /// Offline and unknown locks are rejected before any request is made.
    /// On success the lock stays pending until a confirmed state differs
    /// from the one at issue time, or the last follow-up probe has run.
    pub async fn issue(
        &self,
        id: DeviceId,
        action: ControlAction,
    ) -> Result<ControlAck, CoreError> {
        let device = self
            .store
            .device(id)
            .ok_or(CoreError::DeviceNotFound { id })?;
        if !device.is_online {
            debug!(%id, %action, "refusing command for offline lock");
            return Err(CoreError::DeviceOffline { id });
        }
        let session = self.client.session();
        if !session.is_authenticated() {
            return Err(CoreError::NotAuthenticated);
        }

        let generation = session.generation();
        let issued_at = Instant::now();
        let ticket = self.store.begin_pending(id, action, device.status.is_locked);
        info!(%id, %action, name = %device.name, "issuing lock command");

        let ack = match self.client.control_lock(id.get(), action).await {
            Ok(ack) => ack,
            Err(e) => {
                self.store.force_clear_pending(id, ticket.nonce);
                warn!(%id, %action, error = %e, "lock command failed");
                return Err(e.into());
            }
        };

        if self.store.holds_pending(&ticket) {
            tokio::spawn(self.clone().follow_up(ticket, action, issued_at, generation));
        } else {
            debug!(%id, "command confirmed before follow-up started");
        }
        Ok(ack)
    }

    /// Flip the lock: unlock if locked, lock if unlocked.
    pub async fn toggle(&self, id: DeviceId) -> Result<ControlAck, CoreError> {
        let device = self
            .store
            .device(id)
            .ok_or(CoreError::DeviceNotFound { id })?;
        let action = if device.is_locked() {
            ControlAction::Unlock
        } else {
            ControlAction::Lock
        };
        self.issue(id, action).await
    }

    /// Probe the lock at each offset from `issued_at` until the marker is
    /// resolved, replaced, or cancelled.
    ///
    /// Each probe is cut off at the next offset, and the marker is
    /// force-cleared as soon as the last offset is reached. The last probe
    /// runs after the clear.
    async fn follow_up(
        self,
        ticket: PendingTicket,
        action: ControlAction,
        issued_at: Instant,
        generation: u64,
    ) {
        let id = ticket.id;
        let Some((&last, earlier)) = self.probe_offsets.split_last() else {
            self.store.force_clear_pending(id, ticket.nonce);
            return;
        };
        let final_deadline = issued_at + last;

        for (i, offset) in earlier.iter().copied().enumerate() {
            tokio::select! {
                biased;
                () = ticket.cancel.cancelled() => {
                    debug!(%id, "follow-up cancelled");
                    return;
                }
                () = tokio::time::sleep_until(issued_at + offset) => {}
            }
            if !self.store.touch_pending(&ticket) {
                return;
            }

            let cutoff = earlier.get(i + 1).map_or(final_deadline, |next| issued_at + *next);
            match self.probe(&ticket, cutoff, generation).await {
                ProbeOutcome::Applied | ProbeOutcome::Inconclusive => {}
                ProbeOutcome::Abandoned => return,
            }
            if !self.store.holds_pending(&ticket) {
                return;
            }
        }

        tokio::select! {
            biased;
            () = ticket.cancel.cancelled() => return,
            () = tokio::time::sleep_until(final_deadline) => {}
        }
        if !self.store.force_clear_pending(id, ticket.nonce) {
            return;
        }
        let error = CoreError::CommandUnconfirmed { id, action };
        warn!(%id, error = %error, "follow-up deadline reached, clearing pending marker");

        // The chain's token is cancelled by the clear above; this last read
        // only refreshes the stored state.
        match self.client.get_lock(id.get()).await {
            Ok(record) if self.client.session().generation() == generation => {
                self.store.apply_probe(LockDevice::from(record));
            }
            Ok(_) => {}
            Err(e) => debug!(%id, error = %e, "final follow-up probe failed"),
        }
    }

    /// One `GET /locks/{id}`, cut off at `cutoff`. Results from an older
    /// session are dropped.
    async fn probe(
        &self,
        ticket: &PendingTicket,
        cutoff: Instant,
        generation: u64,
    ) -> ProbeOutcome {
        let id = ticket.id;
        let result = tokio::select! {
            biased;
            () = ticket.cancel.cancelled() => return ProbeOutcome::Abandoned,
            result = tokio::time::timeout_at(cutoff, self.client.get_lock(id.get())) => result,
        };
        match result {
            Ok(Ok(record)) => {
                if self.client.session().generation() != generation {
                    debug!(%id, "session changed, dropping probe result");
                    return ProbeOutcome::Abandoned;
                }
                self.store.apply_probe(LockDevice::from(record));
                ProbeOutcome::Applied
            }
            Ok(Err(e)) if e.is_session_expired() => ProbeOutcome::Abandoned,
            Ok(Err(e)) => {
                debug!(%id, error = %e, "follow-up probe failed");
                ProbeOutcome::Inconclusive
            }
            Err(_) => {
                debug!(%id, "follow-up probe cut off at next offset");
                ProbeOutcome::Inconclusive
            }
        }
    }
}
