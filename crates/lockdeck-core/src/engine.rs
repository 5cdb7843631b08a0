// ── Sync engine ──
//
// Facade over the session, client, store, and background schedulers.
// Owns the session watcher that tears everything down when the session
// expires.

use std::collections::BTreeSet;
use std::sync::{Arc, Weak};

use lockdeck_api::{
    ControlAck, ControlAction, LockClient, NewUser, Role, SessionContext, SessionState,
    UserProfile, UserUpdate,
};
use secrecy::SecretString;
use strum::Display;
use tokio::sync::{Mutex, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::error::CoreError;
use crate::model::{DeviceId, FleetSummary, FleetViews, LockDevice, Notification};
use crate::store::DataStore;
use crate::stream::EntityStream;
use crate::sync::{
    CommandDispatcher, DirectoryJob, NotificationFeed, PollLoop, PollOptions, StatusJob,
    TickOutcome,
};

// ── SyncState ────────────────────────────────────────────────────

/// Engine-level state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum SyncState {
    /// Not polling. Snapshots may still hold data from a manual refresh.
    Idle,
    Syncing,
    /// The session died; the store was cleared. Log in again to continue.
    SessionExpired,
}

// ── SyncEngine ───────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<EngineInner>`.
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    config: SyncConfig,
    client: Arc<LockClient>,
    store: Arc<DataStore>,
    directory: PollLoop<DirectoryJob>,
    status: Option<PollLoop<StatusJob>>,
    feed: NotificationFeed,
    commands: CommandDispatcher,
    sync_state: watch::Sender<SyncState>,
    watcher: Mutex<Option<CancellationToken>>,
}

impl SyncEngine {
    /// Build an engine with its own HTTP client. Does not log in.
    pub fn new(config: SyncConfig) -> Result<Self, CoreError> {
        let session = SessionContext::shared();
        let client = LockClient::new(config.base_url.clone(), session, &config.transport())?;
        Ok(Self::with_client(config, client))
    }

    /// Build an engine around an existing client. The client's session
    /// becomes the engine's session.
    pub fn with_client(config: SyncConfig, client: LockClient) -> Self {
        let client = Arc::new(client);
        let session = Arc::clone(client.session());
        let store = Arc::new(DataStore::with_low_battery_threshold(
            config.low_battery_threshold,
        ));

        let directory = PollLoop::new(
            DirectoryJob::new(Arc::clone(&client), Arc::clone(&store)),
            Arc::clone(&session),
            PollOptions::every(config.directory_interval),
        );
        let status = config.status_interval.map(|interval| {
            PollLoop::new(
                StatusJob::new(Arc::clone(&client), Arc::clone(&store)),
                Arc::clone(&session),
                PollOptions::every(interval),
            )
        });
        let feed = NotificationFeed::new(
            Arc::clone(&client),
            Arc::clone(&store),
            config.notification_interval,
            config.notification_failure_threshold,
            config.notification_restart_delay,
        );
        let commands = CommandDispatcher::new(
            Arc::clone(&client),
            Arc::clone(&store),
            config.probe_offsets.clone(),
        );
        let (sync_state, _) = watch::channel(SyncState::Idle);

        Self {
            inner: Arc::new(EngineInner {
                config,
                client,
                store,
                directory,
                status,
                feed,
                commands,
                sync_state,
                watcher: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<DataStore> {
        &self.inner.store
    }

    pub fn client(&self) -> &Arc<LockClient> {
        &self.inner.client
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        self.inner.client.session()
    }

    pub fn notification_feed(&self) -> &NotificationFeed {
        &self.inner.feed
    }

    // ── Session lifecycle ────────────────────────────────────────

    /// Authenticate and start watching the session for expiry.
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<UserProfile, CoreError> {
        let user = self.inner.client.login(username, password).await?;
        self.ensure_session_watcher().await;
        self.inner.sync_state.send_if_modified(|state| {
            let was_expired = *state == SyncState::SessionExpired;
            if was_expired {
                *state = SyncState::Idle;
            }
            was_expired
        });
        info!(user = %user.username, "logged in");
        Ok(user)
    }

    /// Stop syncing, end the server session, and forget all local state.
    ///
    /// A failed server-side logout is logged; the local session is
    /// cleared regardless.
    pub async fn logout(&self) {
        self.stop_sync().await;
        if let Some(cancel) = self.inner.watcher.lock().await.take() {
            cancel.cancel();
        }
        if let Err(e) = self.inner.client.logout().await {
            warn!(error = %e, "logout failed (non-fatal)");
        }
        self.inner.store.clear();
        self.inner.sync_state.send_replace(SyncState::Idle);
        debug!("logged out");
    }

    /// Start every scheduler. Each runs one fetch immediately.
    pub async fn start_sync(&self) -> Result<(), CoreError> {
        if !self.session().is_authenticated() {
            return Err(CoreError::NotAuthenticated);
        }
        self.ensure_session_watcher().await;

        self.inner.directory.start().await?;
        if let Some(status) = &self.inner.status {
            status.start().await?;
        }
        self.inner.feed.start().await?;

        self.inner.sync_state.send_replace(SyncState::Syncing);
        info!("sync started");
        Ok(())
    }

    /// Stop every scheduler and cancel all pending follow-up chains.
    pub async fn stop_sync(&self) {
        self.halt_all().await;
        self.inner.sync_state.send_if_modified(|state| {
            let was_syncing = *state == SyncState::Syncing;
            if was_syncing {
                *state = SyncState::Idle;
            }
            was_syncing
        });
    }

    /// Run one directory refresh now and wait for it.
    ///
    /// If a refresh is already outstanding this returns immediately.
    pub async fn refresh_now(&self) -> Result<(), CoreError> {
        match self.inner.directory.tick().await {
            TickOutcome::Failed(e) => Err(e),
            TickOutcome::Applied | TickOutcome::Skipped | TickOutcome::Discarded => Ok(()),
        }
    }

    // ── Commands ─────────────────────────────────────────────────

    pub async fn issue_command(
        &self,
        id: DeviceId,
        action: ControlAction,
    ) -> Result<ControlAck, CoreError> {
        self.inner.commands.issue(id, action).await
    }

    pub async fn toggle_lock(&self, id: DeviceId) -> Result<ControlAck, CoreError> {
        self.inner.commands.toggle(id).await
    }

    /// Wait until `id` has no pending command. Returns immediately if none.
    pub async fn wait_settled(&self, id: DeviceId) {
        let mut rx = self.inner.store.subscribe_pending();
        // Only errors once the store is dropped, which `self` prevents.
        let _ = rx.wait_for(|pending| !pending.contains(&id)).await;
    }

    // ── User administration ──────────────────────────────────────

    /// The logged-in operator, if any.
    pub fn current_user(&self) -> Option<Arc<UserProfile>> {
        self.session().user()
    }

    /// Whether the logged-in operator holds `role`. Admins hold every role.
    pub fn has_role(&self, role: Role) -> bool {
        self.current_user().is_some_and(|user| user.has_role(role))
    }

    pub async fn list_users(&self) -> Result<Vec<UserProfile>, CoreError> {
        self.require_role(Role::Admin)?;
        Ok(self.inner.client.list_users().await?)
    }

    pub async fn create_user(
        &self,
        user: &NewUser,
        password: &SecretString,
    ) -> Result<UserProfile, CoreError> {
        self.require_role(Role::Admin)?;
        let created = self.inner.client.create_user(user, password).await?;
        info!(username = %created.username, "user created");
        Ok(created)
    }

    pub async fn update_user(
        &self,
        id: u64,
        update: &UserUpdate,
    ) -> Result<UserProfile, CoreError> {
        self.require_role(Role::Admin)?;
        if update.is_empty() {
            return Err(CoreError::Rejected {
                message: "nothing to update".into(),
            });
        }
        Ok(self.inner.client.update_user(id, update).await?)
    }

    pub async fn delete_user(&self, id: u64) -> Result<(), CoreError> {
        self.require_role(Role::Admin)?;
        self.inner.client.delete_user(id).await?;
        info!(id, "user deleted");
        Ok(())
    }

    /// Checked locally so a guest never reaches the admin endpoints.
    fn require_role(&self, role: Role) -> Result<(), CoreError> {
        if !self.session().is_authenticated() {
            return Err(CoreError::NotAuthenticated);
        }
        if self.has_role(role) {
            Ok(())
        } else {
            Err(CoreError::Forbidden {
                message: format!("{role} role required"),
            })
        }
    }

    // ── State observation ────────────────────────────────────────

    pub fn sync_state(&self) -> SyncState {
        *self.inner.sync_state.borrow()
    }

    pub fn subscribe_sync_state(&self) -> watch::Receiver<SyncState> {
        self.inner.sync_state.subscribe()
    }

    // ── Snapshot accessors (delegate to DataStore) ───────────────

    pub fn devices_snapshot(&self) -> Arc<Vec<Arc<LockDevice>>> {
        self.inner.store.devices_snapshot()
    }

    pub fn device(&self, id: DeviceId) -> Option<Arc<LockDevice>> {
        self.inner.store.device(id)
    }

    pub fn devices(&self) -> EntityStream<LockDevice> {
        self.inner.store.subscribe_devices()
    }

    pub fn online_devices(&self) -> Arc<Vec<Arc<LockDevice>>> {
        self.inner.store.online_devices()
    }

    pub fn offline_devices(&self) -> Arc<Vec<Arc<LockDevice>>> {
        self.inner.store.offline_devices()
    }

    pub fn low_battery_devices(&self) -> Arc<Vec<Arc<LockDevice>>> {
        self.inner.store.low_battery_devices()
    }

    pub fn locked_count(&self) -> usize {
        self.inner.store.locked_count()
    }

    pub fn unlocked_count(&self) -> usize {
        self.inner.store.unlocked_count()
    }

    pub fn summary(&self) -> FleetSummary {
        self.inner.store.summary()
    }

    pub fn subscribe_views(&self) -> watch::Receiver<Arc<FleetViews>> {
        self.inner.store.subscribe_views()
    }

    pub fn is_pending(&self, id: DeviceId) -> bool {
        self.inner.store.is_pending(id)
    }

    pub fn pending_ids(&self) -> Arc<BTreeSet<DeviceId>> {
        self.inner.store.pending_ids()
    }

    pub fn notifications_snapshot(&self) -> Arc<Vec<Arc<Notification>>> {
        self.inner.store.notifications_snapshot()
    }

    pub fn unread_count(&self) -> u64 {
        self.inner.store.unread_count()
    }

    // ── Internals ────────────────────────────────────────────────

    async fn halt_all(&self) {
        self.inner.directory.stop().await;
        if let Some(status) = &self.inner.status {
            status.stop().await;
        }
        self.inner.feed.stop().await;
        self.inner.store.cancel_all_pending();
    }

    async fn ensure_session_watcher(&self) {
        let mut slot = self.inner.watcher.lock().await;
        if slot.is_some() {
            return;
        }
        let cancel = CancellationToken::new();
        let rx = self.session().subscribe();
        tokio::spawn(session_watch_task(Arc::downgrade(&self.inner), rx, cancel.clone()));
        *slot = Some(cancel);
    }

    /// Session expired: stop everything and drop all session-scoped data.
    async fn teardown(&self) {
        self.halt_all().await;
        self.inner.store.clear();
        self.inner.sync_state.send_replace(SyncState::SessionExpired);
    }
}

impl Drop for EngineInner {
    fn drop(&mut self) {
        if let Some(cancel) = self.watcher.get_mut().take() {
            cancel.cancel();
        }
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Exits once the engine is dropped or the watcher is cancelled.
async fn session_watch_task(
    engine: Weak<EngineInner>,
    mut rx: watch::Receiver<SessionState>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *rx.borrow_and_update();
                if state == SessionState::Expired {
                    let Some(inner) = engine.upgrade() else {
                        break;
                    };
                    warn!("session expired, stopping sync and clearing local state");
                    SyncEngine { inner }.teardown().await;
                }
            }
        }
    }
    debug!("session watcher exited");
}
