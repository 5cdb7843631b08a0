// ── Notification feed ──
//
// A `PollLoop` over the unread page plus the on-demand operations
// (full fetch, mark read, delete) that share its in-flight flag.
// Poll failures are logged and swallowed here; user-initiated mutations
// return their error.

use std::sync::Arc;
use std::time::Duration;

use lockdeck_api::{LockClient, NotificationQuery, SessionContext};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::scheduler::{PollJob, PollLoop, PollOptions, Scheduler, SchedulerState, TickOutcome};
use crate::error::CoreError;
use crate::model::Notification;
use crate::store::DataStore;

/// Fetches the unread page and replaces the store's notification list.
pub struct NotificationJob {
    client: Arc<LockClient>,
    store: Arc<DataStore>,
}

impl PollJob for NotificationJob {
    type Output = (Vec<Notification>, u64);

    fn name(&self) -> &'static str {
        "notifications"
    }

    async fn fetch(&self) -> Result<Self::Output, CoreError> {
        let page = self
            .client
            .list_notifications(NotificationQuery::unread())
            .await?;
        let list = page.notifications.into_iter().map(Notification::from).collect();
        Ok((list, page.unread_count))
    }

    fn apply(&self, (list, unread_count): Self::Output) {
        self.store.replace_notifications(list, unread_count);
    }
}

/// Periodic notification polling with self-stop after repeated failures.
#[derive(Clone)]
pub struct NotificationFeed {
    poll: PollLoop<NotificationJob>,
    client: Arc<LockClient>,
    store: Arc<DataStore>,
    restart_delay: Duration,
}

impl NotificationFeed {
    pub fn new(
        client: Arc<LockClient>,
        store: Arc<DataStore>,
        interval: Duration,
        failure_threshold: u32,
        restart_delay: Duration,
    ) -> Self {
        let job = NotificationJob {
            client: Arc::clone(&client),
            store: Arc::clone(&store),
        };
        let options = PollOptions::every(interval).stop_after_failures(failure_threshold);
        let poll = PollLoop::new(job, Arc::clone(client.session()), options);
        Self {
            poll,
            client,
            store,
            restart_delay,
        }
    }

    fn session(&self) -> &Arc<SessionContext> {
        self.client.session()
    }

    pub async fn start(&self) -> Result<(), CoreError> {
        self.poll.start().await
    }

    pub async fn stop(&self) {
        self.poll.stop().await;
    }

    /// Stop, wait the restart delay, start again.
    pub async fn restart(&self) -> Result<(), CoreError> {
        self.poll.stop().await;
        tokio::time::sleep(self.restart_delay).await;
        info!("restarting notification feed");
        self.poll.start().await
    }

    pub async fn tick(&self) -> TickOutcome {
        self.poll.tick().await
    }

    pub fn state(&self) -> SchedulerState {
        self.poll.state()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SchedulerState> {
        self.poll.subscribe_state()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.poll.consecutive_failures()
    }

    /// Fetch read and unread notifications, replacing the store's list.
    ///
    /// Returns `false` without fetching if a poll is outstanding, and
    /// `false` if the fetch failed or the session changed underneath it.
    pub async fn fetch_all(&self) -> bool {
        let Some(_guard) = self.poll.try_begin() else {
            debug!("notification fetch outstanding, skipping full fetch");
            return false;
        };
        let generation = self.session().generation();

        match self.client.list_notifications(NotificationQuery::all()).await {
            Ok(page) if self.session().generation() == generation => {
                let list = page.notifications.into_iter().map(Notification::from).collect();
                self.store.replace_notifications(list, page.unread_count);
                true
            }
            Ok(_) => {
                debug!("session changed during full fetch, discarding");
                false
            }
            Err(e) => {
                warn!(error = %e, "full notification fetch failed");
                false
            }
        }
    }

    pub async fn mark_read(&self, id: u64) -> Result<(), CoreError> {
        self.client.mark_notification_read(id).await?;
        self.store.mark_notification_read(id);
        Ok(())
    }

    pub async fn mark_all_read(&self) -> Result<(), CoreError> {
        self.client.mark_all_notifications_read().await?;
        self.store.mark_all_notifications_read();
        Ok(())
    }

    pub async fn delete(&self, id: u64) -> Result<(), CoreError> {
        self.client.delete_notification(id).await?;
        self.store.remove_notification(id);
        Ok(())
    }
}

impl Scheduler for NotificationFeed {
    async fn start(&self) -> Result<(), CoreError> {
        NotificationFeed::start(self).await
    }

    async fn stop(&self) {
        NotificationFeed::stop(self).await;
    }

    async fn tick(&self) -> TickOutcome {
        NotificationFeed::tick(self).await
    }

    fn state(&self) -> SchedulerState {
        NotificationFeed::state(self)
    }
}
