// ── Lock directory polling ──
//
// The full directory refresh replaces the store wholesale; the lighter
// status poll merges online/locked/battery fields into known locks.

use std::sync::Arc;

use lockdeck_api::LockClient;

use super::scheduler::PollJob;
use crate::error::CoreError;
use crate::model::{LockDevice, StatusUpdate};
use crate::store::DataStore;

/// Fetches every lock and replaces the store contents.
pub struct DirectoryJob {
    client: Arc<LockClient>,
    store: Arc<DataStore>,
}

impl DirectoryJob {
    pub fn new(client: Arc<LockClient>, store: Arc<DataStore>) -> Self {
        Self { client, store }
    }
}

impl PollJob for DirectoryJob {
    type Output = Vec<LockDevice>;

    fn name(&self) -> &'static str {
        "directory"
    }

    async fn fetch(&self) -> Result<Vec<LockDevice>, CoreError> {
        let records = self.client.list_locks().await?;
        Ok(records.into_iter().map(LockDevice::from).collect())
    }

    fn apply(&self, devices: Vec<LockDevice>) {
        self.store.replace_all(devices);
    }
}

/// Fetches status for every lock and merges it into the store.
pub struct StatusJob {
    client: Arc<LockClient>,
    store: Arc<DataStore>,
}

impl StatusJob {
    pub fn new(client: Arc<LockClient>, store: Arc<DataStore>) -> Self {
        Self { client, store }
    }
}

impl PollJob for StatusJob {
    type Output = Vec<StatusUpdate>;

    fn name(&self) -> &'static str {
        "status"
    }

    async fn fetch(&self) -> Result<Vec<StatusUpdate>, CoreError> {
        let entries = self.client.list_lock_status().await?;
        Ok(entries.into_iter().map(StatusUpdate::from).collect())
    }

    fn apply(&self, updates: Vec<StatusUpdate>) {
        self.store.apply_status(updates);
    }
}
