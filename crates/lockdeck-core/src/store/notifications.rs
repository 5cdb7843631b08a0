// ── Notification state ──
//
// Ordered notification list plus the server-reported unread count.
// Local mark/delete bookkeeping never drives the count below zero.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use super::DataStore;
use crate::model::Notification;

impl DataStore {
    /// Replace the list with a fetched page.
    pub fn replace_notifications(&self, notifications: Vec<Notification>, unread_count: u64) {
        let list: Vec<Arc<Notification>> = notifications.into_iter().map(Arc::new).collect();
        self.notifications.send_replace(Arc::new(list));
        self.unread_count.send_replace(unread_count);
        self.last_notification_fetch.send_replace(Some(Utc::now()));
    }

    pub fn notifications_snapshot(&self) -> Arc<Vec<Arc<Notification>>> {
        self.notifications.borrow().clone()
    }

    pub fn unread_count(&self) -> u64 {
        *self.unread_count.borrow()
    }

    pub fn last_notification_fetch(&self) -> Option<DateTime<Utc>> {
        *self.last_notification_fetch.borrow()
    }

    pub fn subscribe_notifications(&self) -> watch::Receiver<Arc<Vec<Arc<Notification>>>> {
        self.notifications.subscribe()
    }

    pub fn subscribe_unread_count(&self) -> watch::Receiver<u64> {
        self.unread_count.subscribe()
    }

    /// Mark one notification read locally. Returns `true` if it was unread.
    pub fn mark_notification_read(&self, id: u64) -> bool {
        let was_unread = self.notifications.send_if_modified(|list| {
            let Some(pos) = list.iter().position(|n| n.id == id && !n.is_read) else {
                return false;
            };
            let mut updated = (*list[pos]).clone();
            updated.is_read = true;
            Arc::make_mut(list)[pos] = Arc::new(updated);
            true
        });
        if was_unread {
            self.unread_count.send_modify(|count| *count = count.saturating_sub(1));
        }
        was_unread
    }

    pub fn mark_all_notifications_read(&self) {
        self.notifications.send_modify(|list| {
            let all_read: Vec<Arc<Notification>> = list
                .iter()
                .map(|n| {
                    if n.is_read {
                        Arc::clone(n)
                    } else {
                        Arc::new(Notification {
                            is_read: true,
                            ..(**n).clone()
                        })
                    }
                })
                .collect();
            *list = Arc::new(all_read);
        });
        self.unread_count.send_replace(0);
    }

    /// Remove one notification locally. Returns `true` if it was present.
    pub fn remove_notification(&self, id: u64) -> bool {
        let mut removed_unread = false;
        let removed = self.notifications.send_if_modified(|list| {
            let Some(pos) = list.iter().position(|n| n.id == id) else {
                return false;
            };
            removed_unread = !list[pos].is_read;
            Arc::make_mut(list).remove(pos);
            true
        });
        if removed_unread {
            self.unread_count.send_modify(|count| *count = count.saturating_sub(1));
        }
        removed
    }

    pub fn clear_notifications(&self) {
        self.notifications.send_replace(Arc::new(Vec::new()));
        self.unread_count.send_replace(0);
        self.last_notification_fetch.send_replace(None);
    }
}
