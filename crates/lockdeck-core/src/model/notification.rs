use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry of the operator's notification feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: u64,
    /// Server-side category, e.g. `low_battery` or `lock_offline`.
    pub kind: String,
    pub message: String,
    pub created_at: Option<DateTime<Utc>>,
    pub is_read: bool,
}
