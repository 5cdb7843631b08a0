// Wire models
//
// Every service wraps its payload in `{ status, message, data }`.
// These types mirror the JSON exactly; `lockdeck-core` converts them
// into domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The standard response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    pub fn is_error(&self) -> bool {
        self.status.as_deref() == Some("error")
    }
}

// ── Device directory ────────────────────────────────────────────────

/// One lock as returned by `GET /locks` and `GET /locks/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockRecord {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, alias = "hardwareId")]
    pub hardware_id: Option<String>,
    #[serde(default)]
    pub is_online: bool,
    #[serde(default)]
    pub status: LockStatusPayload,
    #[serde(default)]
    pub config: serde_json::Value,
}

/// Server-confirmed lock status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockStatusPayload {
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default)]
    pub battery_level: u8,
    #[serde(default)]
    pub last_activity: Option<DateTime<Utc>>,
}

/// Lightweight entry from `GET /locks/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockStatusEntry {
    pub id: u64,
    #[serde(default)]
    pub is_online: Option<bool>,
    pub status: LockStatusPayload,
}

/// Action body for `POST /locks/{id}/control`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ControlAction {
    Lock,
    Unlock,
}

impl ControlAction {
    /// The `is_locked` value this action asks for.
    pub fn target_locked(self) -> bool {
        matches!(self, Self::Lock)
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ControlRequest {
    pub action: ControlAction,
}

/// A control request the server accepted. The device has not confirmed yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControlAck {
    pub message: Option<String>,
    pub data: Option<serde_json::Value>,
}

// ── Auth ────────────────────────────────────────────────────────────

/// Operator roles known to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    User,
    Guest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub id: Option<u64>,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Kept as a string so unknown roles still deserialize.
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl UserProfile {
    /// The role, if it is one this client knows.
    pub fn known_role(&self) -> Option<Role> {
        self.role.as_deref()?.parse().ok()
    }

    /// Whether this user may act as `role`. Admins hold every role.
    pub fn has_role(&self, role: Role) -> bool {
        self.known_role().is_some_and(|held| held == role || held == Role::Admin)
    }
}

// ── Users ───────────────────────────────────────────────────────────

/// Body of `POST /users`, minus the password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewUser {
    pub username: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct CreateUserRequest<'a> {
    #[serde(flatten)]
    pub user: &'a NewUser,
    pub password: &'a str,
}

/// Body of `PUT /users/{id}`. Unset fields are left alone by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginData {
    pub token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RefreshData {
    pub token: String,
}

// ── Notifications ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: u64,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, alias = "created_at")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_read: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NotificationPage {
    #[serde(default)]
    pub notifications: Vec<NotificationRecord>,
    #[serde(default)]
    pub unread_count: u64,
}

/// Query for `GET /notifications`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationQuery {
    pub unread_only: bool,
    pub limit: u32,
}

impl NotificationQuery {
    /// Small payload used by the recurring poll.
    pub fn unread() -> Self {
        Self {
            unread_only: true,
            limit: 10,
        }
    }

    /// Full listing used on demand.
    pub fn all() -> Self {
        Self {
            unread_only: false,
            limit: 50,
        }
    }
}
