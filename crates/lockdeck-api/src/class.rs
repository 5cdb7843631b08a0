// Request classes
//
// Every outbound request carries a class tag. The class selects the
// timeout, the scheduling priority, and whether the retry policy applies.

use std::time::Duration;

use strum::{Display, EnumString};

/// Endpoint category of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum RequestClass {
    /// Login, refresh, logout.
    Auth,
    /// Lock/unlock actuation.
    DeviceCommand,
    /// Directory and single-device reads.
    DeviceQuery,
    /// Notification feed traffic. Best effort, never retried.
    Notification,
    /// Operator account administration.
    Account,
}

/// Relative importance of a request class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Priority {
    Low,
    Normal,
    High,
}

impl RequestClass {
    pub fn priority(self) -> Priority {
        match self {
            Self::Auth | Self::DeviceCommand => Priority::High,
            Self::DeviceQuery | Self::Account => Priority::Normal,
            Self::Notification => Priority::Low,
        }
    }

    /// Whether a 401 on this class goes through refresh-and-replay.
    pub fn refreshes_on_unauthorized(self) -> bool {
        !matches!(self, Self::Auth)
    }
}

/// Per-class request timeouts.
///
/// `notification` is always strictly shorter than `baseline`; a config
/// that says otherwise is clamped by [`ClassTimeouts::for_class`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassTimeouts {
    pub baseline: Duration,
    pub notification: Duration,
}

impl Default for ClassTimeouts {
    fn default() -> Self {
        Self {
            baseline: Duration::from_secs(10),
            notification: Duration::from_secs(8),
        }
    }
}

impl ClassTimeouts {
    pub fn for_class(&self, class: RequestClass) -> Duration {
        match class {
            RequestClass::Auth
            | RequestClass::DeviceCommand
            | RequestClass::DeviceQuery
            | RequestClass::Account => self.baseline,
            RequestClass::Notification => {
                if self.notification < self.baseline {
                    self.notification
                } else {
                    self.baseline.mul_f64(0.8)
                }
            }
        }
    }
}
