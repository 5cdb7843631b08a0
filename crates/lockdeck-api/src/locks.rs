// Device service endpoints
//
// Directory reads, the lightweight status listing, single-device probes,
// and lock/unlock actuation.

use tracing::debug;

use crate::class::RequestClass;
use crate::client::{LockClient, Request};
use crate::error::Error;
use crate::models::{ControlAck, ControlAction, ControlRequest, LockRecord, LockStatusEntry};

impl LockClient {
    /// List every lock visible to the current user.
    ///
    /// `GET /locks`
    pub async fn list_locks(&self) -> Result<Vec<LockRecord>, Error> {
        debug!("listing locks");
        self.send(&Request::get("locks", RequestClass::DeviceQuery)).await
    }

    /// Fetch one lock. Used by the post-command probes.
    ///
    /// `GET /locks/{id}`
    pub async fn get_lock(&self, id: u64) -> Result<LockRecord, Error> {
        self.send(&Request::get(format!("locks/{id}"), RequestClass::DeviceQuery)).await
    }

    /// Status-only listing for all locks.
    ///
    /// `GET /locks/status`
    pub async fn list_lock_status(&self) -> Result<Vec<LockStatusEntry>, Error> {
        self.send(&Request::get("locks/status", RequestClass::DeviceQuery)).await
    }

    /// Ask the server to lock or unlock a device.
    ///
    /// `POST /locks/{id}/control` with `{"action": "lock" | "unlock"}`.
    /// Success means the server accepted the request; the device state
    /// still has to be observed through a later read.
    pub async fn control_lock(&self, id: u64, action: ControlAction) -> Result<ControlAck, Error> {
        debug!(id, %action, "sending control request");
        let request = Request::post(format!("locks/{id}/control"), RequestClass::DeviceCommand)
            .json(&ControlRequest { action })?;
        let (envelope, _) = self.send_envelope::<serde_json::Value>(&request).await?;
        Ok(ControlAck {
            message: envelope.message,
            data: envelope.data,
        })
    }
}
