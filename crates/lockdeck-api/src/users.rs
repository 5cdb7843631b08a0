// User administration endpoints
//
// The backend only serves these to admins. Callers that want to fail
// before the round trip can check `UserProfile::has_role` first.

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::class::RequestClass;
use crate::client::{LockClient, Request};
use crate::error::Error;
use crate::models::{CreateUserRequest, NewUser, UserProfile, UserUpdate};

impl LockClient {
    /// `GET /users`
    pub async fn list_users(&self) -> Result<Vec<UserProfile>, Error> {
        self.send(&Request::get("users", RequestClass::Account)).await
    }

    /// Create an operator account and return it as stored.
    ///
    /// `POST /users`
    pub async fn create_user(
        &self,
        user: &NewUser,
        password: &SecretString,
    ) -> Result<UserProfile, Error> {
        debug!(username = %user.username, role = %user.role, "creating user");
        let request = Request::post("users", RequestClass::Account).json(&CreateUserRequest {
            user,
            password: password.expose_secret(),
        })?;
        self.send(&request).await
    }

    /// `PUT /users/{id}`
    pub async fn update_user(&self, id: u64, update: &UserUpdate) -> Result<UserProfile, Error> {
        let request = Request::put(format!("users/{id}"), RequestClass::Account).json(update)?;
        self.send(&request).await
    }

    /// `DELETE /users/{id}`
    pub async fn delete_user(&self, id: u64) -> Result<(), Error> {
        debug!(id, "deleting user");
        self.send_unit(&Request::delete(format!("users/{id}"), RequestClass::Account)).await
    }
}
