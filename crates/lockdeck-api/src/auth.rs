// Auth service endpoints
//
// Login installs the issued tokens into the shared session. A failed
// login leaves any existing session untouched.

use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::class::RequestClass;
use crate::client::{LockClient, Request};
use crate::error::Error;
use crate::models::{LoginData, UserProfile};

impl LockClient {
    /// Authenticate and install the returned tokens.
    ///
    /// `POST /auth/login`
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<UserProfile, Error> {
        let request = Request::post("auth/login", RequestClass::Auth)
            .unauthenticated()
            .json(&json!({
                "username": username,
                "password": password.expose_secret(),
            }))?;

        let data: LoginData = self.send(&request).await?;
        let user = data.user.unwrap_or_else(|| UserProfile {
            id: None,
            username: username.to_owned(),
            email: None,
            role: None,
            name: None,
        });

        self.session().establish(
            SecretString::from(data.token),
            data.refresh_token.map(SecretString::from),
            Some(user.clone()),
        );
        info!(username = %user.username, "logged in");
        Ok(user)
    }

    /// Exchange the stored refresh token for a new access token.
    ///
    /// `POST /auth/refresh`. Returns the new token without installing it;
    /// the transport installs tokens itself on the 401 path.
    pub async fn refresh(&self) -> Result<SecretString, Error> {
        let refresh_token = self.session().refresh_token().ok_or(Error::SessionExpired)?;
        self.request_refresh(&refresh_token).await
    }

    /// End the session server-side, then evict local credentials.
    ///
    /// `POST /auth/logout`. The local session is cleared even when the
    /// server call fails.
    pub async fn logout(&self) -> Result<(), Error> {
        let result = if self.session().is_authenticated() {
            self.send_unit(&Request::post("auth/logout", RequestClass::Auth))
                .await
        } else {
            debug!("logout without an active session");
            Ok(())
        };
        if let Err(ref e) = result {
            warn!(error = %e, "server-side logout failed");
        }
        self.session().clear();
        result
    }
}
