// Authenticated HTTP client
//
// Wraps `reqwest::Client` with bearer-token attachment, local expiry
// pre-check, class-based timeouts, bounded retry, envelope unwrapping,
// and the one-level-deep 401 refresh-and-replay path. Endpoint methods
// live in per-service files as inherent impls.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{Instrument, debug, debug_span, warn};
use url::Url;

use crate::class::{ClassTimeouts, RequestClass};
use crate::error::Error;
use crate::models::{ApiEnvelope, RefreshData};
use crate::retry::{RetryDecision, RetryPolicy};
use crate::session::{SessionContext, SessionState};
use crate::token;
use crate::transport::TransportConfig;

/// Description of one logical request.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub query: Vec<(&'static str, String)>,
    pub body: Option<serde_json::Value>,
    pub class: RequestClass,
    /// Attach the bearer token and run the expiry pre-check.
    pub authenticated: bool,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>, class: RequestClass) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            class,
            authenticated: true,
        }
    }

    pub fn get(path: impl Into<String>, class: RequestClass) -> Self {
        Self::new(Method::GET, path, class)
    }

    pub fn post(path: impl Into<String>, class: RequestClass) -> Self {
        Self::new(Method::POST, path, class)
    }

    pub fn put(path: impl Into<String>, class: RequestClass) -> Self {
        Self::new(Method::PUT, path, class)
    }

    pub fn delete(path: impl Into<String>, class: RequestClass) -> Self {
        Self::new(Method::DELETE, path, class)
    }

    pub fn query(mut self, key: &'static str, value: impl ToString) -> Self {
        self.query.push((key, value.to_string()));
        self
    }

    pub fn json(mut self, body: &impl Serialize) -> Result<Self, Error> {
        self.body = Some(serde_json::to_value(body).map_err(|e| Error::Deserialization {
            message: format!("failed to encode request body: {e}"),
            body: String::new(),
        })?);
        Ok(self)
    }

    /// Skip bearer attachment (login, refresh).
    pub fn unauthenticated(mut self) -> Self {
        self.authenticated = false;
        self
    }
}

/// Raw HTTP client for the lock backend.
///
/// Cheap to share behind an `Arc`. The bearer token is read from the
/// [`SessionContext`] on every attempt and never cached here.
pub struct LockClient {
    http: reqwest::Client,
    base_url: Url,
    session: Arc<SessionContext>,
    timeouts: ClassTimeouts,
    retry: RetryPolicy,
}

impl LockClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// `base_url` is the API root, e.g. `http://localhost:8080/api`.
    pub fn new(
        base_url: Url,
        session: Arc<SessionContext>,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            session,
            timeouts: transport.timeouts,
            retry: transport.retry.clone(),
        })
    }

    /// Create a client around a pre-built `reqwest::Client` with default
    /// timeouts and retry policy.
    pub fn with_client(http: reqwest::Client, base_url: Url, session: Arc<SessionContext>) -> Self {
        Self {
            http,
            base_url,
            session,
            timeouts: ClassTimeouts::default(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: ClassTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builder ──────────────────────────────────────────────────

    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        let full = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Ok(Url::parse(&full)?)
    }

    // ── Public send API ──────────────────────────────────────────────

    /// Send a request and return the unwrapped `data` payload.
    pub async fn send<T: DeserializeOwned>(&self, request: &Request) -> Result<T, Error> {
        let (envelope, body) = self.send_envelope::<T>(request).await?;
        envelope.data.ok_or_else(|| Error::Deserialization {
            message: format!("response to {} {} carried no data", request.method, request.path),
            body,
        })
    }

    /// Send a request whose payload, if any, is not needed.
    pub async fn send_unit(&self, request: &Request) -> Result<(), Error> {
        self.send_envelope::<serde_json::Value>(request).await?;
        Ok(())
    }

    /// Send a request and return the whole envelope plus the raw body.
    ///
    /// A 401 on a non-auth class triggers exactly one refresh and one
    /// replay. A second 401 is returned as [`Error::Unauthorized`].
    pub async fn send_envelope<T: DeserializeOwned>(
        &self,
        request: &Request,
    ) -> Result<(ApiEnvelope<T>, String), Error> {
        let span = debug_span!(
            "request",
            method = %request.method,
            path = %request.path,
            class = %request.class,
            priority = %request.class.priority(),
        );

        async {
            let serial = self.session.token_serial();
            match self.send_with_retry(request).await {
                Err(Error::Unauthorized) if request.class.refreshes_on_unauthorized() => {
                    debug!("401 received, refreshing token");
                    self.refresh_after_unauthorized(serial).await?;
                    debug!("replaying request after refresh");
                    let body = self.send_with_retry(request).await?;
                    parse_envelope(body)
                }
                other => parse_envelope(other?),
            }
        }
        .instrument(span)
        .await
    }

    // ── Transport mechanics ──────────────────────────────────────────

    async fn send_with_retry(&self, request: &Request) -> Result<String, Error> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.send_once(request).await {
                Ok(body) => return Ok(body),
                Err(err) => match self.retry.decide(request.class, attempt, &err) {
                    RetryDecision::Retry { delay } => {
                        debug!(attempt, ?delay, error = %err, "transient failure, retrying");
                        tokio::time::sleep(delay).await;
                    }
                    RetryDecision::GiveUp => return Err(err),
                },
            }
        }
    }

    /// One HTTP round trip. Maps non-success statuses into errors.
    async fn send_once(&self, request: &Request) -> Result<String, Error> {
        let token = if request.authenticated {
            self.checked_access_token()?
        } else {
            None
        };

        let url = self.url(&request.path)?;
        let timeout = self.timeouts.for_class(request.class);
        let timeout_ms = duration_ms(timeout);

        debug!("{} {}", request.method, url);

        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .timeout(timeout);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }
        if let Some(ref token) = token {
            builder = builder.bearer_auth(token.expose_secret());
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| Error::from_reqwest(e, timeout_ms))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::from_reqwest(e, timeout_ms))?;

        if status.is_success() {
            return Ok(body);
        }
        Err(status_error(request.class, status, &body))
    }

    /// Read the bearer token fresh and reject it locally if its `exp` has passed.
    fn checked_access_token(&self) -> Result<Option<SecretString>, Error> {
        let Some(token) = self.session.access_token() else {
            return Ok(None);
        };
        if token::is_expired_at(token.expose_secret(), Utc::now()) {
            warn!("bearer token expired locally, tearing down session");
            self.session.expire();
            return Err(Error::SessionExpired);
        }
        Ok(Some(token))
    }

    /// Refresh the access token after a 401.
    ///
    /// Concurrent callers serialize on the session's refresh lock; whoever
    /// arrives after a successful refresh just replays.
    async fn refresh_after_unauthorized(&self, failed_serial: u64) -> Result<(), Error> {
        let _guard = self.session.lock_refresh().await;

        if self.session.state() != SessionState::Authenticated {
            return Err(Error::SessionExpired);
        }
        if self.session.token_serial() != failed_serial {
            debug!("token already refreshed by a concurrent request");
            return Ok(());
        }

        let generation = self.session.generation();
        let Some(refresh_token) = self.session.refresh_token() else {
            warn!("no refresh token available, evicting session");
            self.session.expire();
            return Err(Error::SessionExpired);
        };

        match self.request_refresh(&refresh_token).await {
            Ok(access) => {
                if self.session.replace_access_token(access, generation) {
                    debug!("access token refreshed");
                    Ok(())
                } else {
                    Err(Error::SessionExpired)
                }
            }
            Err(e) => {
                warn!(error = %e, "token refresh failed, evicting session");
                self.session.expire();
                Err(Error::SessionExpired)
            }
        }
    }

    /// `POST /auth/refresh` without going through refresh-and-replay.
    pub(crate) async fn request_refresh(
        &self,
        refresh_token: &SecretString,
    ) -> Result<SecretString, Error> {
        let request = Request::post("auth/refresh", RequestClass::Auth)
            .unauthenticated()
            .json(&json!({ "refresh_token": refresh_token.expose_secret() }))?;
        let body = self.send_with_retry(&request).await?;
        let (envelope, _): (ApiEnvelope<RefreshData>, String) = parse_envelope(body)?;
        let data = envelope.data.ok_or_else(|| Error::Authentication {
            message: "refresh response carried no token".into(),
        })?;
        Ok(SecretString::from(data.token))
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

/// Parse the `{ status, message, data }` envelope.
///
/// An empty body is an envelope with nothing in it.
fn parse_envelope<T: DeserializeOwned>(body: String) -> Result<(ApiEnvelope<T>, String), Error> {
    let envelope: ApiEnvelope<T> = if body.trim().is_empty() {
        ApiEnvelope {
            status: None,
            message: None,
            data: None,
        }
    } else {
        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: body.clone(),
        })?
    };

    if envelope.is_error() {
        return Err(Error::Rejected {
            message: envelope
                .message
                .clone()
                .unwrap_or_else(|| "request rejected".into()),
        });
    }
    Ok((envelope, body))
}

/// Map a non-success HTTP status to an error for the given class.
fn status_error(class: RequestClass, status: StatusCode, body: &str) -> Error {
    let message = error_message(body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("unexpected status")
            .to_owned()
    });

    match (class, status) {
        (RequestClass::Auth, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) => {
            Error::Authentication { message }
        }
        (_, StatusCode::UNAUTHORIZED) => Error::Unauthorized,
        (_, StatusCode::FORBIDDEN) => Error::Forbidden { message },
        _ => Error::Server {
            status: status.as_u16(),
            message,
        },
    }
}

/// Pull `message` out of an error body, if it is an envelope.
fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ApiEnvelope<serde_json::Value>>(body)
        .ok()
        .and_then(|env| env.message)
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn auth_class_statuses_map_to_authentication() {
        let err = status_error(
            RequestClass::Auth,
            StatusCode::UNAUTHORIZED,
            r#"{"status":"error","message":"bad password"}"#,
        );
        assert!(matches!(err, Error::Authentication { ref message } if message == "bad password"));
    }

    #[test]
    fn other_statuses() {
        assert!(matches!(
            status_error(RequestClass::DeviceQuery, StatusCode::UNAUTHORIZED, ""),
            Error::Unauthorized
        ));
        assert!(matches!(
            status_error(RequestClass::DeviceCommand, StatusCode::FORBIDDEN, ""),
            Error::Forbidden { .. }
        ));
        assert!(matches!(
            status_error(RequestClass::DeviceQuery, StatusCode::BAD_GATEWAY, "oops"),
            Error::Server { status: 502, ref message } if message == "Bad Gateway"
        ));
    }

    #[test]
    fn envelope_parsing() {
        let (env, _) = parse_envelope::<u32>(r#"{"status":"success","data":5}"#.into()).unwrap();
        assert_eq!(env.data, Some(5));

        let (empty, _) = parse_envelope::<u32>(String::new()).unwrap();
        assert!(empty.data.is_none());

        assert!(matches!(
            parse_envelope::<u32>(r#"{"status":"error","message":"jammed"}"#.into()),
            Err(Error::Rejected { ref message }) if message == "jammed"
        ));
        assert!(matches!(
            parse_envelope::<u32>("<html>".into()),
            Err(Error::Deserialization { .. })
        ));
    }

    #[test]
    fn url_joins_without_double_slashes() {
        let client = LockClient::with_client(
            reqwest::Client::new(),
            Url::parse("http://localhost:8080/api/").unwrap(),
            SessionContext::shared(),
        );
        let url = client.url("/locks/3").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/locks/3");
    }
}
