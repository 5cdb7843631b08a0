// Session context
//
// Process-wide bearer-token state shared by the transport and the
// schedulers. Tokens are swapped atomically and must be read fresh for
// every request. Each teardown bumps a generation counter so in-flight
// continuations can tell that the session they started under is gone.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwapOption;
use secrecy::SecretString;
use tokio::sync::{Mutex, MutexGuard, watch};
use tracing::{debug, info};

use crate::models::UserProfile;

/// Observable lifecycle of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No credentials yet, or after an explicit logout.
    Anonymous,
    /// Access token present.
    Authenticated,
    /// Torn down by the transport: local expiry or failed refresh.
    Expired,
}

struct Tokens {
    access: SecretString,
    refresh: Option<SecretString>,
}

/// Shared, explicitly-passed session state.
///
/// Construct one per logged-in operator and hand the same `Arc` to the
/// [`LockClient`](crate::LockClient) and every scheduler.
pub struct SessionContext {
    tokens: ArcSwapOption<Tokens>,
    user: ArcSwapOption<UserProfile>,
    generation: AtomicU64,
    token_serial: AtomicU64,
    state: watch::Sender<SessionState>,
    refresh_lock: Mutex<()>,
}

impl SessionContext {
    pub fn new() -> Self {
        let (state, _) = watch::channel(SessionState::Anonymous);
        Self {
            tokens: ArcSwapOption::empty(),
            user: ArcSwapOption::empty(),
            generation: AtomicU64::new(0),
            token_serial: AtomicU64::new(0),
            state,
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Install a freshly issued token pair and user profile.
    ///
    /// Replacing a live session counts as a teardown of the old one.
    pub fn establish(
        &self,
        access: SecretString,
        refresh: Option<SecretString>,
        user: Option<UserProfile>,
    ) {
        if self.tokens.load().is_some() {
            self.generation.fetch_add(1, Ordering::SeqCst);
        }
        self.tokens.store(Some(Arc::new(Tokens { access, refresh })));
        self.user.store(user.map(Arc::new));
        self.token_serial.fetch_add(1, Ordering::SeqCst);
        self.state.send_replace(SessionState::Authenticated);
        debug!(generation = self.generation(), "session established");
    }

    /// Swap in a refreshed access token, keeping the refresh token.
    ///
    /// Returns `false` if the session was torn down while the refresh was
    /// in flight; the token is dropped in that case.
    pub(crate) fn replace_access_token(&self, access: SecretString, generation: u64) -> bool {
        if self.generation() != generation {
            return false;
        }
        let Some(current) = self.tokens.load_full() else {
            return false;
        };
        self.tokens.store(Some(Arc::new(Tokens {
            access,
            refresh: current.refresh.clone(),
        })));
        self.token_serial.fetch_add(1, Ordering::SeqCst);
        true
    }

    /// Current access token. Never cache this beyond one request.
    pub fn access_token(&self) -> Option<SecretString> {
        self.tokens.load().as_ref().map(|t| t.access.clone())
    }

    pub fn refresh_token(&self) -> Option<SecretString> {
        self.tokens.load().as_ref().and_then(|t| t.refresh.clone())
    }

    pub fn user(&self) -> Option<Arc<UserProfile>> {
        self.user.load_full()
    }

    pub fn is_authenticated(&self) -> bool {
        *self.state.borrow() == SessionState::Authenticated && self.tokens.load().is_some()
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Subscribe to session lifecycle changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Incremented on every teardown and on login over a live session.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Incremented whenever the access token changes.
    pub(crate) fn token_serial(&self) -> u64 {
        self.token_serial.load(Ordering::SeqCst)
    }

    /// Serializes refresh attempts so concurrent 401s share one refresh.
    pub(crate) async fn lock_refresh(&self) -> MutexGuard<'_, ()> {
        self.refresh_lock.lock().await
    }

    /// Evict all credentials and mark the session expired.
    ///
    /// Called by the transport; observers should redirect to login.
    pub fn expire(&self) {
        self.evict(SessionState::Expired);
        info!("session expired, credentials evicted");
    }

    /// Evict all credentials after an explicit logout.
    pub fn clear(&self) {
        self.evict(SessionState::Anonymous);
        debug!("session cleared");
    }

    fn evict(&self, next: SessionState) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.tokens.store(None);
        self.user.store(None);
        self.state.send_replace(next);
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("state", &self.state())
            .field("generation", &self.generation())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    fn secret(s: &str) -> SecretString {
        SecretString::from(s.to_owned())
    }

    #[test]
    fn establish_then_expire() {
        let session = SessionContext::new();
        assert!(!session.is_authenticated());

        session.establish(secret("a"), Some(secret("r")), None);
        assert!(session.is_authenticated());
        assert_eq!(
            session.access_token().as_ref().map(|t| t.expose_secret()),
            Some("a")
        );

        let before = session.generation();
        session.expire();
        assert_eq!(session.state(), SessionState::Expired);
        assert!(session.access_token().is_none());
        assert!(session.refresh_token().is_none());
        assert_eq!(session.generation(), before + 1);
    }

    #[test]
    fn relogin_over_live_session_starts_new_generation() {
        let session = SessionContext::new();
        session.establish(secret("a"), Some(secret("r")), None);
        let first = session.generation();

        session.establish(secret("b"), Some(secret("r2")), None);
        assert_eq!(session.generation(), first + 1);
        assert!(!session.replace_access_token(secret("late"), first));
        assert_eq!(
            session.access_token().as_ref().map(|t| t.expose_secret()),
            Some("b")
        );

        // A fresh login after logout is already covered by the clear.
        session.clear();
        let cleared = session.generation();
        session.establish(secret("c"), None, None);
        assert_eq!(session.generation(), cleared);
    }

    #[test]
    fn stale_refresh_is_dropped() {
        let session = SessionContext::new();
        session.establish(secret("a"), Some(secret("r")), None);
        let generation = session.generation();
        session.clear();

        assert!(!session.replace_access_token(secret("b"), generation));
        assert!(session.access_token().is_none());
    }

    #[test]
    fn refresh_keeps_refresh_token() {
        let session = SessionContext::new();
        session.establish(secret("a"), Some(secret("r")), None);
        let serial = session.token_serial();

        assert!(session.replace_access_token(secret("b"), session.generation()));
        assert_eq!(
            session.access_token().as_ref().map(|t| t.expose_secret()),
            Some("b")
        );
        assert_eq!(
            session.refresh_token().as_ref().map(|t| t.expose_secret()),
            Some("r")
        );
        assert!(session.token_serial() > serial);
    }
}
