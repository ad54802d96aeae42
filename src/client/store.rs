//! Client session state: the token pair plus the user id it belongs to.
//!
//! All reads and writes of the in-memory state go through one `std::sync::Mutex`,
//! and every mutation is persisted before the lock is released. The lock is never
//! held across an `.await`. Refreshes are single-flight: callers that find an
//! expired access token queue on `refresh_gate` and reuse the winner's result.
//!
//! `epoch` changes on every `set_tokens` and `clear`. A refresh remembers the epoch
//! it started under and only applies its result if nothing changed meanwhile, so a
//! logout or login during an outstanding refresh is never undone. Likewise a
//! rejected request only clears the session if it was sent with the current token.

use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

use super::error::ClientError;
use super::http::RefreshApi;
use super::storage::{AUTH_STORE_KEY, KeyValueStorage, PersistedAuth};
use crate::jwt::{is_expired, now_secs, peek_claims};
use crate::models::TokenPair;

struct SessionState {
    auth: PersistedAuth,
    epoch: u64,
    loading: bool,
}

struct Inner<S> {
    storage: S,
    state: Mutex<SessionState>,
    refresh_gate: tokio::sync::Mutex<()>,
}

/// Shared handle to the session. Clones refer to the same state.
pub struct TokenStore<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for TokenStore<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Seconds since the epoch. A clock before 1970 makes every token look expired.
fn now() -> u64 {
    now_secs().unwrap_or(u64::MAX)
}

impl<S: KeyValueStorage> TokenStore<S> {
    /// Rehydrate from `storage`. Missing or unreadable blobs give an empty session.
    pub fn open(storage: S) -> Self {
        let auth = match storage.read(AUTH_STORE_KEY) {
            Ok(Some(blob)) => serde_json::from_str(&blob).unwrap_or_else(|e| {
                warn!(error = %e, "Discarding unreadable session");
                PersistedAuth::default()
            }),
            Ok(None) => PersistedAuth::default(),
            Err(e) => {
                warn!(error = %e, "Failed to read session");
                PersistedAuth::default()
            }
        };

        Self {
            inner: Arc::new(Inner {
                storage,
                state: Mutex::new(SessionState {
                    auth,
                    epoch: 0,
                    loading: false,
                }),
                refresh_gate: tokio::sync::Mutex::new(()),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn persist(&self, auth: &PersistedAuth) {
        let result = if *auth == PersistedAuth::default() {
            self.inner.storage.remove(AUTH_STORE_KEY)
        } else {
            match serde_json::to_string(auth) {
                Ok(blob) => self.inner.storage.write(AUTH_STORE_KEY, &blob),
                Err(e) => {
                    warn!(error = %e, "Failed to serialize session");
                    return;
                }
            }
        };

        if let Err(e) = result {
            warn!(error = %e, "Failed to persist session");
        }
    }

    /// Copy of the current session.
    pub fn snapshot(&self) -> PersistedAuth {
        self.lock().auth.clone()
    }

    /// True while a refresh is in flight.
    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    /// Store a new pair. The user id is read from the access token without
    /// verification. If it cannot be decoded the previous session is kept.
    pub fn set_tokens(&self, pair: &TokenPair) -> Result<(), ClientError> {
        let mut state = self.lock();
        self.apply(&mut state, pair)
    }

    fn apply(&self, state: &mut SessionState, pair: &TokenPair) -> Result<(), ClientError> {
        let user_id = peek_claims(&pair.token)
            .ok()
            .and_then(|claims| claims.id)
            .ok_or_else(|| {
                warn!("Failed to decode access token; keeping previous session");
                ClientError::DecodeFailure("no user id in access token".to_string())
            })?;

        state.auth = PersistedAuth {
            token: Some(pair.token.clone()),
            refresh_token: Some(pair.refresh_token.clone()),
            user_id: Some(user_id),
        };
        state.epoch += 1;
        self.persist(&state.auth);
        Ok(())
    }

    /// Wipe both tokens and the user id.
    pub fn clear(&self) {
        let mut state = self.lock();
        self.clear_locked(&mut state);
    }

    /// Clear the session only if `token` is still its access token.
    /// Returns whether the session was cleared.
    pub fn clear_if_current(&self, token: &str) -> bool {
        let mut state = self.lock();
        if state.auth.token.as_deref() != Some(token) {
            debug!("Ignoring rejection of a token that is no longer current");
            return false;
        }
        self.clear_locked(&mut state);
        true
    }

    fn clear_locked(&self, state: &mut SessionState) {
        state.auth = PersistedAuth::default();
        state.epoch += 1;
        self.persist(&state.auth);
    }

    /// Current usable access token, or `None` when a refresh is needed.
    /// Clears the session and fails when the refresh token is expired too.
    fn check(&self, now: u64) -> Result<Option<String>, ClientError> {
        let mut state = self.lock();
        if let Some(token) = state.auth.token.as_deref() {
            if !is_expired(Some(token), now) {
                return Ok(Some(token.to_string()));
            }
        }

        if is_expired(state.auth.refresh_token.as_deref(), now) {
            debug!("Session expired");
            self.clear_locked(&mut state);
            return Err(ClientError::login_required());
        }

        Ok(None)
    }

    /// Return a valid access token, refreshing it first if needed.
    ///
    /// Any refresh failure, including the server being unreachable, clears the
    /// session and yields `LoginRequired`.
    pub async fn ensure_access_token<A: RefreshApi>(&self, api: &A) -> Result<String, ClientError> {
        if let Some(token) = self.check(now())? {
            return Ok(token);
        }

        let _gate = self.inner.refresh_gate.lock().await;

        // Someone else may have refreshed (or logged out) while we waited
        if let Some(token) = self.check(now())? {
            return Ok(token);
        }

        let (epoch, refresh_token) = {
            let mut state = self.lock();
            state.loading = true;
            (state.epoch, state.auth.refresh_token.clone().unwrap_or_default())
        };

        let result = api.refresh(&refresh_token).await;

        let mut state = self.lock();
        state.loading = false;

        if state.epoch != epoch {
            debug!("Session changed during refresh; discarding result");
            return match state.auth.token.as_deref() {
                Some(token) if !is_expired(Some(token), now()) => Ok(token.to_string()),
                _ => Err(ClientError::login_required()),
            };
        }

        match result {
            Ok(pair) => match self.apply(&mut state, &pair) {
                Ok(()) => Ok(pair.token),
                Err(_) => {
                    self.clear_locked(&mut state);
                    Err(ClientError::login_required())
                }
            },
            Err(e) => {
                warn!(error = %e, "Token refresh failed");
                self.clear_locked(&mut state);
                Err(ClientError::login_required())
            }
        }
    }

    /// Whether the session is usable, refreshing the access token if it expired.
    /// A valid access token answers `true` without any I/O.
    pub async fn is_valid_tokens<A: RefreshApi>(&self, api: &A) -> bool {
        self.ensure_access_token(api).await.is_ok()
    }
}
