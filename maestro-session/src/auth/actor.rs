//! SessionActor — the single writer of session state
//!
//! Every mutation (login, register, logout, refresh, hydration, fallback
//! minting) is processed
//! sequentially by one Tokio task. Identity calls run in spawned tasks and
//! report back to the actor tagged with the epoch they were dispatched
//! under; a report from an older epoch is discarded, so a logout issued
//! while a login is in flight can never be undone by the late response.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use maestro_session::auth::{Credentials, IdentityService, SessionActor};
//! use maestro_session::{destination_for, MemoryStorage, SessionConfig};
//!
//! async fn sign_in(identity: Arc<dyn IdentityService>) -> maestro_session::Result<()> {
//!     let handle = SessionActor::spawn(
//!         identity,
//!         Arc::new(MemoryStorage::new()),
//!         SessionConfig::new(),
//!     )
//!     .await;
//!     handle.wait_until_loaded().await;
//!
//!     let session = handle.login(Credentials::new("ana@school.edu", "secret")).await?;
//!     let landing = destination_for(Some(session.user.role));
//!     println!("redirect to {landing}");
//!
//!     handle.logout().await;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::SessionConfig;
use crate::derive::SessionReader;
use crate::error::{AuthError, Result};
use crate::minter::FallbackMinter;
use crate::storage::KeyValuePort;
use crate::store::TokenStore;

use super::identity::IdentityService;
use super::types::*;

// ─── Actor Messages ───

enum SessionMsg {
    Login {
        credentials: Credentials,
        reply: oneshot::Sender<Result<Session>>,
    },
    Register {
        registration: Registration,
        reply: oneshot::Sender<Result<Session>>,
    },
    Logout {
        reply: oneshot::Sender<()>,
    },
    RefreshUser {
        reply: oneshot::Sender<SessionState>,
    },
    Hydrate {
        reply: oneshot::Sender<SessionState>,
    },
    EnsureToken {
        user: Option<User>,
        reply: oneshot::Sender<bool>,
    },
}

#[derive(Debug, Clone, Copy)]
enum Operation {
    Login,
    Register,
}

impl Operation {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Register => "register",
        }
    }
}

/// Identity call outcome routed back into the actor
struct Resolved {
    epoch: u64,
    op: Operation,
    outcome: Result<AuthGrant>,
    reply: oneshot::Sender<Result<Session>>,
}

// ─── Actor ───

/// Session actor — owns the published [`SessionState`]
pub struct SessionActor {
    identity: Arc<dyn IdentityService>,
    store: TokenStore,
    reader: SessionReader,
    minter: FallbackMinter,
    config: SessionConfig,
    state: watch::Sender<SessionState>,
    epoch: u64,
    rx: mpsc::Receiver<SessionMsg>,
    resolved_tx: mpsc::UnboundedSender<Resolved>,
    resolved_rx: mpsc::UnboundedReceiver<Resolved>,
}

impl SessionActor {
    /// Spawn the session actor on the current runtime and return a handle.
    ///
    /// The published state starts as `Loading`; hydration from `storage` is
    /// the first thing the actor does.
    pub async fn spawn(
        identity: Arc<dyn IdentityService>,
        storage: Arc<dyn KeyValuePort>,
        config: SessionConfig,
    ) -> SessionHandle {
        Self::spawn_with_clock(identity, storage, Arc::new(SystemClock), config).await
    }

    /// Spawn with an explicit time source
    pub async fn spawn_with_clock(
        identity: Arc<dyn IdentityService>,
        storage: Arc<dyn KeyValuePort>,
        clock: Arc<dyn Clock>,
        config: SessionConfig,
    ) -> SessionHandle {
        let store = TokenStore::new(storage, &config);
        let reader = SessionReader::new(store.clone(), Arc::clone(&clock));
        let minter = FallbackMinter::new(store.clone(), clock, config.clone());

        let (tx, rx) = mpsc::channel(config.channel_capacity);
        let (resolved_tx, resolved_rx) = mpsc::unbounded_channel();
        let (state, state_rx) = watch::channel(SessionState::Loading);

        let actor = Self {
            identity,
            store: store.clone(),
            reader: reader.clone(),
            minter,
            config,
            state,
            epoch: 0,
            rx,
            resolved_tx,
            resolved_rx,
        };

        tokio::spawn(actor.run());
        info!("SessionActor spawned");
        SessionHandle {
            tx,
            state: state_rx,
            store,
            reader,
        }
    }

    /// Main event loop
    async fn run(mut self) {
        self.handle_hydrate();

        loop {
            tokio::select! {
                msg = self.rx.recv() => match msg {
                    Some(msg) => self.dispatch(msg),
                    None => break,
                },
                Some(done) = self.resolved_rx.recv() => self.handle_resolved(done),
            }
        }
        info!("SessionActor stopped");
    }

    fn dispatch(&mut self, msg: SessionMsg) {
        match msg {
            SessionMsg::Login { credentials, reply } => {
                let epoch = self.advance_epoch();
                if let Err(e) = credentials.validate() {
                    self.fail(Operation::Login, e, reply);
                    return;
                }
                let identity = Arc::clone(&self.identity);
                self.call_identity(epoch, Operation::Login, reply, async move {
                    identity.login(credentials).await
                });
            }
            SessionMsg::Register { registration, reply } => {
                let epoch = self.advance_epoch();
                if let Err(e) = registration.validate() {
                    self.fail(Operation::Register, e, reply);
                    return;
                }
                let identity = Arc::clone(&self.identity);
                self.call_identity(epoch, Operation::Register, reply, async move {
                    identity.register(registration).await
                });
            }
            SessionMsg::Logout { reply } => {
                self.handle_logout();
                let _ = reply.send(());
            }
            SessionMsg::RefreshUser { reply } => {
                let _ = reply.send(self.handle_refresh());
            }
            SessionMsg::Hydrate { reply } => {
                let _ = reply.send(self.handle_hydrate());
            }
            SessionMsg::EnsureToken { user, reply } => {
                let _ = reply.send(self.minter.ensure_token(user.as_ref()));
            }
        }
    }

    // ─── Handler Implementations ───

    fn call_identity<F>(
        &self,
        epoch: u64,
        op: Operation,
        reply: oneshot::Sender<Result<Session>>,
        call: F,
    ) where
        F: std::future::Future<Output = Result<AuthGrant>> + Send + 'static,
    {
        let resolved_tx = self.resolved_tx.clone();
        debug!(op = op.as_str(), epoch, "Identity call dispatched");
        tokio::spawn(async move {
            let outcome = call.await;
            // Actor gone: dropping `reply` tells the caller.
            let _ = resolved_tx.send(Resolved { epoch, op, outcome, reply });
        });
    }

    fn handle_resolved(&mut self, done: Resolved) {
        let Resolved { epoch, op, outcome, reply } = done;

        if epoch != self.epoch {
            debug!(op = op.as_str(), epoch, current = self.epoch, "Discarding stale identity response");
            let _ = reply.send(Err(AuthError::Superseded));
            return;
        }

        let grant = match outcome {
            Ok(grant) => grant,
            Err(e) => return self.fail(op, e, reply),
        };

        if let Err(e) = self.store.write_session(&grant.access_token, &grant.user) {
            return self.fail(op, e, reply);
        }

        let session = Session {
            access_token: grant.access_token,
            user: grant.user,
        };
        info!(op = op.as_str(), user_id = %session.user.id, role = %session.user.role, "Session established");
        self.publish(SessionState::Authenticated(session.clone()));
        let _ = reply.send(Ok(session));
    }

    fn handle_logout(&mut self) {
        self.advance_epoch();
        self.store.clear_session();
        self.publish(SessionState::Unauthenticated);
        info!("Logged out");
    }

    fn handle_refresh(&mut self) -> SessionState {
        let next = SessionState::from(self.reader.session());
        debug!(state = next.as_str(), "Session refreshed from storage");
        self.publish(next.clone());
        next
    }

    /// Rebuild state from storage. Token expiry is not checked here; it is
    /// enforced lazily by [`SessionReader::is_authenticated`] and
    /// `refresh_user`.
    fn handle_hydrate(&mut self) -> SessionState {
        let record = self.store.snapshot();
        let next = match (record.token, record.user) {
            (Some(access_token), Some(Ok(user))) => {
                SessionState::Authenticated(Session { access_token, user })
            }
            (_, Some(Err(e))) => {
                warn!(error = %e, "Persisted user unreadable, starting signed out");
                SessionState::Unauthenticated
            }
            _ => SessionState::Unauthenticated,
        };
        info!(state = next.as_str(), "Session hydrated");
        self.publish(next.clone());
        next
    }

    // ─── Helpers ───

    fn advance_epoch(&mut self) -> u64 {
        self.epoch += 1;
        self.epoch
    }

    /// Failed login/register: storage untouched, state cleared, error surfaced
    fn fail(&mut self, op: Operation, err: AuthError, reply: oneshot::Sender<Result<Session>>) {
        warn!(op = op.as_str(), error = %err, "Authentication failed");
        self.publish(SessionState::Unauthenticated);
        let _ = reply.send(Err(self.surface(err)));
    }

    fn surface(&self, err: AuthError) -> AuthError {
        let fallback = &self.config.default_failure_message;
        match err {
            AuthError::Rejected(msg) if msg.trim().is_empty() => AuthError::Rejected(fallback.clone()),
            AuthError::Transport(msg) if msg.trim().is_empty() => AuthError::Transport(fallback.clone()),
            other => other,
        }
    }

    fn publish(&self, next: SessionState) {
        let prev = self.state.send_replace(next);
        debug!(from = prev.as_str(), to = self.state.borrow().as_str(), "Session state published");
    }
}

// ─── Handle (client-facing API) ───

/// Cloneable handle to the session actor.
///
/// Reads (`state`, `user`, `is_authenticated`, `is_loading`) come from the
/// published state and never block on the actor.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionMsg>,
    state: watch::Receiver<SessionState>,
    store: TokenStore,
    reader: SessionReader,
}

impl SessionHandle {
    // ─── Reads ───

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().user().cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading()
    }

    /// Receiver notified on every published state
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Resolve once hydration has finished
    pub async fn wait_until_loaded(&self) -> SessionState {
        let mut rx = self.state.clone();
        let loaded = rx.wait_for(|s| !s.is_loading()).await.map(|s| s.clone());
        loaded.unwrap_or_else(|_| self.state())
    }

    /// Pure derivation over persisted storage
    pub fn reader(&self) -> &SessionReader {
        &self.reader
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    // ─── Mutations ───

    pub async fn login(&self, credentials: Credentials) -> Result<Session> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SessionMsg::Login { credentials, reply })
            .await
            .map_err(|_| AuthError::ActorUnavailable("SessionActor".into()))?;
        rx.await
            .map_err(|_| AuthError::ActorUnavailable("SessionActor dropped".into()))?
    }

    pub async fn register(&self, registration: Registration) -> Result<Session> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SessionMsg::Register { registration, reply })
            .await
            .map_err(|_| AuthError::ActorUnavailable("SessionActor".into()))?;
        rx.await
            .map_err(|_| AuthError::ActorUnavailable("SessionActor dropped".into()))?
    }

    /// Clear the session. Never fails: if the actor is gone, storage is
    /// cleared directly.
    pub async fn logout(&self) {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(SessionMsg::Logout { reply }).await.is_err() || rx.await.is_err() {
            warn!("SessionActor unavailable, clearing storage directly");
            self.store.clear_session();
        }
    }

    /// Republish state derived from storage without touching the network
    pub async fn refresh_user(&self) -> Result<SessionState> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SessionMsg::RefreshUser { reply })
            .await
            .map_err(|_| AuthError::ActorUnavailable("SessionActor".into()))?;
        rx.await
            .map_err(|_| AuthError::ActorUnavailable("SessionActor dropped".into()))
    }

    /// Re-run hydration against current storage
    pub async fn hydrate(&self) -> Result<SessionState> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SessionMsg::Hydrate { reply })
            .await
            .map_err(|_| AuthError::ActorUnavailable("SessionActor".into()))?;
        rx.await
            .map_err(|_| AuthError::ActorUnavailable("SessionActor dropped".into()))
    }

    /// See [`FallbackMinter::ensure_token`]. Runs on the actor; call
    /// `refresh_user` afterwards to republish. `false` if the actor is gone.
    pub async fn ensure_token(&self, user: Option<&User>) -> bool {
        let (reply, rx) = oneshot::channel();
        let msg = SessionMsg::EnsureToken {
            user: user.cloned(),
            reply,
        };
        if self.tx.send(msg).await.is_err() {
            warn!("SessionActor unavailable, no fallback token minted");
            return false;
        }
        rx.await.unwrap_or(false)
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("state", &self.state.borrow().as_str())
            .finish_non_exhaustive()
    }
}
