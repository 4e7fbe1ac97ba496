//! Per-session client state and the registry that maps sessions to it.
//!
//! Each signed-in browser session gets its own [Workspace] holding the
//! session state and the transactions screen. Requests for one session are
//! handled one at a time by locking its workspace.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use tokio::{
    sync::{Mutex as AsyncMutex, OwnedMutexGuard, broadcast},
    task::JoinHandle,
};

use crate::{
    Error,
    auth::{IdentityProvider, Session, SessionEvent, SessionId, SessionState},
    profile::ProfileService,
    transaction::{TransactionService, TransactionsView},
};

/// Everything the app knows about one signed-in browser session.
#[derive(Debug)]
pub struct Workspace {
    /// Who is signed in and their profile.
    pub session: SessionState,
    /// The signed-in user's transactions.
    pub transactions: TransactionsView,
}

impl Workspace {
    /// Set up the workspace for a session that just signed in.
    ///
    /// Loads the user's profile, creating it if needed, and their
    /// transactions. A failed load is remembered and retried on the next
    /// request for the transactions.
    pub async fn open<C>(session: Session, client: &C) -> Self
    where
        C: TransactionService + ProfileService,
    {
        let user_id = session.user_id;
        let mut state = SessionState::signed_out();
        state.apply(SessionEvent::SignedIn(session), client).await;

        let mut transactions = TransactionsView::new(user_id);
        // The failure is logged and shown with the transactions.
        let _ = transactions.load(client).await;

        Self {
            session: state,
            transactions,
        }
    }
}

/// A shared, lockable workspace.
pub type WorkspaceHandle = Arc<AsyncMutex<Workspace>>;

/// Run `operation` with exclusive access to `workspace` in its own task.
///
/// The operation keeps running if the request that started it goes away, so a
/// change the backend accepted always reaches the workspace.
///
/// # Errors
///
/// Returns [Error::OperationInProgress] without running `operation` if
/// another request is using the workspace, and [Error::TaskFailed] if the
/// operation panicked. Otherwise returns the operation's result.
pub async fn run_exclusive<F, Fut, T>(
    workspace: &WorkspaceHandle,
    operation: F,
) -> Result<T, Error>
where
    F: FnOnce(OwnedMutexGuard<Workspace>) -> Fut,
    Fut: Future<Output = Result<T, Error>> + Send + 'static,
    T: Send + 'static,
{
    let guard = workspace
        .clone()
        .try_lock_owned()
        .map_err(|_| Error::OperationInProgress)?;

    match tokio::spawn(operation(guard)).await {
        Ok(result) => result,
        Err(error) => Err(Error::TaskFailed(error.to_string())),
    }
}

/// The workspaces of all signed-in sessions.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceRegistry {
    workspaces: Arc<Mutex<HashMap<SessionId, WorkspaceHandle>>>,
}

impl WorkspaceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the workspace of the session with `id`.
    pub fn get(&self, id: SessionId) -> Option<WorkspaceHandle> {
        self.lock().get(&id).cloned()
    }

    /// Register `workspace` for the session with `id`.
    ///
    /// If another request registered a workspace for the session first, that
    /// one is kept and returned instead.
    pub fn insert(&self, id: SessionId, workspace: Workspace) -> WorkspaceHandle {
        self.lock()
            .entry(id)
            .or_insert_with(|| Arc::new(AsyncMutex::new(workspace)))
            .clone()
    }

    /// Register `workspace` for the session with `id` if the session is still live.
    ///
    /// The session may end while its workspace is being opened, in which case
    /// the sign-out has already run and nothing would ever drop the entry.
    /// Returns `None` and leaves the registry without an entry for `id` if the
    /// identity provider no longer knows the session.
    pub async fn insert_live<I>(
        &self,
        identity: &I,
        id: SessionId,
        workspace: Workspace,
    ) -> Option<WorkspaceHandle>
    where
        I: IdentityProvider,
    {
        let handle = self.insert(id, workspace);

        if identity.get_session(id).await.is_none() {
            tracing::debug!("Session {id} ended while its workspace was opened");
            self.remove(id);
            return None;
        }

        Some(handle)
    }

    /// Drop every workspace whose session the identity provider no longer knows.
    ///
    /// Returns the number of workspaces dropped.
    pub async fn prune<I>(&self, identity: &I) -> usize
    where
        I: IdentityProvider,
    {
        let ids: Vec<SessionId> = self.lock().keys().copied().collect();
        let mut dropped = 0;

        for id in ids {
            if identity.get_session(id).await.is_none() && self.remove(id).is_some() {
                dropped += 1;
            }
        }

        dropped
    }

    /// Drop the workspace of the session with `id`.
    ///
    /// Requests still holding the workspace finish against the dropped copy.
    pub fn remove(&self, id: SessionId) -> Option<WorkspaceHandle> {
        self.lock().remove(&id)
    }

    /// The number of registered workspaces.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether there are no registered workspaces.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Keep the registry in step with the identity provider's session events.
    ///
    /// Ended sessions have their workspace dropped and refreshed sessions have
    /// their expiry updated. Sign-ins are ignored, the log-in request opens
    /// the workspace itself. If the listener falls behind and events are lost,
    /// the registry is checked against `identity` instead.
    pub fn listen<I>(
        &self,
        identity: I,
        mut events: broadcast::Receiver<SessionEvent>,
    ) -> JoinHandle<()>
    where
        I: IdentityProvider + Send + Sync + 'static,
    {
        let registry = self.clone();

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => registry.handle_event(event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        let dropped = registry.prune(&identity).await;
                        tracing::warn!(
                            "Workspace registry missed {skipped} session events, \
                            dropped {dropped} workspaces of ended sessions"
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }

            tracing::debug!("Session event channel closed, workspace listener stopped");
        })
    }

    fn handle_event(&self, event: SessionEvent) {
        match event {
            SessionEvent::SignedIn(_) => {}
            SessionEvent::TokenRefreshed(session) => {
                let Some(workspace) = self.get(session.id) else {
                    return;
                };

                // A busy workspace belongs to a request that will refresh it again.
                if let Ok(mut workspace) = workspace.try_lock() {
                    workspace.session.refresh(session);
                }
            }
            SessionEvent::SignedOut(id) | SessionEvent::Expired(id) => {
                if self.remove(id).is_some() {
                    tracing::debug!("Dropped workspace of session {id}");
                }
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SessionId, WorkspaceHandle>> {
        self.workspaces
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration as StdDuration};

    use rusqlite::Connection;
    use time::Duration;
    use tokio::sync::broadcast;

    use crate::{
        Error, ValidatedPassword,
        auth::{IdentityProvider, Session, SessionEvent, SignUp},
        backend::SqliteBackend,
        transaction::LoadState,
        user::{DisplayName, EmailAddress},
        workspace::{Workspace, WorkspaceRegistry, run_exclusive},
    };

    async fn signed_up() -> (SqliteBackend, Session) {
        let backend = SqliteBackend::new(Connection::open_in_memory().unwrap())
            .unwrap()
            .with_password_cost(4);
        let outcome = backend
            .sign_up(
                SignUp {
                    email: EmailAddress::new("ana@example.com").unwrap(),
                    password: ValidatedPassword::new("hunter22").unwrap(),
                    name: DisplayName::new("Ana").unwrap(),
                },
                Duration::minutes(5),
            )
            .await
            .unwrap();

        (backend, outcome.session.unwrap())
    }

    async fn open(backend: &SqliteBackend, session: &Session) -> Workspace {
        Workspace::open(session.clone(), &backend.client(session.user_id)).await
    }

    #[tokio::test]
    async fn open_loads_profile_and_transactions() {
        let (backend, session) = signed_up().await;

        let workspace = open(&backend, &session).await;

        assert_eq!(workspace.session.session(), Some(&session));
        assert_eq!(workspace.session.profile().unwrap().name, "Ana");
        assert_eq!(
            workspace.transactions.store().load_state(),
            LoadState::Loaded
        );
    }

    #[tokio::test]
    async fn insert_keeps_first_workspace() {
        let (backend, session) = signed_up().await;
        let registry = WorkspaceRegistry::new();
        let first = registry.insert(session.id, open(&backend, &session).await);

        let second = registry.insert(session.id, open(&backend, &session).await);

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn sign_out_event_drops_workspace() {
        let (backend, session) = signed_up().await;
        let registry = WorkspaceRegistry::new();
        registry.insert(session.id, open(&backend, &session).await);
        let (sender, receiver) = broadcast::channel(4);
        let listener = registry.listen(backend.clone(), receiver);

        sender.send(SessionEvent::SignedOut(session.id)).unwrap();
        drop(sender);
        tokio::time::timeout(StdDuration::from_secs(1), listener)
            .await
            .unwrap()
            .unwrap();

        assert!(registry.get(session.id).is_none());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn refresh_event_updates_session_expiry() {
        let (backend, session) = signed_up().await;
        let registry = WorkspaceRegistry::new();
        let handle = registry.insert(session.id, open(&backend, &session).await);
        let refreshed = Session {
            expires_at: session.expires_at + Duration::days(1),
            ..session.clone()
        };
        let (sender, receiver) = broadcast::channel(4);
        let listener = registry.listen(backend.clone(), receiver);

        sender
            .send(SessionEvent::TokenRefreshed(refreshed.clone()))
            .unwrap();
        drop(sender);
        tokio::time::timeout(StdDuration::from_secs(1), listener)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(handle.lock().await.session.session(), Some(&refreshed));
    }

    #[tokio::test]
    async fn busy_workspace_refuses_second_operation() {
        let (backend, session) = signed_up().await;
        let registry = WorkspaceRegistry::new();
        let handle = registry.insert(session.id, open(&backend, &session).await);
        let _busy = handle.clone().lock_owned().await;

        let result = run_exclusive(&handle, |_| async { Ok(()) }).await;

        assert_eq!(result, Err(Error::OperationInProgress));
    }

    #[tokio::test]
    async fn operation_gets_the_workspace() {
        let (backend, session) = signed_up().await;
        let registry = WorkspaceRegistry::new();
        let handle = registry.insert(session.id, open(&backend, &session).await);

        let owner = run_exclusive(&handle, |workspace| async move {
            Ok(workspace.transactions.owner())
        })
        .await;

        assert_eq!(owner, Ok(session.user_id));
        assert!(handle.try_lock().is_ok());
    }

    #[tokio::test]
    async fn panicking_operation_is_reported() {
        let (backend, session) = signed_up().await;
        let registry = WorkspaceRegistry::new();
        let handle = registry.insert(session.id, open(&backend, &session).await);

        // A new user has no transactions, so indexing the first one panics.
        let result = run_exclusive(&handle, |workspace| async move {
            Ok(workspace.transactions.store().records()[0].id)
        })
        .await;

        assert!(matches!(result, Err(Error::TaskFailed(_))));
        assert!(handle.try_lock().is_ok());
    }

    #[tokio::test]
    async fn insert_live_refuses_ended_session() {
        let (backend, session) = signed_up().await;
        let registry = WorkspaceRegistry::new();
        let workspace = open(&backend, &session).await;
        backend.sign_out(session.id).await.unwrap();

        let handle = registry.insert_live(&backend, session.id, workspace).await;

        assert!(handle.is_none());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn insert_live_keeps_live_session() {
        let (backend, session) = signed_up().await;
        let registry = WorkspaceRegistry::new();
        let workspace = open(&backend, &session).await;

        let handle = registry.insert_live(&backend, session.id, workspace).await;

        assert!(handle.is_some());
        assert!(registry.get(session.id).is_some());
    }

    #[tokio::test]
    async fn prune_drops_only_ended_sessions() {
        let (backend, ended) = signed_up().await;
        let live = backend
            .sign_in(
                &EmailAddress::new("ana@example.com").unwrap(),
                "hunter22",
                Duration::minutes(5),
            )
            .await
            .unwrap();
        let registry = WorkspaceRegistry::new();
        registry.insert(ended.id, open(&backend, &ended).await);
        registry.insert(live.id, open(&backend, &live).await);
        backend.sign_out(ended.id).await.unwrap();

        let dropped = registry.prune(&backend).await;

        assert_eq!(dropped, 1);
        assert!(registry.get(ended.id).is_none());
        assert!(registry.get(live.id).is_some());
    }

    #[tokio::test]
    async fn lagging_listener_drops_ended_sessions() {
        let (backend, session) = signed_up().await;
        let registry = WorkspaceRegistry::new();
        registry.insert(session.id, open(&backend, &session).await);
        // The sign-out event goes to the backend's own channel, which nobody
        // listens to here.
        backend.sign_out(session.id).await.unwrap();
        let (sender, receiver) = broadcast::channel(1);
        for _ in 0..3 {
            sender.send(SessionEvent::SignedIn(session.clone())).unwrap();
        }

        let listener = registry.listen(backend.clone(), receiver);
        drop(sender);
        tokio::time::timeout(StdDuration::from_secs(1), listener)
            .await
            .unwrap()
            .unwrap();

        assert!(registry.is_empty());
    }
}
