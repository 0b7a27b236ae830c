//! Single-flight access token refresh.
//!
//! Any number of requests can hit a 401 at the same moment. Only one
//! refresh call may reach the server: concurrent callers share the one
//! in-flight result instead of each spending the refresh token, which
//! matters when the server rotates it on use.
//!
//! The coordinator holds a mutex-guarded slot with a shared future.
//! The first caller to find the slot empty installs the refresh; every
//! later caller clones the same handle. The refresh future clears the
//! slot itself on completion, so the reset happens exactly once and a
//! later 401 starts a fresh refresh.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::auth::session::SessionManager;

/// Why a refresh could not produce a usable access token. Every variant
/// is terminal for the session; there is no retry beyond the single
/// attempt.
#[derive(Debug, Clone, Error)]
pub enum RefreshError {
    #[error("no refresh token in either store")]
    MissingRefreshToken,

    #[error("refresh rejected by server: {0}")]
    Rejected(String),

    #[error("network failure during refresh: {0}")]
    Network(String),

    #[error("failed to persist refreshed credentials: {0}")]
    Persist(String),
}

/// Tokens returned by the refresh endpoint. The server may rotate the
/// refresh token; when it does, the new one replaces the old in place.
#[derive(Debug, Clone)]
pub struct RefreshedTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

/// The wire call that exchanges a refresh token for new credentials.
///
/// Implementations must not route through the intercepting request
/// path — a 401 from the refresh endpoint is a terminal rejection, not
/// a trigger for another refresh.
#[async_trait]
pub trait RefreshTransport: Send + Sync {
    async fn exchange(&self, refresh_token: &str) -> Result<RefreshedTokens, RefreshError>;
}

type SharedRefresh = Shared<BoxFuture<'static, Result<String, RefreshError>>>;

/// De-duplicates concurrent refresh attempts.
///
/// The slot is shared with the refresh future itself (which clears it
/// on completion), hence the inner `Arc`.
#[derive(Default)]
pub struct RefreshCoordinator {
    inflight: Arc<Mutex<Option<SharedRefresh>>>,
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Obtain a fresh access token, joining an in-flight refresh when
    /// one exists. On success the new token is already persisted into
    /// the store that held the refresh token.
    pub async fn refresh(
        &self,
        session: &Arc<SessionManager>,
        transport: &Arc<dyn RefreshTransport>,
    ) -> Result<String, RefreshError> {
        let fut = {
            let mut slot = self.inflight.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(inflight) = slot.as_ref() {
                debug!("refresh already in flight, awaiting shared result");
                inflight.clone()
            } else {
                let slot_handle = Arc::clone(&self.inflight);
                let session = Arc::clone(session);
                let transport = Arc::clone(transport);
                let fut: SharedRefresh = async move {
                    let outcome = run_refresh(&session, transport.as_ref()).await;
                    // Clear the slot before any waiter observes the result,
                    // so the next 401 starts a fresh refresh.
                    *slot_handle.lock().unwrap_or_else(|e| e.into_inner()) = None;
                    outcome
                }
                .boxed()
                .shared();
                *slot = Some(fut.clone());
                fut
            }
        };

        fut.await
    }
}

async fn run_refresh(
    session: &SessionManager,
    transport: &dyn RefreshTransport,
) -> Result<String, RefreshError> {
    // The store that held the refresh token receives the new access
    // token, keeping the credential pair co-located.
    let Some((refresh_token, kind)) = session.refresh_token() else {
        warn!("refresh requested with no refresh token on hand");
        return Err(RefreshError::MissingRefreshToken);
    };

    let tokens = transport.exchange(&refresh_token).await?;

    session
        .store_refreshed(&tokens.access_token, tokens.refresh_token.as_deref(), kind)
        .map_err(|e| RefreshError::Persist(e.to_string()))?;

    info!(store = ?kind, "access token refreshed");
    Ok(tokens.access_token)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::auth::profile::{Role, UserProfile};
    use crate::auth::session::AuthSession;
    use crate::auth::store::StorePair;

    struct FakeTransport {
        calls: AtomicUsize,
        delay: Duration,
        outcome: fn(usize) -> Result<RefreshedTokens, RefreshError>,
    }

    impl FakeTransport {
        fn succeeding(delay: Duration) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay,
                outcome: |n| {
                    Ok(RefreshedTokens {
                        access_token: format!("access-new-{n}"),
                        refresh_token: None,
                    })
                },
            }
        }

        // A small delay keeps the refresh in flight while the other
        // concurrent callers arrive, like a real round trip would.
        fn rejecting(delay: Duration) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay,
                outcome: |_| Err(RefreshError::Rejected("401".to_string())),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RefreshTransport for FakeTransport {
        async fn exchange(&self, _refresh_token: &str) -> Result<RefreshedTokens, RefreshError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            (self.outcome)(n)
        }
    }

    fn session_with_login(remember: bool) -> Arc<SessionManager> {
        let session = Arc::new(SessionManager::new(
            StorePair::in_memory(),
            "/login".to_string(),
        ));
        session
            .commit_login(
                &AuthSession {
                    access_token: "access-old".to_string(),
                    refresh_token: "refresh-old".to_string(),
                    profile: UserProfile {
                        id: "u_1".to_string(),
                        name: "Ada".to_string(),
                        email: "ada@example.com".to_string(),
                        role: Role::Student,
                        roles: None,
                        avatar_url: None,
                    },
                },
                remember,
            )
            .unwrap();
        session
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let session = session_with_login(false);
        let transport = Arc::new(FakeTransport::succeeding(Duration::from_millis(20)));
        let dyn_transport: Arc<dyn RefreshTransport> = transport.clone();
        let coordinator = Arc::new(RefreshCoordinator::new());

        let (a, b, c, d, e) = tokio::join!(
            coordinator.refresh(&session, &dyn_transport),
            coordinator.refresh(&session, &dyn_transport),
            coordinator.refresh(&session, &dyn_transport),
            coordinator.refresh(&session, &dyn_transport),
            coordinator.refresh(&session, &dyn_transport),
        );

        assert_eq!(transport.calls(), 1, "exactly one refresh call");
        let token = a.unwrap();
        assert_eq!(token, "access-new-1");
        for result in [b, c, d, e] {
            assert_eq!(result.unwrap(), token, "all callers get the same token");
        }
    }

    #[tokio::test]
    async fn test_slot_resets_after_completion() {
        let session = session_with_login(false);
        let transport = Arc::new(FakeTransport::succeeding(Duration::ZERO));
        let dyn_transport: Arc<dyn RefreshTransport> = transport.clone();
        let coordinator = Arc::new(RefreshCoordinator::new());

        let first = coordinator.refresh(&session, &dyn_transport).await.unwrap();
        let second = coordinator.refresh(&session, &dyn_transport).await.unwrap();

        assert_eq!(transport.calls(), 2, "sequential refreshes each hit the server");
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_missing_refresh_token_is_unrecoverable() {
        let session = Arc::new(SessionManager::new(
            StorePair::in_memory(),
            "/login".to_string(),
        ));
        let transport = Arc::new(FakeTransport::succeeding(Duration::ZERO));
        let dyn_transport: Arc<dyn RefreshTransport> = transport.clone();
        let coordinator = Arc::new(RefreshCoordinator::new());

        let result = coordinator.refresh(&session, &dyn_transport).await;

        assert!(matches!(result, Err(RefreshError::MissingRefreshToken)));
        assert_eq!(transport.calls(), 0, "transport never consulted");
    }

    #[tokio::test]
    async fn test_rejection_fails_all_waiters_with_one_call() {
        let session = session_with_login(true);
        let transport = Arc::new(FakeTransport::rejecting(Duration::from_millis(20)));
        let dyn_transport: Arc<dyn RefreshTransport> = transport.clone();
        let coordinator = Arc::new(RefreshCoordinator::new());

        let (a, b, c) = tokio::join!(
            coordinator.refresh(&session, &dyn_transport),
            coordinator.refresh(&session, &dyn_transport),
            coordinator.refresh(&session, &dyn_transport),
        );

        assert_eq!(transport.calls(), 1, "a rejected refresh is not re-attempted");
        for result in [a, b, c] {
            assert!(matches!(result, Err(RefreshError::Rejected(_))));
        }

        // The slot is clear: a later 401 may try again.
        let retry = coordinator.refresh(&session, &dyn_transport).await;
        assert!(retry.is_err());
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_refresh_persists_into_the_store_that_held_the_refresh_token() {
        use crate::auth::store::StoreKind;

        let session = session_with_login(false); // volatile session
        let transport = Arc::new(FakeTransport::succeeding(Duration::ZERO));
        let dyn_transport: Arc<dyn RefreshTransport> = transport.clone();
        let coordinator = Arc::new(RefreshCoordinator::new());

        let token = coordinator.refresh(&session, &dyn_transport).await.unwrap();

        let (stored, kind) = session.access_token().expect("token persisted");
        assert_eq!(stored, token);
        assert_eq!(kind, StoreKind::Volatile);
        // Durable store stays empty throughout.
        assert!(session
            .stores()
            .store(StoreKind::Durable)
            .get("access_token")
            .is_none());
    }
}
