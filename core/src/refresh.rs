//! Single-flight access-token refresh.
//!
//! # Design
//! The coordinator owns one slot: either empty, or holding the shared future
//! of the refresh currently in flight. Callers that find the slot occupied
//! await the same future, so any number of concurrent 401s produce exactly
//! one `PUT /autenticacao/refresh`. The future empties its own slot when it
//! completes (success or failure); the generation number stops a late
//! completion from clearing a newer refresh.
//!
//! Side effects of the outcome (persisting the new token, or clearing the
//! session and publishing `Expired`) happen inside the shared future, so
//! they run once per refresh rather than once per waiter. They only apply
//! while the stored refresh token is still the one that was sent; after a
//! logout or a new login the outcome is dropped and waiters fail.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use thiserror::Error;

use crate::client::PetConnectApi;
use crate::error::ApiError;
use crate::events::{publish, EventSender, ExpiryReason, SessionEvent};
use crate::token_store::TokenStore;
use crate::transport::Transport;
use crate::types::RefreshedTokens;

/// Why a refresh failed. Cloneable so every waiter gets a copy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("token refresh failed: {0}")]
pub struct RefreshFailure(pub String);

type PendingRefresh = Shared<BoxFuture<'static, Result<String, RefreshFailure>>>;

#[derive(Default)]
struct Slot {
    generation: u64,
    in_flight: Option<(u64, PendingRefresh)>,
}

struct Inner {
    api: PetConnectApi,
    transport: Arc<dyn Transport>,
    tokens: TokenStore,
    events: EventSender,
    slot: Mutex<Slot>,
}

#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

impl RefreshCoordinator {
    pub fn new(
        api: PetConnectApi,
        transport: Arc<dyn Transport>,
        tokens: TokenStore,
        events: EventSender,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                api,
                transport,
                tokens,
                events,
                slot: Mutex::new(Slot::default()),
            }),
        }
    }

    /// Obtain a fresh access token, joining the refresh already in flight if
    /// there is one.
    pub async fn refresh(&self, refresh_token: String) -> Result<String, RefreshFailure> {
        let pending = {
            let mut slot = self.inner.lock_slot();
            let joined = slot.in_flight.as_ref().map(|(_, pending)| pending.clone());
            match joined {
                Some(pending) => {
                    tracing::debug!("joining in-flight token refresh");
                    pending
                }
                None => {
                    slot.generation += 1;
                    let generation = slot.generation;
                    let inner = Arc::clone(&self.inner);
                    let pending = async move {
                        let outcome = inner.run(&refresh_token).await;
                        inner.finish(generation);
                        outcome
                    }
                    .boxed()
                    .shared();
                    slot.in_flight = Some((generation, pending.clone()));
                    pending
                }
            }
        };
        pending.await
    }

    pub fn in_flight(&self) -> bool {
        self.inner.lock_slot().in_flight.is_some()
    }
}

impl Inner {
    fn lock_slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn finish(&self, generation: u64) {
        let mut slot = self.lock_slot();
        if matches!(slot.in_flight, Some((g, _)) if g == generation) {
            slot.in_flight = None;
        }
    }

    async fn run(&self, refresh_token: &str) -> Result<String, RefreshFailure> {
        tracing::info!("refreshing access token");
        let outcome = self.request(refresh_token).await;
        if self.tokens.refresh_token().as_deref() != Some(refresh_token) {
            tracing::info!("session changed during refresh, discarding outcome");
            return Err(RefreshFailure("session ended during refresh".to_string()));
        }
        match outcome {
            Ok(tokens) => {
                self.tokens.set_access_token(&tokens.access_token);
                if let Some(rotated) = &tokens.refresh_token {
                    self.tokens.set_refresh_token(rotated);
                }
                tracing::info!(rotated = tokens.refresh_token.is_some(), "access token refreshed");
                publish(&self.events, SessionEvent::Refreshed);
                Ok(tokens.access_token)
            }
            Err(e) => {
                tracing::warn!(error = %e, "token refresh failed, clearing session");
                self.tokens.clear();
                publish(
                    &self.events,
                    SessionEvent::Expired(ExpiryReason::RefreshRejected),
                );
                Err(RefreshFailure(e.to_string()))
            }
        }
    }

    async fn request(&self, refresh_token: &str) -> Result<RefreshedTokens, ApiError> {
        let request = self.api.build_refresh(refresh_token)?;
        let response = self.transport.execute(request).await?;
        self.api.parse_refresh(response)
    }
}
