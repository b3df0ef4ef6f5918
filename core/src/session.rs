//! Authenticated request execution with transparent token refresh.
//!
//! # Design
//! `SessionClient::send` runs one request through this protocol:
//!
//! 1. Attach `Bearer <access token>` when one is stored and send.
//! 2. Anything but a 401 is returned as-is.
//! 3. A 401 on the demo session is returned as-is; the sentinel token never
//!    refreshes.
//! 4. A 401 on a request sent without a token is returned as-is.
//! 5. With no refresh token stored, the access token is dropped, `Expired` is
//!    published and the call fails with `SessionExpired`.
//! 6. Otherwise a refresh is awaited (shared with any concurrent 401s) and
//!    the request is replayed once with the new token. The replay's response
//!    is final; a second 401 is not refreshed again.
//!
//! If another request already rotated the token while this one was in
//! flight, the replay uses the stored token without a new refresh.

use std::sync::Arc;

use crate::client::PetConnectApi;
use crate::error::ApiError;
use crate::events::{publish, EventSender, ExpiryReason, SessionEvent};
use crate::http::{HttpRequest, HttpResponse};
use crate::refresh::RefreshCoordinator;
use crate::token_store::TokenStore;
use crate::transport::Transport;

const UNAUTHORIZED: u16 = 401;

#[derive(Clone)]
pub struct SessionClient {
    transport: Arc<dyn Transport>,
    tokens: TokenStore,
    events: EventSender,
    refresher: RefreshCoordinator,
}

impl std::fmt::Debug for SessionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionClient")
            .field("tokens", &self.tokens)
            .field("refresher", &self.refresher)
            .finish_non_exhaustive()
    }
}

impl SessionClient {
    pub fn new(
        api: PetConnectApi,
        transport: Arc<dyn Transport>,
        tokens: TokenStore,
        events: EventSender,
    ) -> Self {
        let refresher =
            RefreshCoordinator::new(api, Arc::clone(&transport), tokens.clone(), events.clone());
        Self {
            transport,
            tokens,
            events,
            refresher,
        }
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn refresher(&self) -> &RefreshCoordinator {
        &self.refresher
    }

    /// Send `request` with the stored credentials, recovering from one 401.
    pub async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let sent_token = self.tokens.access_token();
        let response = self.attempt(&request, sent_token.as_deref()).await?;
        if response.status != UNAUTHORIZED {
            return Ok(response);
        }

        if self.tokens.is_demo() {
            tracing::debug!(path = %request.path, "401 on demo session, not refreshing");
            return Ok(response);
        }

        if sent_token.is_none() {
            tracing::debug!(path = %request.path, "401 without a session");
            return Ok(response);
        }

        let current = self.tokens.access_token();
        if current.is_none() {
            tracing::debug!(path = %request.path, "session ended while request was in flight");
            return Err(ApiError::SessionExpired);
        }

        let Some(refresh_token) = self.tokens.refresh_token() else {
            tracing::warn!(path = %request.path, "401 without a refresh token, ending session");
            self.tokens.clear_access_token();
            publish(
                &self.events,
                SessionEvent::Expired(ExpiryReason::MissingRefreshToken),
            );
            return Err(ApiError::SessionExpired);
        };

        let token = match current {
            Some(current) if sent_token.as_deref() != Some(current.as_str()) => {
                tracing::debug!(path = %request.path, "token already rotated, replaying");
                current
            }
            _ => self
                .refresher
                .refresh(refresh_token)
                .await
                .map_err(|_| ApiError::SessionExpired)?,
        };

        tracing::debug!(path = %request.path, "replaying request after refresh");
        self.attempt(&request, Some(&token)).await
    }

    async fn attempt(
        &self,
        request: &HttpRequest,
        token: Option<&str>,
    ) -> Result<HttpResponse, ApiError> {
        let mut request = request.clone();
        if let Some(token) = token {
            request.set_bearer(token);
        }
        self.transport.execute(request).await
    }
}
