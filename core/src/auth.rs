//! Login, logout and access to the stored session.
//!
//! Login goes straight to the transport: there is no session to refresh yet.
//! The demo credentials never reach the network; they yield the sentinel
//! session that routes all data access to the mock store.

use std::sync::Arc;

use crate::client::PetConnectApi;
use crate::error::ApiError;
use crate::events::{publish, EventSender, SessionEvent};
use crate::token_store::{Session, TokenStore, DEMO_ACCESS_TOKEN, DEMO_REFRESH_TOKEN};
use crate::transport::Transport;
use crate::types::{Credentials, UserProfile};

pub const DEMO_USERNAME: &str = "teste";
pub const DEMO_PASSWORD: &str = "teste123";
pub const DEMO_EMAIL: &str = "teste@petconnect.local";

pub fn is_demo_credentials(credentials: &Credentials) -> bool {
    credentials.username == DEMO_USERNAME && credentials.password == DEMO_PASSWORD
}

pub fn demo_session() -> Session {
    Session::new(DEMO_ACCESS_TOKEN)
        .with_refresh_token(DEMO_REFRESH_TOKEN)
        .with_user(UserProfile {
            id: 1,
            name: "Demo User".to_string(),
            email: DEMO_EMAIL.to_string(),
            role: None,
        })
}

#[derive(Clone)]
pub struct AuthService {
    api: PetConnectApi,
    transport: Arc<dyn Transport>,
    tokens: TokenStore,
    events: EventSender,
}

impl AuthService {
    pub fn new(
        api: PetConnectApi,
        transport: Arc<dyn Transport>,
        tokens: TokenStore,
        events: EventSender,
    ) -> Self {
        Self {
            api,
            transport,
            tokens,
            events,
        }
    }

    /// Sign in and persist the new session, replacing any previous one.
    pub async fn login(&self, credentials: &Credentials) -> Result<Session, ApiError> {
        let session = if is_demo_credentials(credentials) {
            tracing::info!("signing in with the demo account");
            demo_session()
        } else {
            let response = self
                .transport
                .execute(self.api.build_login(credentials)?)
                .await?;
            let login = self.api.parse_login(response)?;
            tracing::info!(
                username = %credentials.username,
                refreshable = login.refresh_token.is_some(),
                "signed in"
            );
            Session {
                access_token: login.access_token,
                refresh_token: login.refresh_token,
                user: login.user,
            }
        };

        self.tokens.clear();
        self.tokens.save(&session);
        publish(
            &self.events,
            SessionEvent::LoggedIn {
                demo: session.is_demo(),
            },
        );
        Ok(session)
    }

    pub fn logout(&self) {
        self.tokens.clear();
        tracing::info!("signed out");
        publish(&self.events, SessionEvent::LoggedOut);
    }

    pub fn current_session(&self) -> Option<Session> {
        self.tokens.read()
    }

    pub fn stored_user(&self) -> Option<UserProfile> {
        self.tokens.user()
    }

    pub fn is_authenticated(&self) -> bool {
        self.tokens.is_authenticated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::LOGIN_PATH;
    use crate::events;
    use crate::storage::MemoryStore;
    use crate::test_support::{respond, ScriptedTransport};

    fn service(transport: Arc<ScriptedTransport>) -> (AuthService, TokenStore, EventSender) {
        let tokens = TokenStore::new(Arc::new(MemoryStore::new()));
        let events = events::channel();
        let auth = AuthService::new(
            PetConnectApi::new("http://api.test"),
            transport,
            tokens.clone(),
            events.clone(),
        );
        (auth, tokens, events)
    }

    #[tokio::test]
    async fn demo_login_never_touches_network() {
        let transport = Arc::new(ScriptedTransport::new(|_| respond(500, "")));
        let (auth, tokens, events) = service(transport.clone());
        let mut rx = events.subscribe();

        let session = auth
            .login(&Credentials::new(DEMO_USERNAME, DEMO_PASSWORD))
            .await
            .unwrap();
        assert!(session.is_demo());
        assert!(transport.requests().is_empty());
        assert_eq!(tokens.access_token().as_deref(), Some(DEMO_ACCESS_TOKEN));
        assert_eq!(auth.stored_user().unwrap().email, DEMO_EMAIL);
        assert_eq!(rx.try_recv().unwrap(), SessionEvent::LoggedIn { demo: true });
    }

    #[tokio::test]
    async fn remote_login_saves_session() {
        let transport = Arc::new(ScriptedTransport::new(|req| {
            assert!(req.path.ends_with(LOGIN_PATH));
            respond(
                200,
                r#"{"access_token":"t1","refresh_token":"r1","usuario":{"id":5,"nome":"Ana","email":"ana@x.com","tipo":"TUTOR"}}"#,
            )
        }));
        let (auth, tokens, _) = service(transport.clone());

        let session = auth
            .login(&Credentials::new("ana@x.com", "pw"))
            .await
            .unwrap();
        assert_eq!(session.access_token, "t1");
        assert_eq!(tokens.refresh_token().as_deref(), Some("r1"));
        assert_eq!(auth.stored_user().unwrap().id, 5);
        assert!(auth.is_authenticated());
        assert!(transport.requests()[0].header("authorization").is_none());
    }

    #[tokio::test]
    async fn login_replaces_previous_session() {
        let transport = Arc::new(ScriptedTransport::new(|_| {
            respond(200, r#"{"token":"t9"}"#)
        }));
        let (auth, tokens, _) = service(transport);
        tokens.save(&demo_session());

        auth.login(&Credentials::new("admin", "admin")).await.unwrap();
        let session = tokens.read().unwrap();
        assert_eq!(session.access_token, "t9");
        assert!(session.refresh_token.is_none());
        assert!(session.user.is_none());
    }

    #[tokio::test]
    async fn rejected_login_maps_to_invalid_credentials() {
        let transport = Arc::new(ScriptedTransport::new(|_| respond(401, "")));
        let (auth, tokens, _) = service(transport);

        let err = auth
            .login(&Credentials::new("ana", "wrong"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized { .. }));
        assert_eq!(err.user_message(), crate::error::MSG_INVALID_CREDENTIALS);
        assert!(tokens.read().is_none());
    }

    #[tokio::test]
    async fn logout_clears_everything() {
        let transport = Arc::new(ScriptedTransport::new(|_| respond(500, "")));
        let (auth, tokens, events) = service(transport);
        auth.login(&Credentials::new(DEMO_USERNAME, DEMO_PASSWORD))
            .await
            .unwrap();
        let mut rx = events.subscribe();

        auth.logout();
        assert!(tokens.read().is_none());
        assert!(tokens.refresh_token().is_none());
        assert!(tokens.user().is_none());
        assert_eq!(rx.try_recv().unwrap(), SessionEvent::LoggedOut);
    }
}
