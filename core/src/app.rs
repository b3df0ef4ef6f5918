//! Composition root for front ends.
//!
//! [`PetConnect`] wires the transport, token store, session client and event
//! channel together once. Signing in yields a [`SignedIn`] handle whose data
//! source is fixed for its lifetime: the demo session gets the in-memory
//! store, every other session gets the REST backend.

use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;

use crate::auth::AuthService;
use crate::bio::PetBioClient;
use crate::client::PetConnectApi;
use crate::config::ClientConfig;
use crate::data_source::{DataMode, DataSource, MockDataSource, RemoteDataSource};
use crate::error::ApiError;
use crate::events::{self, EventSender, SessionEvent};
use crate::facade::{Pets, Tutors};
use crate::mock_store::MockStore;
use crate::session::SessionClient;
use crate::storage::KeyValueStore;
use crate::token_store::{Session, TokenStore};
use crate::transport::{ReqwestTransport, Transport};
use crate::types::{Credentials, NewTutor, Tutor, UserProfile};

#[derive(Clone)]
pub struct PetConnect {
    config: ClientConfig,
    api: PetConnectApi,
    transport: Arc<dyn Transport>,
    tokens: TokenStore,
    events: EventSender,
    auth: AuthService,
    session: SessionClient,
    demo_store: Arc<Mutex<MockStore>>,
}

/// A signed-in user and the services bound to their session.
#[derive(Clone)]
pub struct SignedIn {
    user: Option<UserProfile>,
    mode: DataMode,
    pets: Pets,
    tutors: Tutors,
}

impl SignedIn {
    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    pub fn mode(&self) -> DataMode {
        self.mode
    }

    pub fn pets(&self) -> &Pets {
        &self.pets
    }

    pub fn tutors(&self) -> &Tutors {
        &self.tutors
    }
}

/// Outcome of [`PetConnect::register_tutor`].
pub struct Registration {
    pub tutor: Tutor,
    /// Set when the registration also signed the new tutor in.
    pub signed_in: Option<SignedIn>,
}

impl PetConnect {
    pub fn new(config: ClientConfig, storage: Arc<dyn KeyValueStore>) -> Result<Self, ApiError> {
        let transport = Arc::new(ReqwestTransport::new(config.api.timeout())?);
        Ok(Self::with_transport(config, storage, transport))
    }

    pub fn with_transport(
        config: ClientConfig,
        storage: Arc<dyn KeyValueStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let api = PetConnectApi::new(&config.api.base_url);
        let tokens = TokenStore::new(storage);
        let events = events::channel();
        let auth = AuthService::new(
            api.clone(),
            Arc::clone(&transport),
            tokens.clone(),
            events.clone(),
        );
        let session = SessionClient::new(
            api.clone(),
            Arc::clone(&transport),
            tokens.clone(),
            events.clone(),
        );
        Self {
            config,
            api,
            transport,
            tokens,
            events,
            auth,
            session,
            demo_store: Arc::new(Mutex::new(MockStore::seeded())),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// Session lifecycle events, including expiry after a failed refresh.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<SignedIn, ApiError> {
        let session = self.auth.login(credentials).await?;
        Ok(self.signed_in(&session))
    }

    /// Pick up the session persisted by an earlier run, if any.
    pub fn resume(&self) -> Option<SignedIn> {
        let session = self.tokens.read()?;
        tracing::debug!(demo = session.is_demo(), "resuming stored session");
        Some(self.signed_in(&session))
    }

    pub fn logout(&self) {
        self.auth.logout();
    }

    /// Create a tutor on the backend, then sign in as them when both an
    /// email and a password are given.
    pub async fn register_tutor(
        &self,
        tutor: &NewTutor,
        password: Option<&str>,
    ) -> Result<Registration, ApiError> {
        let response = self
            .session
            .send(self.api.build_create_tutor(tutor)?)
            .await?;
        let created = self.api.parse_tutor(response)?;
        tracing::info!(id = ?created.id, "tutor registered");

        let signed_in = match (tutor.email.as_deref(), password) {
            (Some(email), Some(password)) => {
                Some(self.login(&Credentials::new(email, password)).await?)
            }
            _ => None,
        };
        Ok(Registration {
            tutor: created,
            signed_in,
        })
    }

    pub fn bio(&self) -> PetBioClient {
        PetBioClient::new(self.config.ai.clone(), Arc::clone(&self.transport))
    }

    fn signed_in(&self, session: &Session) -> SignedIn {
        let source: Arc<dyn DataSource> = if session.is_demo() {
            Arc::new(MockDataSource::new(Arc::clone(&self.demo_store)))
        } else {
            Arc::new(RemoteDataSource::new(
                self.api.clone(),
                self.session.clone(),
            ))
        };
        tracing::debug!(mode = ?source.mode(), "data source selected");
        SignedIn {
            user: session.user.clone(),
            mode: source.mode(),
            pets: Pets::new(Arc::clone(&source)),
            tutors: Tutors::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{DEMO_PASSWORD, DEMO_USERNAME};
    use crate::client::{LOGIN_PATH, PETS_PATH, TUTORS_PATH};
    use crate::http::HttpMethod;
    use crate::storage::MemoryStore;
    use crate::test_support::{respond, ScriptedTransport};

    fn backend() -> Arc<ScriptedTransport> {
        Arc::new(ScriptedTransport::new(|req| {
            if req.path.ends_with(LOGIN_PATH) {
                respond(200, r#"{"access_token":"t1","refresh_token":"r1"}"#)
            } else if req.path.ends_with(PETS_PATH) {
                respond(200, r#"[{"id":7,"nome":"Bob","especie":"CACHORRO"}]"#)
            } else if req.path.ends_with(TUTORS_PATH) && req.method == HttpMethod::Post {
                respond(
                    201,
                    r#"{"id":9,"nome":"Ana","telefone":"1","endereco":"Rua A","email":"ana@x.com"}"#,
                )
            } else {
                respond(404, "")
            }
        }))
    }

    fn app(transport: Arc<ScriptedTransport>) -> PetConnect {
        PetConnect::with_transport(
            ClientConfig::with_base_url("http://api.test"),
            Arc::new(MemoryStore::new()),
            transport,
        )
    }

    #[tokio::test]
    async fn demo_login_uses_mock_data() {
        let transport = backend();
        let app = app(transport.clone());

        let signed_in = app
            .login(&Credentials::new(DEMO_USERNAME, DEMO_PASSWORD))
            .await
            .unwrap();
        assert_eq!(signed_in.mode(), DataMode::Demo);
        assert_eq!(signed_in.user().unwrap().name, "Demo User");

        let page = signed_in.pets().list(None, 0, 10).await.unwrap();
        assert_eq!(page.total_items, 2);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn remote_login_uses_backend() {
        let transport = backend();
        let app = app(transport.clone());

        let signed_in = app.login(&Credentials::new("ana", "pw")).await.unwrap();
        assert_eq!(signed_in.mode(), DataMode::Remote);

        let page = signed_in.pets().list(None, 0, 10).await.unwrap();
        assert_eq!(page.items[0].name, "Bob");
        assert_eq!(page.total_pages, 1);
        let last = transport.requests().pop().unwrap();
        assert_eq!(last.header("authorization"), Some("Bearer t1"));
    }

    #[tokio::test]
    async fn demo_changes_live_as_long_as_the_client() {
        let app = app(backend());
        let credentials = Credentials::new(DEMO_USERNAME, DEMO_PASSWORD);

        let first = app.login(&credentials).await.unwrap();
        first.tutors().link_pet(1, 1).await.unwrap();
        app.logout();

        let second = app.login(&credentials).await.unwrap();
        let pets = second.tutors().get(1).await.unwrap().pets.unwrap();
        assert_eq!(pets.len(), 1);
    }

    #[tokio::test]
    async fn resume_restores_stored_session() {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let config = ClientConfig::with_base_url("http://api.test");

        let first = PetConnect::with_transport(config.clone(), Arc::clone(&storage), backend());
        assert!(first.resume().is_none());
        first.login(&Credentials::new("ana", "pw")).await.unwrap();

        let second = PetConnect::with_transport(config, storage, backend());
        let resumed = second.resume().unwrap();
        assert_eq!(resumed.mode(), DataMode::Remote);
    }

    #[tokio::test]
    async fn register_with_password_signs_in() {
        let transport = backend();
        let app = app(transport.clone());
        let mut events = app.subscribe();

        let registration = app
            .register_tutor(
                &NewTutor {
                    name: "Ana".to_string(),
                    tax_id: Some("123.456.789-09".to_string()),
                    phone: "1".to_string(),
                    address: "Rua A".to_string(),
                    email: Some("ana@x.com".to_string()),
                },
                Some("pw"),
            )
            .await
            .unwrap();
        assert_eq!(registration.tutor.id, Some(9));
        assert_eq!(
            registration.signed_in.map(|s| s.mode()),
            Some(DataMode::Remote)
        );
        assert_eq!(
            events.try_recv().unwrap(),
            SessionEvent::LoggedIn { demo: false }
        );

        let login = transport
            .requests()
            .into_iter()
            .find(|r| r.path.ends_with(LOGIN_PATH))
            .unwrap();
        let body: serde_json::Value =
            serde_json::from_str(login.body.unwrap().as_json().unwrap()).unwrap();
        assert_eq!(body["username"], "ana@x.com");
    }

    #[tokio::test]
    async fn register_without_password_stays_signed_out() {
        let app = app(backend());
        let registration = app
            .register_tutor(
                &NewTutor {
                    name: "Ana".to_string(),
                    tax_id: None,
                    phone: "1".to_string(),
                    address: "Rua A".to_string(),
                    email: Some("ana@x.com".to_string()),
                },
                None,
            )
            .await
            .unwrap();
        assert!(registration.signed_in.is_none());
        assert!(!app.auth().is_authenticated());
    }
}
