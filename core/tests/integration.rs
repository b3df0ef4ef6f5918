//! Full client lifecycle against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives the composition root
//! over real HTTP with the reqwest transport: login, pet and tutor CRUD,
//! photo upload, linking, a forced access-token expiry and finally a
//! rejected refresh that ends the session.

use std::sync::Arc;

use futures::future::join_all;
use mock_server::{AppState, ADMIN_PASSWORD, ADMIN_USERNAME};
use petconnect_core::{
    error::MSG_INVALID_CREDENTIALS, ApiError, ClientConfig, Credentials, DataMode, ExpiryReason,
    MemoryStore, NewPet, NewTutor, PetConnect, PetUpdate, PhotoFile, SessionEvent,
};

/// Start the mock server and return a client pointed at it.
async fn start() -> (PetConnect, AppState) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = AppState::new();
    tokio::spawn(mock_server::run_with_state(listener, state.clone()));

    let app = PetConnect::new(
        ClientConfig::with_base_url(format!("http://{addr}")),
        Arc::new(MemoryStore::new()),
    )
    .unwrap();
    (app, state)
}

fn admin() -> Credentials {
    Credentials::new(ADMIN_USERNAME, ADMIN_PASSWORD)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn crud_lifecycle() {
    let (app, _) = start().await;

    // Step 1: sign in against the backend.
    let session = app.login(&admin()).await.unwrap();
    assert_eq!(session.mode(), DataMode::Remote);
    assert_eq!(session.user().unwrap().email, "admin@petconnect.local");
    let pets = session.pets();
    let tutors = session.tutors();

    // Step 2: paginated pet listing.
    let page = pets.list(None, 0, 2).await.unwrap();
    assert_eq!(page.total_items, 3);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.items.len(), 2);

    // Step 3: create, fetch and partially update a pet.
    let created = pets
        .create(&NewPet {
            name: "Pipoca".to_string(),
            species: "GATO".to_string(),
            age: Some(1),
            breed: None,
            owner_id: None,
        })
        .await
        .unwrap();
    let id = created.id.unwrap();
    assert_eq!(pets.get(id).await.unwrap(), created);

    let updated = pets
        .update(
            id,
            &PetUpdate {
                breed: Some("SRD".to_string()),
                ..PetUpdate::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Pipoca");
    assert_eq!(updated.breed.as_deref(), Some("SRD"));

    // Step 4: photo upload as multipart.
    pets.upload_photo(
        id,
        PhotoFile {
            file_name: "pipoca.png".to_string(),
            content_type: "image/png".to_string(),
            bytes: vec![0x89, b'P', b'N', b'G'],
        },
    )
    .await
    .unwrap();
    assert!(pets
        .get(id)
        .await
        .unwrap()
        .photo_url
        .unwrap()
        .ends_with("pipoca.png"));

    // Step 5: name filter.
    let filtered = pets.list(Some("pip"), 0, 10).await.unwrap();
    assert_eq!(filtered.items.len(), 1);

    // Step 6: tutor listing arrives as a bare array.
    let listing = tutors.list(None, 0, 10).await.unwrap();
    assert_eq!(listing.total_pages, 1);
    assert_eq!(listing.items.len(), 1);

    // Step 7: a formatted tax id goes over the wire as digits.
    let tutor = tutors
        .create(&NewTutor {
            name: "Ana Lima".to_string(),
            tax_id: Some("987.654.321-00".to_string()),
            phone: "(65) 91234-5678".to_string(),
            address: "Av. Brasil, 200".to_string(),
            email: Some("ana@petconnect.local".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(tutor.tax_id.as_deref(), Some("98765432100"));
    let tutor_id = tutor.id.unwrap();

    // Step 8: link, observe the join, unlink.
    tutors.link_pet(tutor_id, id).await.unwrap();
    let joined = tutors.get(tutor_id).await.unwrap().pets.unwrap();
    assert_eq!(joined.len(), 1);
    assert_eq!(joined[0].id, Some(id));

    tutors.unlink_pet(tutor_id, id).await.unwrap();
    assert!(tutors.get(tutor_id).await.unwrap().pets.unwrap().is_empty());

    // Step 9: unknown ids.
    assert!(matches!(pets.get(999).await, Err(ApiError::NotFound)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn wrong_password_is_rejected() {
    let (app, _) = start().await;

    let err = app
        .login(&Credentials::new(ADMIN_USERNAME, "nope"))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, ApiError::Unauthorized { .. }));
    assert_eq!(err.user_message(), MSG_INVALID_CREDENTIALS);
    assert!(!app.auth().is_authenticated());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn expired_access_token_is_refreshed_once() {
    let (app, state) = start().await;
    let session = app.login(&admin()).await.unwrap();
    let before = app.tokens().access_token().unwrap();

    state.expire_access_tokens().await;
    let results = join_all((0..5).map(|_| session.pets().list(None, 0, 10))).await;
    for result in results {
        assert_eq!(result.unwrap().total_items, 3);
    }

    assert_eq!(state.refresh_count().await, 1);
    let after = app.tokens().access_token().unwrap();
    assert_ne!(before, after);
    assert!(app.tokens().refresh_token().is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn rejected_refresh_ends_session() {
    let (app, state) = start().await;
    let session = app.login(&admin()).await.unwrap();
    let mut events = app.subscribe();

    state.expire_access_tokens().await;
    state.revoke_refresh_tokens().await;

    let err = session.pets().list(None, 0, 10).await.unwrap_err();
    assert!(matches!(err, ApiError::SessionExpired));
    assert!(app.tokens().read().is_none());
    assert!(app.tokens().refresh_token().is_none());
    assert!(app.tokens().user().is_none());
    assert_eq!(
        events.try_recv().unwrap(),
        SessionEvent::Expired(ExpiryReason::RefreshRejected)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn demo_account_works_without_backend_account() {
    let (app, state) = start().await;

    let session = app
        .login(&Credentials::new("teste", "teste123"))
        .await
        .unwrap();
    assert_eq!(session.mode(), DataMode::Demo);
    let page = session.pets().list(None, 0, 10).await.unwrap();
    let names: Vec<_> = page.items.into_iter().map(|p| p.name).collect();
    assert_eq!(names, vec!["Rex", "Luna"]);
    assert_eq!(state.refresh_count().await, 0);
}
