//! Where pet and tutor data comes from.
//!
//! # Design
//! `DataSource` is the capability the facades depend on. `RemoteDataSource`
//! talks to the REST backend through the session client; `MockDataSource`
//! serves the demo account from the in-memory [`MockStore`]. Which one a
//! signed-in handle gets is decided once, when the handle is built, never per
//! call.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::client::PetConnectApi;
use crate::error::ApiError;
use crate::mock_store::MockStore;
use crate::session::SessionClient;
use crate::types::{
    NewPet, NewTutor, Page, PageRequest, Pet, PetUpdate, PhotoFile, Tutor, TutorUpdate,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataMode {
    Remote,
    Demo,
}

#[async_trait]
pub trait DataSource: Send + Sync {
    fn mode(&self) -> DataMode;

    async fn list_pets(&self, query: &PageRequest) -> Result<Page<Pet>, ApiError>;
    async fn get_pet(&self, id: i64) -> Result<Pet, ApiError>;
    async fn create_pet(&self, pet: &NewPet) -> Result<Pet, ApiError>;
    async fn update_pet(&self, id: i64, update: &PetUpdate) -> Result<Pet, ApiError>;
    async fn upload_pet_photo(&self, id: i64, photo: PhotoFile) -> Result<(), ApiError>;

    async fn list_tutors(&self, query: &PageRequest) -> Result<Page<Tutor>, ApiError>;
    async fn get_tutor(&self, id: i64) -> Result<Tutor, ApiError>;
    async fn create_tutor(&self, tutor: &NewTutor) -> Result<Tutor, ApiError>;
    async fn update_tutor(&self, id: i64, update: &TutorUpdate) -> Result<Tutor, ApiError>;
    async fn upload_tutor_photo(&self, id: i64, photo: PhotoFile) -> Result<(), ApiError>;

    async fn link_pet(&self, tutor_id: i64, pet_id: i64) -> Result<(), ApiError>;
    async fn unlink_pet(&self, tutor_id: i64, pet_id: i64) -> Result<(), ApiError>;
}

// -------------------------------------------------------------------------
// Remote
// -------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RemoteDataSource {
    api: PetConnectApi,
    session: SessionClient,
}

impl RemoteDataSource {
    pub fn new(api: PetConnectApi, session: SessionClient) -> Self {
        Self { api, session }
    }
}

#[async_trait]
impl DataSource for RemoteDataSource {
    fn mode(&self) -> DataMode {
        DataMode::Remote
    }

    async fn list_pets(&self, query: &PageRequest) -> Result<Page<Pet>, ApiError> {
        let response = self.session.send(self.api.build_list_pets(query)).await?;
        self.api.parse_list_pets(response)
    }

    async fn get_pet(&self, id: i64) -> Result<Pet, ApiError> {
        let response = self.session.send(self.api.build_get_pet(id)).await?;
        self.api.parse_pet(response)
    }

    async fn create_pet(&self, pet: &NewPet) -> Result<Pet, ApiError> {
        let response = self.session.send(self.api.build_create_pet(pet)?).await?;
        self.api.parse_pet(response)
    }

    async fn update_pet(&self, id: i64, update: &PetUpdate) -> Result<Pet, ApiError> {
        let response = self
            .session
            .send(self.api.build_update_pet(id, update)?)
            .await?;
        self.api.parse_pet(response)
    }

    async fn upload_pet_photo(&self, id: i64, photo: PhotoFile) -> Result<(), ApiError> {
        let response = self
            .session
            .send(self.api.build_upload_pet_photo(id, photo))
            .await?;
        self.api.parse_empty(response)
    }

    async fn list_tutors(&self, query: &PageRequest) -> Result<Page<Tutor>, ApiError> {
        let response = self.session.send(self.api.build_list_tutors(query)).await?;
        self.api.parse_list_tutors(response)
    }

    async fn get_tutor(&self, id: i64) -> Result<Tutor, ApiError> {
        let response = self.session.send(self.api.build_get_tutor(id)).await?;
        self.api.parse_tutor(response)
    }

    async fn create_tutor(&self, tutor: &NewTutor) -> Result<Tutor, ApiError> {
        let response = self
            .session
            .send(self.api.build_create_tutor(tutor)?)
            .await?;
        self.api.parse_tutor(response)
    }

    async fn update_tutor(&self, id: i64, update: &TutorUpdate) -> Result<Tutor, ApiError> {
        let response = self
            .session
            .send(self.api.build_update_tutor(id, update)?)
            .await?;
        self.api.parse_tutor(response)
    }

    async fn upload_tutor_photo(&self, id: i64, photo: PhotoFile) -> Result<(), ApiError> {
        let response = self
            .session
            .send(self.api.build_upload_tutor_photo(id, photo))
            .await?;
        self.api.parse_empty(response)
    }

    async fn link_pet(&self, tutor_id: i64, pet_id: i64) -> Result<(), ApiError> {
        let response = self
            .session
            .send(self.api.build_link_pet(tutor_id, pet_id))
            .await?;
        self.api.parse_empty(response)
    }

    async fn unlink_pet(&self, tutor_id: i64, pet_id: i64) -> Result<(), ApiError> {
        let response = self
            .session
            .send(self.api.build_unlink_pet(tutor_id, pet_id))
            .await?;
        self.api.parse_empty(response)
    }
}

// -------------------------------------------------------------------------
// Demo
// -------------------------------------------------------------------------

/// Serves the demo account from a shared [`MockStore`].
///
/// Photo uploads get a `blob:` URL that only identifies the upload within
/// this process; nothing is stored anywhere durable.
#[derive(Debug, Clone)]
pub struct MockDataSource {
    store: Arc<Mutex<MockStore>>,
}

impl MockDataSource {
    pub fn new(store: Arc<Mutex<MockStore>>) -> Self {
        Self { store }
    }

    fn store(&self) -> MutexGuard<'_, MockStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn object_url() -> String {
    format!("blob:petconnect/{}", uuid::Uuid::new_v4())
}

fn matches_name(name: &str, filter: Option<&str>) -> bool {
    filter.map_or(true, |f| name.to_lowercase().contains(&f.to_lowercase()))
}

#[async_trait]
impl DataSource for MockDataSource {
    fn mode(&self) -> DataMode {
        DataMode::Demo
    }

    async fn list_pets(&self, query: &PageRequest) -> Result<Page<Pet>, ApiError> {
        let pets: Vec<Pet> = self
            .store()
            .pets()
            .into_iter()
            .filter(|p| matches_name(&p.name, query.name_filter()))
            .collect();
        Ok(Page::slice(pets, query))
    }

    async fn get_pet(&self, id: i64) -> Result<Pet, ApiError> {
        self.store().pet(id).ok_or(ApiError::NotFound)
    }

    async fn create_pet(&self, pet: &NewPet) -> Result<Pet, ApiError> {
        let mut store = self.store();
        if let Some(owner) = pet.owner_id {
            if store.tutor(owner).is_none() {
                return Err(ApiError::NotFound);
            }
        }
        Ok(store.create_pet(pet.clone()))
    }

    async fn update_pet(&self, id: i64, update: &PetUpdate) -> Result<Pet, ApiError> {
        self.store().update_pet(id, update).ok_or(ApiError::NotFound)
    }

    async fn upload_pet_photo(&self, id: i64, photo: PhotoFile) -> Result<(), ApiError> {
        tracing::debug!(id, file = %photo.file_name, bytes = photo.bytes.len(), "demo pet photo");
        self.store()
            .set_pet_photo(id, object_url())
            .map(|_| ())
            .ok_or(ApiError::NotFound)
    }

    async fn list_tutors(&self, query: &PageRequest) -> Result<Page<Tutor>, ApiError> {
        let tutors: Vec<Tutor> = self
            .store()
            .tutors()
            .into_iter()
            .filter(|t| matches_name(&t.name, query.name_filter()))
            .collect();
        Ok(Page::slice(tutors, query))
    }

    async fn get_tutor(&self, id: i64) -> Result<Tutor, ApiError> {
        self.store().tutor(id).ok_or(ApiError::NotFound)
    }

    async fn create_tutor(&self, tutor: &NewTutor) -> Result<Tutor, ApiError> {
        Ok(self.store().create_tutor(tutor.clone()))
    }

    async fn update_tutor(&self, id: i64, update: &TutorUpdate) -> Result<Tutor, ApiError> {
        self.store()
            .update_tutor(id, update)
            .ok_or(ApiError::NotFound)
    }

    async fn upload_tutor_photo(&self, id: i64, photo: PhotoFile) -> Result<(), ApiError> {
        tracing::debug!(id, file = %photo.file_name, bytes = photo.bytes.len(), "demo tutor photo");
        self.store()
            .set_tutor_photo(id, object_url())
            .map(|_| ())
            .ok_or(ApiError::NotFound)
    }

    async fn link_pet(&self, tutor_id: i64, pet_id: i64) -> Result<(), ApiError> {
        let mut store = self.store();
        if store.tutor(tutor_id).is_none() {
            return Err(ApiError::NotFound);
        }
        store
            .set_pet_owner(pet_id, Some(tutor_id))
            .map(|_| ())
            .ok_or(ApiError::NotFound)
    }

    /// Only detaches the pet if it is linked to `tutor_id`.
    async fn unlink_pet(&self, tutor_id: i64, pet_id: i64) -> Result<(), ApiError> {
        let mut store = self.store();
        let pet = store.pet(pet_id).ok_or(ApiError::NotFound)?;
        if pet.owner_id == Some(tutor_id) {
            store.set_pet_owner(pet_id, None);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{PETS_PATH, TUTORS_PATH};
    use crate::events;
    use crate::http::{HttpBody, HttpMethod};
    use crate::storage::MemoryStore;
    use crate::test_support::{respond, ScriptedTransport};
    use crate::token_store::{Session, TokenStore};

    fn demo() -> MockDataSource {
        MockDataSource::new(Arc::new(Mutex::new(MockStore::seeded())))
    }

    fn remote(transport: Arc<ScriptedTransport>) -> RemoteDataSource {
        let tokens = TokenStore::new(Arc::new(MemoryStore::new()));
        tokens.save(&Session::new("t1").with_refresh_token("r1"));
        let api = PetConnectApi::new("http://api.test");
        let session = SessionClient::new(api.clone(), transport, tokens, events::channel());
        RemoteDataSource::new(api, session)
    }

    fn photo() -> PhotoFile {
        PhotoFile {
            file_name: "luna.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            bytes: vec![0xff, 0xd8],
        }
    }

    #[tokio::test]
    async fn demo_list_pets_pages_seed_data() {
        let page = demo().list_pets(&PageRequest::new(0, 10)).await.unwrap();
        assert_eq!(page.total_items, 2);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.items.len(), 2);
    }

    #[tokio::test]
    async fn demo_list_pets_filters_by_name_case_insensitively() {
        let page = demo()
            .list_pets(&PageRequest::default().with_name("LU"))
            .await
            .unwrap();
        assert_eq!(page.total_items, 1);
        assert_eq!(page.items[0].name, "Luna");
    }

    #[tokio::test]
    async fn demo_create_round_trips_through_get() {
        let source = demo();
        let created = source
            .create_pet(&NewPet {
                name: "Mel".to_string(),
                species: "CACHORRO".to_string(),
                age: Some(1),
                breed: None,
                owner_id: None,
            })
            .await
            .unwrap();
        assert_eq!(created.id, Some(3));
        assert_eq!(source.get_pet(3).await.unwrap(), created);
    }

    #[tokio::test]
    async fn demo_create_with_unknown_owner_is_not_found() {
        let source = demo();
        let err = source
            .create_pet(&NewPet {
                name: "Mel".to_string(),
                species: "CACHORRO".to_string(),
                age: None,
                breed: None,
                owner_id: Some(99),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound));
        assert_eq!(source.list_pets(&PageRequest::default()).await.unwrap().total_items, 2);

        let owned = source
            .create_pet(&NewPet {
                name: "Bidu".to_string(),
                species: "CACHORRO".to_string(),
                age: None,
                breed: None,
                owner_id: Some(1),
            })
            .await
            .unwrap();
        assert_eq!(owned.owner_id, Some(1));
        let tutor = source.get_tutor(1).await.unwrap();
        let pets = tutor.pets.unwrap_or_default();
        assert!(pets.iter().any(|p| p.name == "Bidu"));
    }

    #[tokio::test]
    async fn demo_unknown_ids_are_not_found() {
        let source = demo();
        assert!(matches!(source.get_pet(99).await, Err(ApiError::NotFound)));
        assert!(matches!(
            source.update_pet(99, &PetUpdate::default()).await,
            Err(ApiError::NotFound)
        ));
        assert!(matches!(
            source.update_tutor(99, &TutorUpdate::default()).await,
            Err(ApiError::NotFound)
        ));
        assert!(matches!(
            source.upload_pet_photo(99, photo()).await,
            Err(ApiError::NotFound)
        ));
        assert!(matches!(source.link_pet(99, 1).await, Err(ApiError::NotFound)));
        assert!(matches!(source.link_pet(1, 99).await, Err(ApiError::NotFound)));
    }

    #[tokio::test]
    async fn demo_link_then_unlink() {
        let source = demo();
        source.link_pet(1, 2).await.unwrap();
        let tutor = source.get_tutor(1).await.unwrap();
        assert!(tutor.pets.unwrap().iter().any(|p| p.id == Some(2)));
        assert_eq!(source.get_pet(2).await.unwrap().owner_id, Some(1));

        source.unlink_pet(1, 2).await.unwrap();
        let tutor = source.get_tutor(1).await.unwrap();
        assert!(tutor.pets.unwrap().is_empty());
        assert_eq!(source.get_pet(2).await.unwrap().owner_id, None);
    }

    #[tokio::test]
    async fn demo_unlink_from_other_tutor_keeps_owner() {
        let source = demo();
        source.link_pet(1, 2).await.unwrap();
        source.unlink_pet(5, 2).await.unwrap();
        assert_eq!(source.get_pet(2).await.unwrap().owner_id, Some(1));
    }

    #[tokio::test]
    async fn demo_photo_gets_ephemeral_object_url() {
        let source = demo();
        source.upload_pet_photo(1, photo()).await.unwrap();
        let url = source.get_pet(1).await.unwrap().photo_url.unwrap();
        assert!(url.starts_with("blob:petconnect/"));
    }

    #[tokio::test]
    async fn remote_routes_through_session_client() {
        let transport = Arc::new(ScriptedTransport::new(|req| {
            match (req.method, req.path.as_str()) {
                (HttpMethod::Get, "http://api.test/v1/pets") => respond(
                    200,
                    r#"[{"id":1,"nome":"Rex","especie":"CACHORRO"},{"id":2,"nome":"Luna","especie":"GATO"}]"#,
                ),
                (HttpMethod::Get, "http://api.test/v1/pets/404") => respond(404, ""),
                (HttpMethod::Post, "http://api.test/v1/tutores/1/pets/2") => respond(201, ""),
                _ => respond(200, "{}"),
            }
        }));
        let source = remote(transport.clone());
        assert_eq!(source.mode(), DataMode::Remote);

        let page = source.list_pets(&PageRequest::new(0, 10)).await.unwrap();
        assert_eq!(page.total_items, 2);
        assert_eq!(page.total_pages, 1);

        assert!(matches!(source.get_pet(404).await, Err(ApiError::NotFound)));
        source.link_pet(1, 2).await.unwrap();

        let sent = transport.requests();
        assert!(sent
            .iter()
            .all(|r| r.header("authorization") == Some("Bearer t1")));
        assert!(sent[0].path.ends_with(PETS_PATH));
        assert!(sent[2].path.contains(TUTORS_PATH));
    }

    #[tokio::test]
    async fn remote_update_unknown_id_is_not_found() {
        let transport = Arc::new(ScriptedTransport::new(|_| respond(404, "")));
        let source = remote(transport);
        assert!(matches!(
            source.update_pet(99, &PetUpdate::default()).await,
            Err(ApiError::NotFound)
        ));
        assert!(matches!(
            source.update_tutor(99, &TutorUpdate::default()).await,
            Err(ApiError::NotFound)
        ));
    }

    #[tokio::test]
    async fn remote_photo_upload_is_multipart() {
        let transport = Arc::new(ScriptedTransport::new(|_| respond(200, "{}")));
        let source = remote(transport.clone());
        source.upload_tutor_photo(4, photo()).await.unwrap();

        let sent = transport.requests();
        assert_eq!(sent[0].path, "http://api.test/v1/tutores/4/fotos");
        assert!(matches!(&sent[0].body, Some(HttpBody::Multipart(f)) if f.field == "arquivo"));
    }
}
