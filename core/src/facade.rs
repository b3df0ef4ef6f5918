//! Per-entity services used by the front end.
//!
//! Thin wrappers over a [`DataSource`]; they fill in paging defaults and
//! keep call sites independent of whether the demo or the remote source is
//! behind them.

use std::sync::Arc;

use crate::data_source::{DataMode, DataSource};
use crate::error::ApiError;
use crate::types::{
    NewPet, NewTutor, Page, PageRequest, Pet, PetUpdate, PhotoFile, Tutor, TutorUpdate,
};

fn page_request(filter: Option<&str>, page: u32, size: u32) -> PageRequest {
    let request = PageRequest::new(page, size);
    match filter {
        Some(name) => request.with_name(name),
        None => request,
    }
}

#[derive(Clone)]
pub struct Pets {
    source: Arc<dyn DataSource>,
}

impl Pets {
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        Self { source }
    }

    pub fn mode(&self) -> DataMode {
        self.source.mode()
    }

    pub async fn list(
        &self,
        filter: Option<&str>,
        page: u32,
        size: u32,
    ) -> Result<Page<Pet>, ApiError> {
        self.source
            .list_pets(&page_request(filter, page, size))
            .await
    }

    pub async fn get(&self, id: i64) -> Result<Pet, ApiError> {
        self.source.get_pet(id).await
    }

    pub async fn create(&self, pet: &NewPet) -> Result<Pet, ApiError> {
        let created = self.source.create_pet(pet).await?;
        tracing::info!(id = ?created.id, "pet created");
        Ok(created)
    }

    pub async fn update(&self, id: i64, update: &PetUpdate) -> Result<Pet, ApiError> {
        self.source.update_pet(id, update).await
    }

    pub async fn upload_photo(&self, id: i64, photo: PhotoFile) -> Result<(), ApiError> {
        self.source.upload_pet_photo(id, photo).await
    }
}

#[derive(Clone)]
pub struct Tutors {
    source: Arc<dyn DataSource>,
}

impl Tutors {
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        Self { source }
    }

    pub fn mode(&self) -> DataMode {
        self.source.mode()
    }

    pub async fn list(
        &self,
        filter: Option<&str>,
        page: u32,
        size: u32,
    ) -> Result<Page<Tutor>, ApiError> {
        self.source
            .list_tutors(&page_request(filter, page, size))
            .await
    }

    /// The tutor together with its linked pets.
    pub async fn get(&self, id: i64) -> Result<Tutor, ApiError> {
        self.source.get_tutor(id).await
    }

    pub async fn create(&self, tutor: &NewTutor) -> Result<Tutor, ApiError> {
        let created = self.source.create_tutor(tutor).await?;
        tracing::info!(id = ?created.id, "tutor created");
        Ok(created)
    }

    pub async fn update(&self, id: i64, update: &TutorUpdate) -> Result<Tutor, ApiError> {
        self.source.update_tutor(id, update).await
    }

    pub async fn upload_photo(&self, id: i64, photo: PhotoFile) -> Result<(), ApiError> {
        self.source.upload_tutor_photo(id, photo).await
    }

    /// Point the pet's owner at this tutor.
    pub async fn link_pet(&self, tutor_id: i64, pet_id: i64) -> Result<(), ApiError> {
        self.source.link_pet(tutor_id, pet_id).await?;
        tracing::info!(tutor_id, pet_id, "pet linked");
        Ok(())
    }

    pub async fn unlink_pet(&self, tutor_id: i64, pet_id: i64) -> Result<(), ApiError> {
        self.source.unlink_pet(tutor_id, pet_id).await?;
        tracing::info!(tutor_id, pet_id, "pet unlinked");
        Ok(())
    }
}
