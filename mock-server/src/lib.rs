//! In-process PetConnect backend for integration tests and local runs.
//!
//! One seeded account (`admin` / `admin123`), bearer-token auth, pets and
//! tutors CRUD, multipart photo uploads and tutor/pet links. Pet listings
//! come back as a paginated envelope and tutor listings as a bare array, so
//! clients see both shapes the real backend has used.

use std::{
    collections::{BTreeMap, HashSet},
    sync::Arc,
};

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin123";
const PHOTO_FIELD: &str = "arquivo";
const ACCESS_TOKEN_TTL_SECS: u64 = 300;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Pet {
    pub id: i64,
    pub nome: String,
    pub especie: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idade: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raca: Option<String>,
    #[serde(rename = "fotoUrl", default, skip_serializing_if = "Option::is_none")]
    pub foto_url: Option<String>,
    #[serde(rename = "tutorId", default, skip_serializing_if = "Option::is_none")]
    pub tutor_id: Option<i64>,
}

#[derive(Deserialize)]
pub struct CreatePet {
    pub nome: String,
    pub especie: String,
    pub idade: Option<u32>,
    pub raca: Option<String>,
    #[serde(rename = "tutorId")]
    pub tutor_id: Option<i64>,
}

#[derive(Deserialize)]
pub struct UpdatePet {
    pub nome: Option<String>,
    pub especie: Option<String>,
    pub idade: Option<u32>,
    pub raca: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Tutor {
    pub id: i64,
    pub nome: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpf: Option<u64>,
    pub telefone: String,
    pub endereco: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "fotoUrl", default, skip_serializing_if = "Option::is_none")]
    pub foto_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pets: Option<Vec<Pet>>,
}

/// Tutor create and update payloads share this shape; every field is
/// optional so updates can be partial. `cpf` is taken as raw JSON so a
/// string can be rejected with a message instead of a generic 422.
#[derive(Deserialize)]
pub struct TutorInput {
    pub nome: Option<String>,
    pub cpf: Option<serde_json::Value>,
    pub telefone: Option<String>,
    pub endereco: Option<String>,
    pub email: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub nome: Option<String>,
}

#[derive(Serialize)]
struct PageEnvelope<T> {
    content: Vec<T>,
    #[serde(rename = "totalElements")]
    total_elements: u64,
    #[serde(rename = "totalPages")]
    total_pages: u32,
    size: u32,
    number: u32,
}

#[derive(Default)]
struct Backend {
    pets: BTreeMap<i64, Pet>,
    tutors: BTreeMap<i64, Tutor>,
    next_pet_id: i64,
    next_tutor_id: i64,
    access_tokens: HashSet<String>,
    refresh_tokens: HashSet<String>,
    refresh_calls: u64,
}

impl Backend {
    fn seeded() -> Self {
        let mut backend = Backend {
            next_pet_id: 1,
            next_tutor_id: 1,
            ..Backend::default()
        };
        for (nome, especie, idade, raca) in [
            ("Thor", "CACHORRO", 4, "Labrador"),
            ("Mia", "GATO", 1, "Persa"),
            ("Bolt", "CACHORRO", 2, "Border Collie"),
        ] {
            let id = backend.next_pet_id;
            backend.next_pet_id += 1;
            backend.pets.insert(
                id,
                Pet {
                    id,
                    nome: nome.to_string(),
                    especie: especie.to_string(),
                    idade: Some(idade),
                    raca: Some(raca.to_string()),
                    foto_url: None,
                    tutor_id: None,
                },
            );
        }
        let id = backend.next_tutor_id;
        backend.next_tutor_id += 1;
        backend.tutors.insert(
            id,
            Tutor {
                id,
                nome: "Maria Souza".to_string(),
                cpf: Some(12345678909),
                telefone: "(65) 98888-7777".to_string(),
                endereco: "Rua das Flores, 10".to_string(),
                email: Some("maria@petconnect.local".to_string()),
                foto_url: None,
                pets: None,
            },
        );
        backend
    }

    fn issue_access_token(&mut self) -> String {
        let token = format!("access-{}", Uuid::new_v4());
        self.access_tokens.insert(token.clone());
        token
    }

    fn tutor_with_pets(&self, id: i64) -> Option<Tutor> {
        let mut tutor = self.tutors.get(&id)?.clone();
        tutor.pets = Some(
            self.pets
                .values()
                .filter(|p| p.tutor_id == Some(id))
                .cloned()
                .collect(),
        );
        Some(tutor)
    }
}

/// Shared server state. Tests keep a clone to force token expiry and to
/// observe refresh traffic.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<RwLock<Backend>>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Backend::seeded())),
        }
    }

    /// Invalidate every access token issued so far. Refresh tokens stay valid.
    pub async fn expire_access_tokens(&self) {
        self.inner.write().await.access_tokens.clear();
    }

    /// Invalidate every refresh token issued so far.
    pub async fn revoke_refresh_tokens(&self) {
        self.inner.write().await.refresh_tokens.clear();
    }

    /// Number of refresh calls received, successful or not.
    pub async fn refresh_count(&self) -> u64 {
        self.inner.read().await.refresh_calls
    }
}

pub enum ApiFailure {
    Unauthorized,
    NotFound,
    BadRequest(String),
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        match self {
            ApiFailure::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            ApiFailure::NotFound => (
                StatusCode::NOT_FOUND,
                Json(json!({ "message": "Resource not found" })),
            )
                .into_response(),
            ApiFailure::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "message": message }))).into_response()
            }
        }
    }
}

type ApiResult<T> = Result<T, ApiFailure>;

pub fn app() -> Router {
    app_with_state(AppState::new())
}

pub fn app_with_state(state: AppState) -> Router {
    Router::new()
        .route("/autenticacao/login", post(login))
        .route("/autenticacao/refresh", put(refresh))
        .route("/v1/pets", get(list_pets).post(create_pet))
        .route("/v1/pets/{id}", get(get_pet).put(update_pet))
        .route("/v1/pets/{id}/fotos", post(upload_pet_photo))
        .route("/v1/tutores", get(list_tutors).post(create_tutor))
        .route("/v1/tutores/{id}", get(get_tutor).put(update_tutor))
        .route("/v1/tutores/{id}/fotos", post(upload_tutor_photo))
        .route(
            "/v1/tutores/{tutor_id}/pets/{pet_id}",
            post(link_pet).delete(unlink_pet),
        )
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_state(listener, AppState::new()).await
}

pub async fn run_with_state(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(state)).await
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

async fn authorize(state: &AppState, headers: &HeaderMap) -> ApiResult<()> {
    let token = bearer(headers).ok_or(ApiFailure::Unauthorized)?;
    if state.inner.read().await.access_tokens.contains(token) {
        Ok(())
    } else {
        Err(ApiFailure::Unauthorized)
    }
}

fn page_of<T>(items: Vec<T>, query: &ListQuery) -> PageEnvelope<T> {
    let size = query.size.unwrap_or(10).max(1);
    let total = items.len() as u64;
    let total_pages = total.div_ceil(u64::from(size)) as u32;
    let number = query.page.unwrap_or(0);
    let content = items
        .into_iter()
        .skip(number as usize * size as usize)
        .take(size as usize)
        .collect();
    PageEnvelope {
        content,
        total_elements: total,
        total_pages,
        size,
        number,
    }
}

fn name_matches(nome: &str, filter: &Option<String>) -> bool {
    match filter {
        Some(f) => nome.to_lowercase().contains(&f.to_lowercase()),
        None => true,
    }
}

fn required(value: Option<String>, field: &str) -> ApiResult<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ApiFailure::BadRequest(format!("{field} is required"))),
    }
}

fn parse_cpf(value: Option<serde_json::Value>) -> ApiResult<Option<u64>> {
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Number(n)) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| ApiFailure::BadRequest("cpf must be a positive number".to_string())),
        Some(_) => Err(ApiFailure::BadRequest("cpf must be numeric".to_string())),
    }
}

/// The photo file name from a multipart body, or a 400 when the `arquivo`
/// field is missing.
async fn photo_name(mut multipart: Multipart) -> ApiResult<String> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiFailure::BadRequest(e.to_string()))?
    {
        if field.name() == Some(PHOTO_FIELD) {
            let name = field.file_name().unwrap_or("foto").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiFailure::BadRequest(e.to_string()))?;
            tracing::debug!(name = %name, size = bytes.len(), "photo received");
            return Ok(name);
        }
    }
    Err(ApiFailure::BadRequest(format!("{PHOTO_FIELD} is required")))
}

// -------------------------------------------------------------------------
// Authentication
// -------------------------------------------------------------------------

async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginInput>,
) -> ApiResult<Json<serde_json::Value>> {
    if input.username != ADMIN_USERNAME || input.password != ADMIN_PASSWORD {
        tracing::info!(username = %input.username, "login rejected");
        return Err(ApiFailure::Unauthorized);
    }
    let mut backend = state.inner.write().await;
    let access_token = backend.issue_access_token();
    let refresh_token = format!("refresh-{}", Uuid::new_v4());
    backend.refresh_tokens.insert(refresh_token.clone());
    Ok(Json(json!({
        "access_token": access_token,
        "refresh_token": refresh_token,
        "expires_in": ACCESS_TOKEN_TTL_SECS,
        "usuario": {
            "id": 1,
            "nome": "Administrador",
            "email": "admin@petconnect.local",
            "tipo": "ADMIN"
        }
    })))
}

async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    let mut backend = state.inner.write().await;
    backend.refresh_calls += 1;
    let presented = bearer(&headers).ok_or(ApiFailure::Unauthorized)?;
    if !backend.refresh_tokens.contains(presented) {
        return Err(ApiFailure::Unauthorized);
    }
    let token = backend.issue_access_token();
    Ok(Json(json!({ "token": token })))
}

// -------------------------------------------------------------------------
// Pets
// -------------------------------------------------------------------------

async fn list_pets(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<PageEnvelope<Pet>>> {
    authorize(&state, &headers).await?;
    let backend = state.inner.read().await;
    let pets: Vec<Pet> = backend
        .pets
        .values()
        .filter(|p| name_matches(&p.nome, &query.nome))
        .cloned()
        .collect();
    Ok(Json(page_of(pets, &query)))
}

async fn get_pet(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult<Json<Pet>> {
    authorize(&state, &headers).await?;
    let backend = state.inner.read().await;
    backend.pets.get(&id).cloned().map(Json).ok_or(ApiFailure::NotFound)
}

async fn create_pet(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<CreatePet>,
) -> ApiResult<(StatusCode, Json<Pet>)> {
    authorize(&state, &headers).await?;
    let nome = required(Some(input.nome), "nome")?;
    let especie = required(Some(input.especie), "especie")?;
    let mut backend = state.inner.write().await;
    if let Some(tutor_id) = input.tutor_id {
        if !backend.tutors.contains_key(&tutor_id) {
            return Err(ApiFailure::NotFound);
        }
    }
    let id = backend.next_pet_id;
    backend.next_pet_id += 1;
    let pet = Pet {
        id,
        nome,
        especie,
        idade: input.idade,
        raca: input.raca,
        foto_url: None,
        tutor_id: input.tutor_id,
    };
    backend.pets.insert(id, pet.clone());
    Ok((StatusCode::CREATED, Json(pet)))
}

async fn update_pet(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(input): Json<UpdatePet>,
) -> ApiResult<Json<Pet>> {
    authorize(&state, &headers).await?;
    let mut backend = state.inner.write().await;
    let pet = backend.pets.get_mut(&id).ok_or(ApiFailure::NotFound)?;
    if let Some(nome) = input.nome {
        pet.nome = nome;
    }
    if let Some(especie) = input.especie {
        pet.especie = especie;
    }
    if let Some(idade) = input.idade {
        pet.idade = Some(idade);
    }
    if let Some(raca) = input.raca {
        pet.raca = Some(raca);
    }
    Ok(Json(pet.clone()))
}

async fn upload_pet_photo(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Pet>)> {
    authorize(&state, &headers).await?;
    let name = photo_name(multipart).await?;
    let mut backend = state.inner.write().await;
    let pet = backend.pets.get_mut(&id).ok_or(ApiFailure::NotFound)?;
    pet.foto_url = Some(format!("/fotos/pets/{id}/{}-{name}", Uuid::new_v4()));
    Ok((StatusCode::CREATED, Json(pet.clone())))
}

// -------------------------------------------------------------------------
// Tutors
// -------------------------------------------------------------------------

async fn list_tutors(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<Tutor>>> {
    authorize(&state, &headers).await?;
    let backend = state.inner.read().await;
    Ok(Json(
        backend
            .tutors
            .values()
            .filter(|t| name_matches(&t.nome, &query.nome))
            .cloned()
            .collect(),
    ))
}

async fn get_tutor(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult<Json<Tutor>> {
    authorize(&state, &headers).await?;
    let backend = state.inner.read().await;
    backend.tutor_with_pets(id).map(Json).ok_or(ApiFailure::NotFound)
}

async fn create_tutor(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<TutorInput>,
) -> ApiResult<(StatusCode, Json<Tutor>)> {
    authorize(&state, &headers).await?;
    let tutor = Tutor {
        id: 0,
        nome: required(input.nome, "nome")?,
        cpf: parse_cpf(input.cpf)?,
        telefone: required(input.telefone, "telefone")?,
        endereco: required(input.endereco, "endereco")?,
        email: input.email,
        foto_url: None,
        pets: None,
    };
    let mut backend = state.inner.write().await;
    let id = backend.next_tutor_id;
    backend.next_tutor_id += 1;
    let tutor = Tutor { id, ..tutor };
    backend.tutors.insert(id, tutor.clone());
    Ok((StatusCode::CREATED, Json(tutor)))
}

async fn update_tutor(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(input): Json<TutorInput>,
) -> ApiResult<Json<Tutor>> {
    authorize(&state, &headers).await?;
    let cpf = parse_cpf(input.cpf)?;
    let mut backend = state.inner.write().await;
    let tutor = backend.tutors.get_mut(&id).ok_or(ApiFailure::NotFound)?;
    if let Some(nome) = input.nome {
        tutor.nome = nome;
    }
    if cpf.is_some() {
        tutor.cpf = cpf;
    }
    if let Some(telefone) = input.telefone {
        tutor.telefone = telefone;
    }
    if let Some(endereco) = input.endereco {
        tutor.endereco = endereco;
    }
    if let Some(email) = input.email {
        tutor.email = Some(email);
    }
    Ok(Json(tutor.clone()))
}

async fn upload_tutor_photo(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Tutor>)> {
    authorize(&state, &headers).await?;
    let name = photo_name(multipart).await?;
    let mut backend = state.inner.write().await;
    let tutor = backend.tutors.get_mut(&id).ok_or(ApiFailure::NotFound)?;
    tutor.foto_url = Some(format!("/fotos/tutores/{id}/{}-{name}", Uuid::new_v4()));
    Ok((StatusCode::CREATED, Json(tutor.clone())))
}

async fn link_pet(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((tutor_id, pet_id)): Path<(i64, i64)>,
) -> ApiResult<StatusCode> {
    authorize(&state, &headers).await?;
    let mut backend = state.inner.write().await;
    if !backend.tutors.contains_key(&tutor_id) {
        return Err(ApiFailure::NotFound);
    }
    let pet = backend.pets.get_mut(&pet_id).ok_or(ApiFailure::NotFound)?;
    pet.tutor_id = Some(tutor_id);
    Ok(StatusCode::CREATED)
}

async fn unlink_pet(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((tutor_id, pet_id)): Path<(i64, i64)>,
) -> ApiResult<StatusCode> {
    authorize(&state, &headers).await?;
    let mut backend = state.inner.write().await;
    let pet = backend.pets.get_mut(&pet_id).ok_or(ApiFailure::NotFound)?;
    if pet.tutor_id == Some(tutor_id) {
        pet.tutor_id = None;
    }
    Ok(StatusCode::NO_CONTENT)
}
