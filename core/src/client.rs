//! Stateless HTTP request builder and response parser for the PetConnect API.
//!
//! # Design
//! `PetConnectApi` holds only a `base_url` and carries no mutable state
//! between calls. Each backend operation is split into a `build_*` method
//! that produces an `HttpRequest` and a `parse_*` method that consumes an
//! `HttpResponse`. Authentication headers are not added here; the
//! [`SessionClient`](crate::session::SessionClient) attaches them when it
//! sends the request, so a built request can be replayed with a new token.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::http::{HttpBody, HttpMethod, HttpRequest, HttpResponse, MultipartFile};
use crate::types::{
    tax_id_digits, Credentials, LoginResponse, NewPet, NewTutor, Page, PageRequest, Pet, PetUpdate,
    PhotoFile, RefreshedTokens, Tutor, TutorUpdate, UserProfile,
};

pub const LOGIN_PATH: &str = "/autenticacao/login";
pub const REFRESH_PATH: &str = "/autenticacao/refresh";
pub const PETS_PATH: &str = "/v1/pets";
pub const TUTORS_PATH: &str = "/v1/tutores";
/// Multipart field the backend reads uploaded photos from.
pub const PHOTO_FIELD: &str = "arquivo";

/// Synchronous, stateless client for the PetConnect REST API.
#[derive(Debug, Clone)]
pub struct PetConnectApi {
    base_url: String,
}

impl PetConnectApi {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn json_request<T: Serialize>(
        &self,
        method: HttpMethod,
        path: &str,
        payload: &T,
    ) -> Result<HttpRequest, ApiError> {
        let body =
            serde_json::to_string(payload).map_err(|e| ApiError::Serialization(e.to_string()))?;
        let mut req = HttpRequest::new(method, self.url(path));
        req.set_header("content-type", "application/json".to_string());
        req.body = Some(HttpBody::Json(body));
        Ok(req)
    }

    fn photo_request(&self, path: &str, photo: PhotoFile) -> HttpRequest {
        let mut req = HttpRequest::new(HttpMethod::Post, self.url(path));
        req.body = Some(HttpBody::Multipart(MultipartFile {
            field: PHOTO_FIELD.to_string(),
            file_name: photo.file_name,
            content_type: photo.content_type,
            bytes: photo.bytes,
        }));
        req
    }

    fn list_request(&self, path: &str, query: &PageRequest) -> HttpRequest {
        let mut req = HttpRequest::new(HttpMethod::Get, self.url(path));
        req.query.push(("page".to_string(), query.page.to_string()));
        req.query
            .push(("size".to_string(), query.effective_size().to_string()));
        if let Some(name) = query.name_filter() {
            req.query.push(("nome".to_string(), name.to_string()));
        }
        req
    }

    // ---------------------------------------------------------------------
    // Authentication
    // ---------------------------------------------------------------------

    pub fn build_login(&self, credentials: &Credentials) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, LOGIN_PATH, credentials)
    }

    pub fn parse_login(&self, response: HttpResponse) -> Result<LoginResponse, ApiError> {
        let wire: LoginWire = decode(&response)?;
        let access_token = wire
            .access_token
            .or(wire.token)
            .or(wire.access_token_camel)
            .ok_or_else(|| {
                ApiError::Deserialization("login response carried no access token".to_string())
            })?;
        Ok(LoginResponse {
            access_token,
            refresh_token: wire.refresh_token.or(wire.refresh_token_camel),
            expires_in: wire.expires_in,
            user: wire.usuario.or(wire.user),
        })
    }

    /// The refresh token travels both as the bearer credential and in the body.
    pub fn build_refresh(&self, refresh_token: &str) -> Result<HttpRequest, ApiError> {
        let mut req = self.json_request(
            HttpMethod::Put,
            REFRESH_PATH,
            &RefreshBody { refresh_token },
        )?;
        req.set_bearer(refresh_token);
        Ok(req)
    }

    pub fn parse_refresh(&self, response: HttpResponse) -> Result<RefreshedTokens, ApiError> {
        let wire: RefreshWire = decode(&response)?;
        let access_token = wire.token.or(wire.access_token).ok_or_else(|| {
            ApiError::Deserialization("refresh response carried no access token".to_string())
        })?;
        Ok(RefreshedTokens {
            access_token,
            refresh_token: wire.refresh_token.or(wire.refresh_token_snake),
        })
    }

    // ---------------------------------------------------------------------
    // Pets
    // ---------------------------------------------------------------------

    pub fn build_list_pets(&self, query: &PageRequest) -> HttpRequest {
        self.list_request(PETS_PATH, query)
    }

    pub fn build_get_pet(&self, id: i64) -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, self.url(&format!("{PETS_PATH}/{id}")))
    }

    pub fn build_create_pet(&self, pet: &NewPet) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, PETS_PATH, pet)
    }

    pub fn build_update_pet(&self, id: i64, update: &PetUpdate) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Put, &format!("{PETS_PATH}/{id}"), update)
    }

    pub fn build_upload_pet_photo(&self, id: i64, photo: PhotoFile) -> HttpRequest {
        self.photo_request(&format!("{PETS_PATH}/{id}/fotos"), photo)
    }

    pub fn parse_list_pets(&self, response: HttpResponse) -> Result<Page<Pet>, ApiError> {
        parse_page(&response)
    }

    pub fn parse_pet(&self, response: HttpResponse) -> Result<Pet, ApiError> {
        decode(&response)
    }

    // ---------------------------------------------------------------------
    // Tutors
    // ---------------------------------------------------------------------

    pub fn build_list_tutors(&self, query: &PageRequest) -> HttpRequest {
        self.list_request(TUTORS_PATH, query)
    }

    pub fn build_get_tutor(&self, id: i64) -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, self.url(&format!("{TUTORS_PATH}/{id}")))
    }

    /// The tax id is sent digits-only, as a number.
    pub fn build_create_tutor(&self, tutor: &NewTutor) -> Result<HttpRequest, ApiError> {
        let payload = TutorPayload {
            name: Some(&tutor.name),
            email: tutor.email.as_deref(),
            phone: Some(&tutor.phone),
            address: Some(&tutor.address),
            tax_id: tutor.tax_id.as_deref().and_then(tax_id_digits),
        };
        self.json_request(HttpMethod::Post, TUTORS_PATH, &payload)
    }

    pub fn build_update_tutor(
        &self,
        id: i64,
        update: &TutorUpdate,
    ) -> Result<HttpRequest, ApiError> {
        let payload = TutorPayload {
            name: update.name.as_deref(),
            email: update.email.as_deref(),
            phone: update.phone.as_deref(),
            address: update.address.as_deref(),
            tax_id: update.tax_id.as_deref().and_then(tax_id_digits),
        };
        self.json_request(HttpMethod::Put, &format!("{TUTORS_PATH}/{id}"), &payload)
    }

    pub fn build_upload_tutor_photo(&self, id: i64, photo: PhotoFile) -> HttpRequest {
        self.photo_request(&format!("{TUTORS_PATH}/{id}/fotos"), photo)
    }

    pub fn build_link_pet(&self, tutor_id: i64, pet_id: i64) -> HttpRequest {
        HttpRequest::new(
            HttpMethod::Post,
            self.url(&format!("{TUTORS_PATH}/{tutor_id}/pets/{pet_id}")),
        )
    }

    pub fn build_unlink_pet(&self, tutor_id: i64, pet_id: i64) -> HttpRequest {
        HttpRequest::new(
            HttpMethod::Delete,
            self.url(&format!("{TUTORS_PATH}/{tutor_id}/pets/{pet_id}")),
        )
    }

    pub fn parse_list_tutors(&self, response: HttpResponse) -> Result<Page<Tutor>, ApiError> {
        parse_page(&response)
    }

    pub fn parse_tutor(&self, response: HttpResponse) -> Result<Tutor, ApiError> {
        decode(&response)
    }

    /// For uploads, link and unlink: any 2xx is success and the body is ignored.
    pub fn parse_empty(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_success(&response)
    }
}

#[derive(Serialize)]
struct RefreshBody<'a> {
    #[serde(rename = "refreshToken")]
    refresh_token: &'a str,
}

#[derive(Serialize)]
struct TutorPayload<'a> {
    #[serde(rename = "nome", skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    #[serde(rename = "telefone", skip_serializing_if = "Option::is_none")]
    phone: Option<&'a str>,
    #[serde(rename = "endereco", skip_serializing_if = "Option::is_none")]
    address: Option<&'a str>,
    #[serde(rename = "cpf", skip_serializing_if = "Option::is_none")]
    tax_id: Option<u64>,
}

#[derive(Deserialize)]
struct LoginWire {
    access_token: Option<String>,
    token: Option<String>,
    #[serde(rename = "accessToken")]
    access_token_camel: Option<String>,
    refresh_token: Option<String>,
    #[serde(rename = "refreshToken")]
    refresh_token_camel: Option<String>,
    expires_in: Option<u64>,
    usuario: Option<UserProfile>,
    user: Option<UserProfile>,
}

#[derive(Deserialize)]
struct RefreshWire {
    token: Option<String>,
    #[serde(rename = "accessToken")]
    access_token: Option<String>,
    #[serde(rename = "refreshToken")]
    refresh_token: Option<String>,
    #[serde(rename = "refresh_token")]
    refresh_token_snake: Option<String>,
}

/// The two list shapes backends are known to return. Both are folded into
/// `Page<T>` here and nowhere else.
#[derive(Deserialize)]
#[serde(untagged)]
enum ListBody<T> {
    Page(Page<T>),
    Items(Vec<T>),
}

fn parse_page<T: DeserializeOwned>(response: &HttpResponse) -> Result<Page<T>, ApiError> {
    Ok(match decode(response)? {
        ListBody::Page(page) => page,
        ListBody::Items(items) => Page::single(items),
    })
}

fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ApiError> {
    check_success(response)?;
    serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_success(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    Err(ApiError::from_response(response))
}
