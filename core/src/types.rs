//! Domain DTOs for the PetConnect API.
//!
//! # Design
//! Rust field names are English; the serde renames carry the backend's wire
//! names. The mock-server crate defines its own copies of these shapes, and
//! the integration tests catch any drift between the two.

use serde::{Deserialize, Deserializer, Serialize};

/// A pet as returned by the backend or the mock store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "especie")]
    pub species: String,
    #[serde(rename = "idade", default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(rename = "raca", default, skip_serializing_if = "Option::is_none")]
    pub breed: Option<String>,
    #[serde(rename = "fotoUrl", default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    /// Weak reference to the tutor this pet is linked to.
    #[serde(rename = "tutorId", default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<i64>,
}

/// Payload for creating a pet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPet {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "especie")]
    pub species: String,
    #[serde(rename = "idade", default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(rename = "raca", default, skip_serializing_if = "Option::is_none")]
    pub breed: Option<String>,
    #[serde(rename = "tutorId", default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<i64>,
}

/// Partial update for a pet. Only the fields that are set are sent and
/// merged; omitted fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PetUpdate {
    #[serde(rename = "nome", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "especie", default, skip_serializing_if = "Option::is_none")]
    pub species: Option<String>,
    #[serde(rename = "idade", default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(rename = "raca", default, skip_serializing_if = "Option::is_none")]
    pub breed: Option<String>,
}

/// A tutor (pet owner).
///
/// `pets` is a read-only view populated by the backend (or the mock store's
/// join); change it through link/unlink, never by editing this field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tutor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(
        rename = "cpf",
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub tax_id: Option<String>,
    #[serde(rename = "telefone")]
    pub phone: String,
    #[serde(rename = "endereco")]
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "fotoUrl", default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pets: Option<Vec<Pet>>,
}

/// Payload for creating a tutor. `tax_id` may be formatted
/// (`123.456.789-09`); the remote builder strips it to digits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTutor {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "cpf", default, skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<String>,
    #[serde(rename = "telefone")]
    pub phone: String,
    #[serde(rename = "endereco")]
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Partial update for a tutor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TutorUpdate {
    #[serde(rename = "nome", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "cpf", default, skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<String>,
    #[serde(rename = "telefone", default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(rename = "endereco", default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Tutor,
    Admin,
}

/// Cached copy of the signed-in user's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    #[serde(rename = "nome")]
    pub name: String,
    pub email: String,
    #[serde(rename = "tipo", default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

/// Username/password pair for `POST /autenticacao/login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Normalized login response. The backend spells the token fields several
/// ways; the parser folds them into this shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<u64>,
    pub user: Option<UserProfile>,
}

/// Normalized refresh response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedTokens {
    pub access_token: String,
    /// Present only when the backend rotates the refresh token.
    pub refresh_token: Option<String>,
}

/// An image to upload as a pet or tutor photo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Paging and filtering parameters for list operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Zero-based page index.
    pub page: u32,
    pub size: u32,
    /// Case-insensitive name filter.
    pub name: Option<String>,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
            name: None,
        }
    }
}

impl PageRequest {
    pub fn new(page: u32, size: u32) -> Self {
        Self {
            page,
            size,
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Page size, never below one.
    pub fn effective_size(&self) -> u32 {
        self.size.max(1)
    }

    /// The name filter, ignoring blank input.
    pub fn name_filter(&self) -> Option<&str> {
        self.name.as_deref().map(str::trim).filter(|n| !n.is_empty())
    }
}

/// One page of a listing.
///
/// Invariants: `total_pages == ceil(total_items / page_size)`,
/// `page_size >= 1` and `page_index < max(total_pages, 1)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(rename = "content")]
    pub items: Vec<T>,
    #[serde(rename = "totalElements")]
    pub total_items: u64,
    #[serde(rename = "totalPages")]
    pub total_pages: u32,
    #[serde(rename = "size")]
    pub page_size: u32,
    #[serde(rename = "number")]
    pub page_index: u32,
}

impl<T> Page<T> {
    /// Wrap a complete, unpaginated result as a single page.
    pub fn single(items: Vec<T>) -> Self {
        let len = items.len();
        Self {
            total_items: len as u64,
            total_pages: u32::from(len > 0),
            page_size: u32::try_from(len.max(1)).unwrap_or(u32::MAX),
            page_index: 0,
            items,
        }
    }

    /// Cut the requested page out of a full result set. A page index past the
    /// end is clamped to the last page.
    pub fn slice(all: Vec<T>, request: &PageRequest) -> Self {
        let size = request.effective_size();
        let total_items = all.len() as u64;
        let total_pages = u32::try_from(total_items.div_ceil(u64::from(size))).unwrap_or(u32::MAX);
        let page_index = request.page.min(total_pages.max(1) - 1);
        let start = page_index as usize * size as usize;
        let items = all.into_iter().skip(start).take(size as usize).collect();
        Self {
            items,
            total_items,
            total_pages,
            page_size: size,
            page_index,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total_items: self.total_items,
            total_pages: self.total_pages,
            page_size: self.page_size,
            page_index: self.page_index,
        }
    }
}

/// Strip a formatted tax id down to its digits and read them as a number.
/// Returns `None` when there are no digits.
pub fn tax_id_digits(tax_id: &str) -> Option<u64> {
    let digits: String = tax_id.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Accept `"12345678909"`, `12345678909` or null for the tutor's `cpf`.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pet_uses_wire_names() {
        let pet = Pet {
            id: Some(1),
            name: "Rex".to_string(),
            species: "CACHORRO".to_string(),
            age: Some(3),
            breed: Some("Golden Retriever".to_string()),
            photo_url: None,
            owner_id: Some(7),
        };
        let json = serde_json::to_value(&pet).unwrap();
        assert_eq!(json["nome"], "Rex");
        assert_eq!(json["especie"], "CACHORRO");
        assert_eq!(json["idade"], 3);
        assert_eq!(json["raca"], "Golden Retriever");
        assert_eq!(json["tutorId"], 7);
        assert!(json.get("fotoUrl").is_none());
    }

    #[test]
    fn pet_update_omits_unset_fields() {
        let update = PetUpdate {
            name: Some("Thor".to_string()),
            ..PetUpdate::default()
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json, serde_json::json!({"nome": "Thor"}));
    }

    #[test]
    fn tutor_accepts_numeric_tax_id() {
        let tutor: Tutor = serde_json::from_str(
            r#"{"id":4,"nome":"Ana","cpf":12345678909,"telefone":"(11) 91234-5678","endereco":"Rua A"}"#,
        )
        .unwrap();
        assert_eq!(tutor.tax_id.as_deref(), Some("12345678909"));
        assert!(tutor.pets.is_none());
    }

    #[test]
    fn tutor_accepts_string_or_missing_tax_id() {
        let tutor: Tutor = serde_json::from_str(
            r#"{"nome":"Ana","cpf":"123.456.789-09","telefone":"1","endereco":"Rua A"}"#,
        )
        .unwrap();
        assert_eq!(tutor.tax_id.as_deref(), Some("123.456.789-09"));

        let tutor: Tutor =
            serde_json::from_str(r#"{"nome":"Ana","cpf":null,"telefone":"1","endereco":"Rua A"}"#)
                .unwrap();
        assert!(tutor.tax_id.is_none());
    }

    #[test]
    fn user_profile_reads_role() {
        let user: UserProfile =
            serde_json::from_str(r#"{"id":1,"nome":"Admin","email":"a@b.c","tipo":"ADMIN"}"#)
                .unwrap();
        assert_eq!(user.role, Some(Role::Admin));
    }

    #[test]
    fn tax_id_digits_strips_formatting() {
        assert_eq!(tax_id_digits("123.456.789-09"), Some(12345678909));
        assert_eq!(tax_id_digits("   "), None);
        assert_eq!(tax_id_digits(""), None);
    }

    #[test]
    fn slice_two_items_with_page_size_ten() {
        let page = Page::slice(vec![1, 2], &PageRequest::new(0, 10));
        assert_eq!(page.items, vec![1, 2]);
        assert_eq!(page.total_items, 2);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.page_size, 10);
        assert_eq!(page.page_index, 0);
    }

    #[test]
    fn slice_second_page() {
        let page = Page::slice((1..=25).collect(), &PageRequest::new(1, 10));
        assert_eq!(page.items, (11..=20).collect::<Vec<_>>());
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.page_index, 1);
    }

    #[test]
    fn slice_clamps_page_index_and_size() {
        let page = Page::slice(vec![1, 2, 3], &PageRequest::new(9, 2));
        assert_eq!(page.page_index, 1);
        assert_eq!(page.items, vec![3]);

        let page = Page::slice(vec![1, 2, 3], &PageRequest::new(0, 0));
        assert_eq!(page.page_size, 1);
        assert_eq!(page.total_pages, 3);
    }

    #[test]
    fn slice_of_empty_result() {
        let page: Page<i32> = Page::slice(Vec::new(), &PageRequest::default());
        assert!(page.items.is_empty());
        assert_eq!(page.total_pages, 0);
        assert_eq!(page.page_index, 0);
    }

    #[test]
    fn single_page_wraps_everything() {
        let page = Page::single(vec!["a", "b", "c"]);
        assert_eq!(page.total_items, 3);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.page_size, 3);
        assert_eq!(page.page_index, 0);
    }

    #[test]
    fn blank_name_filter_is_ignored() {
        assert_eq!(PageRequest::default().with_name("  ").name_filter(), None);
        assert_eq!(
            PageRequest::default().with_name(" lu ").name_filter(),
            Some("lu")
        );
    }
}
