//! Client core for the PetConnect pet and tutor registry.
//!
//! # Overview
//! `PetConnectApi` builds `HttpRequest` values and parses `HttpResponse`
//! values without touching the network; a [`Transport`] performs the round
//! trip. On top of that sit the session layer (bearer tokens, single-flight
//! refresh, expiry events), the per-entity facades and an in-memory demo
//! backend.
//!
//! # Design
//! - `PetConnectApi` is stateless. It holds only `base_url`.
//! - Every operation is split into `build_*` and `parse_*`, so the I/O
//!   boundary stays explicit and the builders are testable without a server.
//! - Session state lives in a [`TokenStore`] over an injected
//!   [`KeyValueStore`], never in globals.
//! - Whether data comes from the backend or the demo store is decided once
//!   per [`SignedIn`] handle.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod app;
pub mod auth;
pub mod bio;
pub mod client;
pub mod config;
pub mod data_source;
pub mod error;
pub mod events;
pub mod facade;
pub mod http;
pub mod mock_store;
pub mod refresh;
pub mod session;
pub mod storage;
pub mod telemetry;
pub mod token_store;
pub mod transport;
pub mod types;

#[cfg(test)]
mod test_support;

pub use app::{PetConnect, Registration, SignedIn};
pub use auth::AuthService;
pub use bio::PetBioClient;
pub use client::PetConnectApi;
pub use config::ClientConfig;
pub use data_source::{DataMode, DataSource};
pub use error::ApiError;
pub use events::{ExpiryReason, SessionEvent};
pub use facade::{Pets, Tutors};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use session::SessionClient;
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use token_store::{Session, TokenStore};
pub use transport::{ReqwestTransport, Transport};
pub use types::{
    Credentials, NewPet, NewTutor, Page, PageRequest, Pet, PetUpdate, PhotoFile, Tutor,
    TutorUpdate, UserProfile, DEFAULT_PAGE_SIZE,
};
