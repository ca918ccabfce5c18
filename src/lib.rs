//! adotadog: local-first dog adoption marketplace
//!
//! Users register, list dogs for adoption, search listings, book visits and
//! chat about a listing. All state lives in a key-value store on the local
//! machine (Sled on disk, or in memory), one JSON array per collection.
//!
//! Layers, leaves first:
//! - `storage`: the `KvStore` trait and its Sled / in-memory / detached backends
//! - `repository`: typed read-modify-write operations over the collections
//! - `auth`: login, registration and the current-session record
//! - `events` + `views`: change notifications and self-refreshing views for front ends
//! - `forms`: required-field checks done before calling into the repository

pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod forms;
pub mod models;
pub mod repository;
pub mod storage;
pub mod telemetry;
pub mod views;

pub use error::{AppError, StoreError, ValidationError};
pub use repository::Repository;
pub use storage::{DetachedStore, KvStore, MemoryStore, SledStore};
