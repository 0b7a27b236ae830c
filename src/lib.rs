//! Client library for the SkillBridge learning platform.
//!
//! SkillBridge is a multi-tenant education service with role-based
//! surfaces for students, creators, business tenants, and admins. This
//! crate provides the pieces every surface shares:
//!
//! - `auth`: session and token lifecycle — dual credential stores,
//!   single-flight token refresh, forced-logout handling
//! - `api`: the authenticated REST client with transparent 401 recovery
//! - `models`: wire types for the catalog, billing, and site builder APIs
//! - `config`: client configuration with on-disk persistence
//!
//! The API uses short-lived bearer access tokens paired with a longer
//! lived refresh token. Callers never touch tokens directly; the client
//! attaches credentials, refreshes them when the server reports 401,
//! and retries the failed request exactly once.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod utils;

pub use api::{ApiClient, ApiError};
pub use auth::{
    AuthSession, KvStore, MemoryStore, RefreshCoordinator, RefreshError, RefreshTransport,
    RefreshedTokens, Role, SealedFileStore, SessionManager, StoreKind, StorePair, UserProfile,
};
pub use config::ClientConfig;
