//! REST API client module for the SkillBridge platform.
//!
//! This module provides the `ApiClient` for communicating with the
//! SkillBridge API: authentication, the course catalog, creator
//! content, billing, the business site builder, and dashboards.
//!
//! The API uses bearer token authentication. The client attaches the
//! current access token to every request, and recovers transparently
//! from an expired token by refreshing once and retrying the request.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
