//! Wire models for the SkillBridge API.
//!
//! This module contains the data structures exchanged with the REST
//! backend:
//!
//! - Auth payloads: `LoginRequest`, `RegisterRequest`, `AuthResponse`
//! - Catalog types: `Course`, `CourseSummary`, `CourseDraft`, `UploadTicket`
//! - Billing types: `Plan`, `Subscription`
//! - Site builder types: `SiteTemplate`, `GeneratedSite`
//! - `Dashboard`: the role-shaped summary card data

pub mod course;
pub mod dashboard;
pub mod plan;
pub mod template;
pub mod user;

pub use course::{Course, CourseDraft, CourseSummary, Lesson, UploadTicket};
pub use dashboard::Dashboard;
pub use plan::{Plan, Subscription};
pub use template::{GeneratedSite, SiteTemplate};
pub use user::{AuthResponse, LoginRequest, RefreshRequest, RefreshResponse, RegisterRequest, UserPage};
