//! HTTP client for the merx platform API.
//!
//! Exposes the [`PlatformApi`] trait consumed by the sync engine and a
//! reqwest-backed [`PlatformClient`] implementation. Transport and HTTP
//! errors are classified into [`ApiFault`] at this boundary so callers
//! can branch on retryability instead of status codes.

pub mod api;
pub mod client;
pub mod error;

pub use api::{CustomObjectPage, PlatformApi};
pub use client::{PlatformClient, PlatformClientConfig};
pub use error::{ApiFault, ApiResult};
