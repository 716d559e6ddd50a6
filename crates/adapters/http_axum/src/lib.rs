//! # fluxhub-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve a **JSON API** for driving devices
//!   (`/api/devices`, `/api/devices/{id}/start`, `/api/status`, …)
//! - Map HTTP requests into [`DeviceService`](fluxhub_app::services::device_service::DeviceService)
//!   calls (driving adapter)
//! - Map results and [`FluxHubError`](fluxhub_domain::error::FluxHubError)s into
//!   HTTP responses
//!
//! ## Dependency rule
//! Depends on `fluxhub-app` (for the registry trait and services) and
//! `fluxhub-domain` (for domain types used in request/response mapping).
//! Never leaks axum types into the domain.

pub mod api;
pub mod error;
pub mod router;
pub mod state;
