//! JSON API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod devices;

use axum::Router;
use axum::routing::{get, post, put};

use fluxhub_app::registry::DeviceRegistry;

use crate::state::AppState;

/// Build the `/api` sub-router.
pub fn routes<R>() -> Router<AppState<R>>
where
    R: DeviceRegistry + 'static,
{
    Router::new()
        .route(
            "/devices",
            get(devices::list::<R>).post(devices::create::<R>),
        )
        .route(
            "/devices/{id}",
            get(devices::status::<R>).delete(devices::remove::<R>),
        )
        .route("/devices/{id}/start", post(devices::start::<R>))
        .route("/devices/{id}/stop", post(devices::stop::<R>))
        .route("/devices/{id}/pause", post(devices::pause::<R>))
        .route("/devices/{id}/resume", post(devices::resume::<R>))
        .route(
            "/devices/{id}/flux-capacitance",
            put(devices::set_flux_capacitance::<R>),
        )
        .route(
            "/devices/{id}/gravitational-integrity",
            put(devices::set_gravitational_integrity::<R>),
        )
        .route("/status", get(devices::status_all::<R>))
}
