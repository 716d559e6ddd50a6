//! Shared application state for axum handlers.

use std::sync::Arc;

use fluxhub_app::registry::DeviceRegistry;
use fluxhub_app::services::device_service::DeviceService;

/// Application state shared across all axum handlers.
///
/// Generic over the registry type to avoid dynamic dispatch. `Clone` is
/// implemented manually so the registry itself does not need to be `Clone`;
/// only the `Arc` wrapper is cloned.
pub struct AppState<R> {
    /// Device command service.
    pub device_service: Arc<DeviceService<R>>,
}

impl<R> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            device_service: Arc::clone(&self.device_service),
        }
    }
}

impl<R: DeviceRegistry + 'static> AppState<R> {
    /// Create a new application state from a service instance.
    pub fn new(device_service: DeviceService<R>) -> Self {
        Self {
            device_service: Arc::new(device_service),
        }
    }

    /// Create a new application state from a pre-wrapped `Arc` service.
    ///
    /// Use this when the service is shared with the console or the shutdown
    /// sequence before constructing the HTTP state.
    pub fn from_arcs(device_service: Arc<DeviceService<R>>) -> Self {
        Self { device_service }
    }
}
