//! In-process state stores.
//!
//! [`NoopStateStore`] stands for an absent persistence hook: state lives only
//! inside the device actor. [`InMemoryStateStore`] keeps the last saved state
//! of every device in a process-local map, so on-demand devices that were
//! deactivated come back with their state.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use fluxhub_domain::device::DeviceState;
use fluxhub_domain::error::FluxHubError;
use fluxhub_domain::id::DeviceId;

use crate::ports::DeviceStateStore;

/// Persistence hook that persists nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStateStore;

impl DeviceStateStore for NoopStateStore {
    fn save(
        &self,
        _id: &DeviceId,
        _state: &DeviceState,
    ) -> impl Future<Output = Result<(), FluxHubError>> + Send {
        async { Ok(()) }
    }

    fn load(
        &self,
        _id: &DeviceId,
    ) -> impl Future<Output = Result<Option<DeviceState>, FluxHubError>> + Send {
        async { Ok(None) }
    }

    fn delete(&self, _id: &DeviceId) -> impl Future<Output = Result<(), FluxHubError>> + Send {
        async { Ok(()) }
    }
}

/// Process-local map of the last saved state per device.
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    states: Mutex<HashMap<DeviceId, DeviceState>>,
}

impl InMemoryStateStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Last saved state of device `id`.
    #[must_use]
    pub fn get(&self, id: &DeviceId) -> Option<DeviceState> {
        self.lock().get(id).copied()
    }

    /// Number of devices with a saved state.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no state is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<DeviceId, DeviceState>> {
        self.states.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DeviceStateStore for InMemoryStateStore {
    fn save(
        &self,
        id: &DeviceId,
        state: &DeviceState,
    ) -> impl Future<Output = Result<(), FluxHubError>> + Send {
        self.lock().insert(id.clone(), *state);
        async { Ok(()) }
    }

    fn load(
        &self,
        id: &DeviceId,
    ) -> impl Future<Output = Result<Option<DeviceState>, FluxHubError>> + Send {
        let result = self.get(id);
        async move { Ok(result) }
    }

    fn delete(&self, id: &DeviceId) -> impl Future<Output = Result<(), FluxHubError>> + Send {
        self.lock().remove(id);
        async { Ok(()) }
    }
}
