//! State store port: the persistence hook for device state.

use std::future::Future;

use fluxhub_domain::device::DeviceState;
use fluxhub_domain::error::FluxHubError;
use fluxhub_domain::id::DeviceId;

/// Persists device state on behalf of the device actors.
///
/// [`save`](Self::save) is awaited inside the device's exclusive section,
/// after a transition is computed and before it is committed and
/// acknowledged. A failing save leaves the device state unchanged.
pub trait DeviceStateStore: Send + Sync {
    /// Store the latest state of device `id`, replacing any previous one.
    fn save(
        &self,
        id: &DeviceId,
        state: &DeviceState,
    ) -> impl Future<Output = Result<(), FluxHubError>> + Send;

    /// Load the stored state of device `id`, if any.
    fn load(
        &self,
        id: &DeviceId,
    ) -> impl Future<Output = Result<Option<DeviceState>, FluxHubError>> + Send;

    /// Forget device `id`. Deleting an unknown id is not an error.
    fn delete(&self, id: &DeviceId) -> impl Future<Output = Result<(), FluxHubError>> + Send;
}

impl<T: DeviceStateStore> DeviceStateStore for std::sync::Arc<T> {
    fn save(
        &self,
        id: &DeviceId,
        state: &DeviceState,
    ) -> impl Future<Output = Result<(), FluxHubError>> + Send {
        (**self).save(id, state)
    }

    fn load(
        &self,
        id: &DeviceId,
    ) -> impl Future<Output = Result<Option<DeviceState>, FluxHubError>> + Send {
        (**self).load(id)
    }

    fn delete(&self, id: &DeviceId) -> impl Future<Output = Result<(), FluxHubError>> + Send {
        (**self).delete(id)
    }
}
