//! Device service — use-cases for driving devices.

use fluxhub_domain::device::{Command, StatusReport};
use fluxhub_domain::error::FluxHubError;
use fluxhub_domain::id::DeviceId;

use crate::registry::DeviceRegistry;

/// Application service routing device commands through a registry.
pub struct DeviceService<R> {
    registry: R,
}

impl<R: DeviceRegistry> DeviceService<R> {
    /// Create a new service backed by the given registry.
    pub fn new(registry: R) -> Self {
        Self { registry }
    }

    /// The registry behind this service.
    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Start a stopped device.
    ///
    /// # Errors
    ///
    /// Returns [`FluxHubError::InvalidTransition`] unless the device is
    /// stopped, [`FluxHubError::NotFound`] for an unknown device under the
    /// eager policy, or a storage error from the persistence hook.
    #[tracing::instrument(skip(self))]
    pub async fn start(&self, id: &DeviceId) -> Result<StatusReport, FluxHubError> {
        self.registry.dispatch(id, Command::Start).await
    }

    /// Stop a running or paused device.
    ///
    /// # Errors
    ///
    /// Same as [`start`](Self::start); rejected when already stopped.
    #[tracing::instrument(skip(self))]
    pub async fn stop(&self, id: &DeviceId) -> Result<StatusReport, FluxHubError> {
        self.registry.dispatch(id, Command::Stop).await
    }

    /// Pause a running device.
    ///
    /// # Errors
    ///
    /// Same as [`start`](Self::start); rejected unless running.
    #[tracing::instrument(skip(self))]
    pub async fn pause(&self, id: &DeviceId) -> Result<StatusReport, FluxHubError> {
        self.registry.dispatch(id, Command::Pause).await
    }

    /// Resume a paused device.
    ///
    /// # Errors
    ///
    /// Same as [`start`](Self::start); rejected unless paused.
    #[tracing::instrument(skip(self))]
    pub async fn resume(&self, id: &DeviceId) -> Result<StatusReport, FluxHubError> {
        self.registry.dispatch(id, Command::Resume).await
    }

    /// Set the flux capacitance of a running device.
    ///
    /// # Errors
    ///
    /// Same as [`start`](Self::start); rejected unless running.
    #[tracing::instrument(skip(self))]
    pub async fn set_flux_capacitance(
        &self,
        id: &DeviceId,
        farads: i32,
    ) -> Result<StatusReport, FluxHubError> {
        self.registry
            .dispatch(id, Command::SetFluxCapacitance { farads })
            .await
    }

    /// Set the gravitational integrity of a running device.
    ///
    /// # Errors
    ///
    /// Same as [`start`](Self::start); rejected unless running.
    #[tracing::instrument(skip(self))]
    pub async fn set_gravitational_integrity(
        &self,
        id: &DeviceId,
        units: f64,
    ) -> Result<StatusReport, FluxHubError> {
        self.registry
            .dispatch(id, Command::SetGravitationalIntegrity { units })
            .await
    }

    /// Current status of a device.
    ///
    /// # Errors
    ///
    /// Returns [`FluxHubError::NotFound`] for an unknown device under the
    /// eager policy.
    pub async fn status(&self, id: &DeviceId) -> Result<StatusReport, FluxHubError> {
        self.registry.dispatch(id, Command::ReportStatus).await
    }

    /// Status of every listed device. Devices removed while the reports are
    /// being collected are skipped.
    ///
    /// # Errors
    ///
    /// Returns the first error other than [`FluxHubError::NotFound`].
    pub async fn status_all(&self) -> Result<Vec<StatusReport>, FluxHubError> {
        let mut reports = Vec::new();
        for id in self.registry.list_ids().await {
            match self.status(&id).await {
                Ok(report) => reports.push(report),
                Err(FluxHubError::NotFound(_)) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(reports)
    }

    /// Create a device, generating an id when none is given.
    ///
    /// # Errors
    ///
    /// Returns [`FluxHubError::DuplicateId`] when the id is taken,
    /// [`FluxHubError::Unsupported`] under the on-demand policy, or a storage
    /// error.
    #[tracing::instrument(skip(self))]
    pub async fn create_device(&self, id: Option<DeviceId>) -> Result<DeviceId, FluxHubError> {
        self.registry.create(id).await
    }

    /// Remove a device.
    ///
    /// # Errors
    ///
    /// Returns [`FluxHubError::NotFound`], [`FluxHubError::Unsupported`]
    /// under the on-demand policy, [`FluxHubError::Timeout`] when the device
    /// had to be aborted, or a storage error.
    #[tracing::instrument(skip(self))]
    pub async fn remove_device(&self, id: &DeviceId) -> Result<(), FluxHubError> {
        self.registry.remove(id).await
    }

    /// Ids of the devices known to the registry, sorted.
    pub async fn list_devices(&self) -> Vec<DeviceId> {
        self.registry.list_ids().await
    }

    /// Stop every live device.
    pub async fn shutdown(&self) {
        self.registry.shutdown().await;
    }
}
