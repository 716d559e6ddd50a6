//! Device registries resolving ids to live actors.
//!
//! Both lifecycle policies implement [`DeviceRegistry`]:
//!
//! - [`EagerRegistry`]: devices exist only between an explicit `create` and
//!   `remove`.
//! - [`OnDemandRegistry`]: any id resolves; devices are activated on first
//!   reference and may deactivate when idle.
//!
//! [`Registry`] picks one of them at runtime from a [`RegistryPolicy`].

mod eager;
mod on_demand;

pub use eager::EagerRegistry;
pub use on_demand::OnDemandRegistry;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use fluxhub_domain::device::{Command, StatusReport};
use fluxhub_domain::error::FluxHubError;
use fluxhub_domain::id::DeviceId;
use fluxhub_domain::registry::RegistryPolicy;

use crate::actor::{ActorOptions, DeviceHandle};
use crate::ports::DeviceStateStore;

/// Resolves device ids to actors and owns their lifecycle.
pub trait DeviceRegistry: Send + Sync {
    /// The lifecycle policy implemented by this registry.
    fn policy(&self) -> RegistryPolicy;

    /// Resolve `id` to a handle.
    fn lookup(
        &self,
        id: &DeviceId,
    ) -> impl Future<Output = Result<DeviceHandle, FluxHubError>> + Send;

    /// Create a device, generating an id when none is given.
    fn create(
        &self,
        id: Option<DeviceId>,
    ) -> impl Future<Output = Result<DeviceId, FluxHubError>> + Send;

    /// Remove a device after letting its queued commands drain.
    fn remove(&self, id: &DeviceId) -> impl Future<Output = Result<(), FluxHubError>> + Send;

    /// Ids known to this registry, sorted.
    fn list_ids(&self) -> impl Future<Output = Vec<DeviceId>> + Send;

    /// Resolve `id` and submit `command` to it.
    fn dispatch(
        &self,
        id: &DeviceId,
        command: Command,
    ) -> impl Future<Output = Result<StatusReport, FluxHubError>> + Send {
        async move { self.lookup(id).await?.send(command).await }
    }

    /// Stop every live device. The registry stays usable afterwards.
    fn shutdown(&self) -> impl Future<Output = ()> + Send;
}

/// Registry tuning.
#[derive(Debug, Clone, Copy)]
pub struct RegistryOptions {
    /// Capacity of each device mailbox; senders wait when it is full.
    pub mailbox_capacity: usize,
    /// Bound on a graceful stop (removal and shutdown).
    pub stop_timeout: Duration,
    /// Idle period after which on-demand devices deactivate. Ignored by the
    /// eager registry.
    pub idle_timeout: Option<Duration>,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            mailbox_capacity: 64,
            stop_timeout: Duration::from_secs(5),
            idle_timeout: None,
        }
    }
}

impl RegistryOptions {
    fn actor_options(self, idle_timeout: Option<Duration>) -> ActorOptions {
        ActorOptions {
            mailbox_capacity: self.mailbox_capacity,
            idle_timeout,
        }
    }
}

/// Registry whose policy is chosen at runtime.
pub enum Registry<S> {
    Eager(EagerRegistry<S>),
    OnDemand(OnDemandRegistry<S>),
}

impl<S: DeviceStateStore + 'static> Registry<S> {
    /// Build the registry implementing `policy`.
    #[must_use]
    pub fn new(policy: RegistryPolicy, store: Arc<S>, options: RegistryOptions) -> Self {
        match policy {
            RegistryPolicy::Eager => Self::Eager(EagerRegistry::new(store, options)),
            RegistryPolicy::OnDemand => Self::OnDemand(OnDemandRegistry::new(store, options)),
        }
    }
}

impl<S: DeviceStateStore + 'static> DeviceRegistry for Registry<S> {
    fn policy(&self) -> RegistryPolicy {
        match self {
            Self::Eager(registry) => registry.policy(),
            Self::OnDemand(registry) => registry.policy(),
        }
    }

    async fn lookup(&self, id: &DeviceId) -> Result<DeviceHandle, FluxHubError> {
        match self {
            Self::Eager(registry) => registry.lookup(id).await,
            Self::OnDemand(registry) => registry.lookup(id).await,
        }
    }

    async fn create(&self, id: Option<DeviceId>) -> Result<DeviceId, FluxHubError> {
        match self {
            Self::Eager(registry) => registry.create(id).await,
            Self::OnDemand(registry) => registry.create(id).await,
        }
    }

    async fn remove(&self, id: &DeviceId) -> Result<(), FluxHubError> {
        match self {
            Self::Eager(registry) => registry.remove(id).await,
            Self::OnDemand(registry) => registry.remove(id).await,
        }
    }

    async fn list_ids(&self) -> Vec<DeviceId> {
        match self {
            Self::Eager(registry) => registry.list_ids().await,
            Self::OnDemand(registry) => registry.list_ids().await,
        }
    }

    async fn dispatch(&self, id: &DeviceId, command: Command) -> Result<StatusReport, FluxHubError> {
        match self {
            Self::Eager(registry) => registry.dispatch(id, command).await,
            Self::OnDemand(registry) => registry.dispatch(id, command).await,
        }
    }

    async fn shutdown(&self) {
        match self {
            Self::Eager(registry) => registry.shutdown().await,
            Self::OnDemand(registry) => registry.shutdown().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_store::InMemoryStateStore;
    use fluxhub_domain::device::DeviceStatus;

    fn id(raw: &str) -> DeviceId {
        raw.parse().unwrap()
    }

    fn registry(policy: RegistryPolicy) -> Registry<InMemoryStateStore> {
        Registry::new(
            policy,
            Arc::new(InMemoryStateStore::new()),
            RegistryOptions::default(),
        )
    }

    #[tokio::test]
    async fn should_build_registry_for_each_policy() {
        assert_eq!(registry(RegistryPolicy::Eager).policy(), RegistryPolicy::Eager);
        assert_eq!(
            registry(RegistryPolicy::OnDemand).policy(),
            RegistryPolicy::OnDemand
        );
    }

    #[tokio::test]
    async fn should_require_creation_under_eager_policy() {
        let registry = registry(RegistryPolicy::Eager);
        let result = registry.dispatch(&id("a"), Command::Start).await;
        assert!(matches!(result, Err(FluxHubError::NotFound(_))));

        registry.create(Some(id("a"))).await.unwrap();
        let report = registry.dispatch(&id("a"), Command::Start).await.unwrap();
        assert_eq!(report.status, DeviceStatus::Running);
    }

    #[tokio::test]
    async fn should_activate_without_creation_under_on_demand_policy() {
        let registry = registry(RegistryPolicy::OnDemand);
        let report = registry.dispatch(&id("a"), Command::Start).await.unwrap();
        assert_eq!(report.status, DeviceStatus::Running);

        let result = registry.create(Some(id("b"))).await;
        assert!(matches!(result, Err(FluxHubError::Unsupported(_))));
    }
}
