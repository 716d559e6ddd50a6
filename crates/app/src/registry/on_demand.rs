use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use fluxhub_domain::device::{Command, StatusReport};
use fluxhub_domain::error::{FluxHubError, UnsupportedError};
use fluxhub_domain::id::DeviceId;
use fluxhub_domain::registry::RegistryPolicy;

use super::{DeviceRegistry, RegistryOptions};
use crate::actor::{ActorSlot, DeviceHandle, stop_all};
use crate::ports::DeviceStateStore;

/// Per-id activation cell. Empty until the first activation; afterwards it
/// holds the latest actor, which may have deactivated.
type Cell = Arc<Mutex<Option<ActorSlot>>>;

/// Registry where every id resolves to a device.
///
/// A device is activated on first reference, starting from its stored state
/// or from the initial state. With an idle timeout configured it deactivates
/// after going quiet and is activated again on the next reference. At most one
/// actor per id is live at any time: a new activation waits for the previous
/// worker to finish draining before loading the state.
///
/// The map lock is only held to find or insert a cell. Draining and loading
/// happen under the cell's own lock, so a slow activation only delays
/// commands for that id.
pub struct OnDemandRegistry<S> {
    cells: RwLock<HashMap<DeviceId, Cell>>,
    known: RwLock<BTreeSet<DeviceId>>,
    store: Arc<S>,
    options: RegistryOptions,
}

impl<S: DeviceStateStore + 'static> OnDemandRegistry<S> {
    #[must_use]
    pub fn new(store: Arc<S>, options: RegistryOptions) -> Self {
        Self {
            cells: RwLock::new(HashMap::new()),
            known: RwLock::new(BTreeSet::new()),
            store,
            options,
        }
    }

    async fn cell(&self, id: &DeviceId) -> Cell {
        if let Some(cell) = self.cells.read().await.get(id) {
            return Arc::clone(cell);
        }
        Arc::clone(self.cells.write().await.entry(id.clone()).or_default())
    }

    async fn activate(&self, id: &DeviceId) -> Result<DeviceHandle, FluxHubError> {
        let cell = self.cell(id).await;
        let mut slot = cell.lock().await;
        if let Some(handle) = slot.as_ref().and_then(ActorSlot::live_handle) {
            return Ok(handle);
        }
        if let Some(stale) = slot.take() {
            stale.join().await;
        }

        let state = self.store.load(id).await?.unwrap_or_default();
        let spawned = ActorSlot::spawn(
            id.clone(),
            state,
            Arc::clone(&self.store),
            self.options.actor_options(self.options.idle_timeout),
        );
        let handle = spawned.handle().clone();
        *slot = Some(spawned);
        drop(slot);

        self.known.write().await.insert(id.clone());
        tracing::debug!(device_id = %id, status = %state.status, "device activated");
        Ok(handle)
    }

    fn unsupported(operation: &'static str) -> FluxHubError {
        UnsupportedError {
            operation,
            policy: RegistryPolicy::OnDemand,
        }
        .into()
    }
}

impl<S: DeviceStateStore + 'static> DeviceRegistry for OnDemandRegistry<S> {
    fn policy(&self) -> RegistryPolicy {
        RegistryPolicy::OnDemand
    }

    async fn lookup(&self, id: &DeviceId) -> Result<DeviceHandle, FluxHubError> {
        self.activate(id).await
    }

    async fn create(&self, _id: Option<DeviceId>) -> Result<DeviceId, FluxHubError> {
        Err(Self::unsupported("create"))
    }

    async fn remove(&self, _id: &DeviceId) -> Result<(), FluxHubError> {
        Err(Self::unsupported("remove"))
    }

    async fn list_ids(&self) -> Vec<DeviceId> {
        self.known.read().await.iter().cloned().collect()
    }

    async fn dispatch(&self, id: &DeviceId, command: Command) -> Result<StatusReport, FluxHubError> {
        loop {
            let handle = self.activate(id).await?;
            match handle.enqueue(command).await {
                Ok(pending) => return pending.wait().await,
                // Deactivated between activation and delivery.
                Err(_) => tracing::debug!(device_id = %id, "device went idle, reactivating"),
            }
        }
    }

    async fn shutdown(&self) {
        let cells: Vec<_> = self.cells.write().await.drain().map(|(_, cell)| cell).collect();
        let mut slots = Vec::with_capacity(cells.len());
        // Waits for activations in flight so their actors are stopped too.
        for cell in cells {
            if let Some(slot) = cell.lock().await.take() {
                slots.push(slot);
            }
        }
        tracing::info!(count = slots.len(), "stopping devices");
        stop_all(slots, self.options.stop_timeout).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_store::{InMemoryStateStore, NoopStateStore};
    use fluxhub_domain::device::{DeviceState, DeviceStatus};
    use std::future::Future;
    use std::time::Duration;

    fn id(raw: &str) -> DeviceId {
        raw.parse().unwrap()
    }

    fn idle_options() -> RegistryOptions {
        RegistryOptions {
            idle_timeout: Some(Duration::from_millis(20)),
            ..RegistryOptions::default()
        }
    }

    async fn wait_until_idle(handle: &DeviceHandle) {
        while !handle.is_closed() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Never finishes loading the device called `slow`.
    struct SlowLoadStore;

    impl DeviceStateStore for SlowLoadStore {
        fn save(
            &self,
            _id: &DeviceId,
            _state: &DeviceState,
        ) -> impl Future<Output = Result<(), FluxHubError>> + Send {
            async { Ok(()) }
        }

        fn load(
            &self,
            id: &DeviceId,
        ) -> impl Future<Output = Result<Option<DeviceState>, FluxHubError>> + Send {
            let stall = id.as_str() == "slow";
            async move {
                if stall {
                    std::future::pending::<()>().await;
                }
                Ok(None)
            }
        }

        fn delete(&self, _id: &DeviceId) -> impl Future<Output = Result<(), FluxHubError>> + Send {
            async { Ok(()) }
        }
    }

    #[tokio::test]
    async fn should_activate_never_seen_device_in_initial_state() {
        let registry = OnDemandRegistry::new(Arc::new(NoopStateStore), RegistryOptions::default());

        let report = registry
            .dispatch(&id("fresh"), Command::ReportStatus)
            .await
            .unwrap();

        assert_eq!(report.id, id("fresh"));
        assert_eq!(report.status, DeviceStatus::Stopped);
        assert_eq!(report.uptime, Duration::ZERO);
        assert_eq!(report.flux_capacitance, 0);
        assert_eq!(registry.list_ids().await, vec![id("fresh")]);
    }

    #[tokio::test]
    async fn should_reject_create_and_remove() {
        let registry = OnDemandRegistry::new(Arc::new(NoopStateStore), RegistryOptions::default());

        assert!(matches!(
            registry.create(None).await,
            Err(FluxHubError::Unsupported(_))
        ));
        assert!(matches!(
            registry.remove(&id("a")).await,
            Err(FluxHubError::Unsupported(_))
        ));
    }

    #[tokio::test]
    async fn should_reuse_live_actor_for_same_id() {
        let registry = OnDemandRegistry::new(Arc::new(NoopStateStore), RegistryOptions::default());
        registry.dispatch(&id("a"), Command::Start).await.unwrap();

        let report = registry
            .dispatch(&id("a"), Command::SetFluxCapacitance { farads: 5 })
            .await
            .unwrap();

        assert_eq!(report.status, DeviceStatus::Running);
        assert_eq!(report.flux_capacitance, 5);
    }

    #[tokio::test]
    async fn should_restore_state_after_idle_deactivation() {
        let store = Arc::new(InMemoryStateStore::new());
        let registry = OnDemandRegistry::new(Arc::clone(&store), idle_options());
        registry.dispatch(&id("a"), Command::Start).await.unwrap();
        registry
            .dispatch(&id("a"), Command::SetFluxCapacitance { farads: 9 })
            .await
            .unwrap();
        let handle = registry.lookup(&id("a")).await.unwrap();

        wait_until_idle(&handle).await;

        let report = registry
            .dispatch(&id("a"), Command::ReportStatus)
            .await
            .unwrap();
        assert_eq!(report.status, DeviceStatus::Running);
        assert_eq!(report.flux_capacitance, 9);
        assert_eq!(registry.list_ids().await, vec![id("a")]);
    }

    #[tokio::test]
    async fn should_come_back_stopped_without_persistence() {
        let registry = OnDemandRegistry::new(Arc::new(NoopStateStore), idle_options());
        registry.dispatch(&id("a"), Command::Start).await.unwrap();
        let handle = registry.lookup(&id("a")).await.unwrap();

        wait_until_idle(&handle).await;

        let report = registry
            .dispatch(&id("a"), Command::ReportStatus)
            .await
            .unwrap();
        assert_eq!(report.status, DeviceStatus::Stopped);
        assert_eq!(registry.list_ids().await, vec![id("a")]);
    }

    #[tokio::test]
    async fn should_reactivate_after_shutdown() {
        let store = Arc::new(InMemoryStateStore::new());
        let registry = OnDemandRegistry::new(Arc::clone(&store), RegistryOptions::default());
        registry.dispatch(&id("a"), Command::Start).await.unwrap();
        registry.dispatch(&id("a"), Command::Pause).await.unwrap();

        registry.shutdown().await;

        let report = registry
            .dispatch(&id("a"), Command::ReportStatus)
            .await
            .unwrap();
        assert_eq!(report.status, DeviceStatus::Paused);
    }

    #[tokio::test]
    async fn should_list_ids_sorted() {
        let registry = OnDemandRegistry::new(Arc::new(NoopStateStore), RegistryOptions::default());
        for raw in ["c", "a", "b"] {
            registry.lookup(&id(raw)).await.unwrap();
        }

        assert_eq!(registry.list_ids().await, vec![id("a"), id("b"), id("c")]);
    }

    #[tokio::test]
    async fn should_answer_live_device_while_another_activation_stalls() {
        let registry = Arc::new(OnDemandRegistry::new(
            Arc::new(SlowLoadStore),
            RegistryOptions::default(),
        ));
        registry.dispatch(&id("b"), Command::Start).await.unwrap();
        let stalled = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.dispatch(&id("slow"), Command::Start).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let report = tokio::time::timeout(
            Duration::from_secs(1),
            registry.dispatch(&id("b"), Command::ReportStatus),
        )
        .await
        .expect("device b must not wait on another device")
        .unwrap();
        assert_eq!(report.status, DeviceStatus::Running);

        let fresh = tokio::time::timeout(
            Duration::from_secs(1),
            registry.dispatch(&id("c"), Command::ReportStatus),
        )
        .await
        .expect("activating c must not wait on another device")
        .unwrap();
        assert_eq!(fresh.status, DeviceStatus::Stopped);
        assert!(!stalled.is_finished());
        stalled.abort();
    }

    #[tokio::test]
    async fn should_activate_once_for_concurrent_first_references() {
        let store = Arc::new(InMemoryStateStore::new());
        let registry = Arc::new(OnDemandRegistry::new(
            Arc::clone(&store),
            RegistryOptions::default(),
        ));
        registry.dispatch(&id("a"), Command::Start).await.unwrap();
        registry.shutdown().await;

        let tasks: Vec<_> = (1..=8)
            .map(|farads| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move {
                    registry
                        .dispatch(&id("a"), Command::SetFluxCapacitance { farads })
                        .await
                })
            })
            .collect();
        for task in tasks {
            let report = task.await.unwrap().unwrap();
            assert_eq!(report.status, DeviceStatus::Running);
        }

        let report = registry
            .dispatch(&id("a"), Command::ReportStatus)
            .await
            .unwrap();
        assert_eq!(store.get(&id("a")).unwrap().flux_capacitance, report.flux_capacitance);
    }
}
