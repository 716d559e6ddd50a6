use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use fluxhub_domain::device::DeviceState;
use fluxhub_domain::error::{DuplicateIdError, FluxHubError, NotFoundError};
use fluxhub_domain::id::DeviceId;
use fluxhub_domain::registry::RegistryPolicy;

use super::{DeviceRegistry, RegistryOptions};
use crate::actor::{ActorSlot, DeviceHandle, stop_all};
use crate::ports::DeviceStateStore;

/// What the registry holds for an id.
///
/// `Creating` and `Removing` reserve the id while the initial save or the
/// drain and delete run outside the map lock. Only `Live` entries resolve.
#[derive(Debug)]
enum Entry {
    Creating,
    Live(ActorSlot),
    Removing,
}

/// Registry where devices exist between an explicit `create` and `remove`.
pub struct EagerRegistry<S> {
    devices: RwLock<HashMap<DeviceId, Entry>>,
    store: Arc<S>,
    options: RegistryOptions,
}

impl<S: DeviceStateStore + 'static> EagerRegistry<S> {
    #[must_use]
    pub fn new(store: Arc<S>, options: RegistryOptions) -> Self {
        Self {
            devices: RwLock::new(HashMap::new()),
            store,
            options,
        }
    }

    async fn release(&self, id: &DeviceId) {
        self.devices.write().await.remove(id);
    }
}

impl<S: DeviceStateStore + 'static> DeviceRegistry for EagerRegistry<S> {
    fn policy(&self) -> RegistryPolicy {
        RegistryPolicy::Eager
    }

    async fn lookup(&self, id: &DeviceId) -> Result<DeviceHandle, FluxHubError> {
        match self.devices.read().await.get(id) {
            Some(Entry::Live(slot)) => Ok(slot.handle().clone()),
            _ => Err(NotFoundError { id: id.clone() }.into()),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn create(&self, id: Option<DeviceId>) -> Result<DeviceId, FluxHubError> {
        let id = id.unwrap_or_else(DeviceId::generate);

        {
            let mut devices = self.devices.write().await;
            if devices.contains_key(&id) {
                return Err(DuplicateIdError { id }.into());
            }
            devices.insert(id.clone(), Entry::Creating);
        }

        let state = DeviceState::default();
        if let Err(err) = self.store.save(&id, &state).await {
            self.release(&id).await;
            return Err(err);
        }
        let slot = ActorSlot::spawn(
            id.clone(),
            state,
            Arc::clone(&self.store),
            self.options.actor_options(None),
        );

        self.devices.write().await.insert(id.clone(), Entry::Live(slot));

        tracing::info!(device_id = %id, "device created");
        Ok(id)
    }

    #[tracing::instrument(skip(self))]
    async fn remove(&self, id: &DeviceId) -> Result<(), FluxHubError> {
        let slot = {
            let mut devices = self.devices.write().await;
            match devices.remove(id) {
                Some(Entry::Live(slot)) => {
                    devices.insert(id.clone(), Entry::Removing);
                    slot
                }
                Some(pending) => {
                    devices.insert(id.clone(), pending);
                    return Err(NotFoundError { id: id.clone() }.into());
                }
                None => return Err(NotFoundError { id: id.clone() }.into()),
            }
        };

        let stopped = slot.stop(self.options.stop_timeout).await;
        let deleted = self.store.delete(id).await;
        self.release(id).await;
        deleted?;
        stopped?;

        tracing::info!(device_id = %id, "device removed");
        Ok(())
    }

    async fn list_ids(&self) -> Vec<DeviceId> {
        let mut ids: Vec<_> = self
            .devices
            .read()
            .await
            .iter()
            .filter(|(_, entry)| matches!(entry, Entry::Live(_)))
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    async fn shutdown(&self) {
        let mut slots = Vec::new();
        {
            let mut devices = self.devices.write().await;
            // Reservations stay so their create or remove finishes normally.
            for (id, entry) in std::mem::take(&mut *devices) {
                match entry {
                    Entry::Live(slot) => slots.push(slot),
                    pending => {
                        devices.insert(id, pending);
                    }
                }
            }
        }
        tracing::info!(count = slots.len(), "stopping devices");
        stop_all(slots, self.options.stop_timeout).await;
    }
}
