//! # fluxhub-app
//!
//! Application layer — device actors, registries, use-cases and **port
//! definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `DeviceStateStore`: the persistence hook called after every transition
//! - Run each live device as an **actor**: one tokio task owning the device
//!   state, fed by a FIFO mailbox, so commands for one device never overlap
//! - Provide the **device registries** that resolve ids to actors under the
//!   eager or on-demand lifecycle policy, behind one `DeviceRegistry` trait
//! - Define the **driving/inbound port** `DeviceService`, the command surface
//!   used by the HTTP adapter and the console
//! - Provide **in-process infrastructure** (memory-only state stores) that
//!   doesn't need IO
//!
//! ## Dependency rule
//! Depends on `fluxhub-domain` only (plus `tokio` for tasks and channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod actor;
pub mod ports;
pub mod registry;
pub mod services;
pub mod state_store;
