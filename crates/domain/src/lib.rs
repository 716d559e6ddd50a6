//! # fluxhub-domain
//!
//! Pure domain model for the fluxhub device controller.
//!
//! ## Responsibilities
//! - Foundational types: device identifiers, error conventions, timestamps
//! - Define the **device state machine**: [`DeviceState`](device::DeviceState),
//!   the [`Command`](device::Command)s it accepts and the transition table
//!   that gates them by [`DeviceStatus`](device::DeviceStatus)
//! - Define the outbound [`StatusReport`](device::StatusReport)
//! - Name the two registry lifecycle policies ([`RegistryPolicy`](registry::RegistryPolicy))
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod device;
pub mod registry;
