//! Common error types used across the workspace.
//!
//! Each failure kind is its own typed error; [`FluxHubError`] gathers them
//! with `#[from]` conversions so layers can propagate with `?`.

use std::time::Duration;

use crate::device::{CommandKind, DeviceStatus};
use crate::id::DeviceId;
use crate::registry::RegistryPolicy;

/// Top-level error returned by the device core and its adapters.
#[derive(Debug, thiserror::Error)]
pub enum FluxHubError {
    /// The command is not legal in the device's current state.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    /// No device with the requested id.
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    /// A device with the requested id already exists.
    #[error(transparent)]
    DuplicateId(#[from] DuplicateIdError),

    /// The operation does not apply under the active registry policy.
    #[error(transparent)]
    Unsupported(#[from] UnsupportedError),

    /// Input or stored data violates a domain invariant.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A bounded wait elapsed.
    #[error(transparent)]
    Timeout(#[from] TimeoutError),

    /// The persistence hook failed.
    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// A command was rejected by the device state machine.
///
/// The device state is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot {command} device: {reason}")]
pub struct InvalidTransition {
    /// The rejected command.
    pub command: CommandKind,
    /// The device status at the time of rejection.
    pub status: DeviceStatus,
    /// Short human-readable reason (`"not stopped"`, `"not running"`, …).
    pub reason: &'static str,
}

/// A device lookup or removal target does not exist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("device {id} not found")]
pub struct NotFoundError {
    pub id: DeviceId,
}

/// A device could not be created because the id is taken.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("device {id} already exists")]
pub struct DuplicateIdError {
    pub id: DeviceId,
}

/// An operation that the active registry policy does not provide.
///
/// This is a reported no-op, distinct from both success and failure of the
/// operation itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{operation} is not applicable under the {policy} registry policy")]
pub struct UnsupportedError {
    pub operation: &'static str,
    pub policy: RegistryPolicy,
}

/// A graceful stop did not complete in time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("device {id} did not stop within {after:?}")]
pub struct TimeoutError {
    pub id: DeviceId,
    pub after: Duration,
}

/// Domain invariant violations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Device ids must not be empty.
    #[error("device id must not be empty")]
    EmptyId,
    /// A stopped device must not carry a start time.
    #[error("stopped device has a start time")]
    StartedWhileStopped,
    /// A running or paused device must carry a start time.
    #[error("{0} device has no start time")]
    MissingStartTime(DeviceStatus),
    /// Unknown textual device status.
    #[error("unknown device status {0:?}")]
    UnknownStatus(String),
    /// Unknown textual registry policy.
    #[error("unknown registry policy {0:?}")]
    UnknownPolicy(String),
}
