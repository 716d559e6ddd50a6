//! Device: one unit of state and concurrency control.
//!
//! [`DeviceState`] is a plain value; [`DeviceState::transition`] is the single
//! dispatch function over `(status, command)` that either yields the next
//! state or rejects the command. Serializing commands against one device is
//! the job of the actor in the `app` crate.
//!
//! | Status  | Start | Stop | Pause | Resume | Set* | ReportStatus |
//! |---------|-------|------|-------|--------|------|--------------|
//! | Stopped | → Running | ✗ | ✗ | ✗ | ✗ | ✓ |
//! | Running | ✗ | → Stopped | → Paused | ✗ | ✓ | ✓ |
//! | Paused  | ✗ | → Stopped | ✗ | → Running | ✗ | ✓ |

mod command;
mod report;
mod status;

pub use command::{Command, CommandKind};
pub use report::StatusReport;
pub use status::DeviceStatus;

use serde::{Deserialize, Serialize};

use crate::error::{InvalidTransition, ValidationError};
use crate::id::DeviceId;
use crate::time::{Timestamp, elapsed};

/// Mutable state of one device.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DeviceState {
    pub status: DeviceStatus,
    pub started_at: Option<Timestamp>,
    pub flux_capacitance: i32,
    pub gravitational_integrity: f64,
}

impl DeviceState {
    /// Apply `command` at time `now`.
    ///
    /// Returns the next state, which equals `self` for
    /// [`Command::ReportStatus`].
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransition`] when the command is not legal in the
    /// current status. `self` is never modified.
    pub fn transition(&self, command: Command, now: Timestamp) -> Result<Self, InvalidTransition> {
        use DeviceStatus::{Paused, Running, Stopped};

        let next = match (self.status, command) {
            (_, Command::ReportStatus) => *self,
            (Stopped, Command::Start) => Self {
                status: Running,
                started_at: Some(now),
                flux_capacitance: 1,
                gravitational_integrity: 1.0,
            },
            (Running | Paused, Command::Stop) => Self {
                status: Stopped,
                started_at: None,
                ..*self
            },
            (Running, Command::Pause) => Self {
                status: Paused,
                ..*self
            },
            (Paused, Command::Resume) => Self {
                status: Running,
                ..*self
            },
            (Running, Command::SetFluxCapacitance { farads }) => Self {
                flux_capacitance: farads,
                ..*self
            },
            (Running, Command::SetGravitationalIntegrity { units }) => Self {
                gravitational_integrity: units,
                ..*self
            },
            (status, command) => {
                let command = command.kind();
                return Err(InvalidTransition {
                    command,
                    status,
                    reason: command.rejection_reason(),
                });
            }
        };
        Ok(next)
    }

    /// Time since the device was started, or zero when stopped.
    #[must_use]
    pub fn uptime(&self, now: Timestamp) -> std::time::Duration {
        self.started_at
            .map(|since| elapsed(since, now))
            .unwrap_or_default()
    }

    /// Snapshot this state as a [`StatusReport`] for device `id`.
    #[must_use]
    pub fn report(&self, id: &DeviceId, now: Timestamp) -> StatusReport {
        StatusReport {
            id: id.clone(),
            status: self.status,
            uptime: self.uptime(now),
            flux_capacitance: self.flux_capacitance,
            gravitational_integrity: self.gravitational_integrity,
        }
    }

    /// Check the start-time invariants.
    ///
    /// Only states produced outside [`transition`](Self::transition) (for
    /// example rows loaded from storage) can violate them.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::StartedWhileStopped`] or
    /// [`ValidationError::MissingStartTime`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        match (self.status.is_active(), self.started_at.is_some()) {
            (false, true) => Err(ValidationError::StartedWhileStopped),
            (true, false) => Err(ValidationError::MissingStartTime(self.status)),
            _ => Ok(()),
        }
    }
}
