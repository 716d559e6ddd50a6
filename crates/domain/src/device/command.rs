//! Commands accepted by a device.

use serde::{Deserialize, Serialize};

/// A single operation submitted to a device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    Start,
    Stop,
    Pause,
    Resume,
    SetFluxCapacitance { farads: i32 },
    SetGravitationalIntegrity { units: f64 },
    ReportStatus,
}

impl Command {
    /// The payload-free discriminant of this command.
    #[must_use]
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::Start => CommandKind::Start,
            Self::Stop => CommandKind::Stop,
            Self::Pause => CommandKind::Pause,
            Self::Resume => CommandKind::Resume,
            Self::SetFluxCapacitance { .. } => CommandKind::SetFluxCapacitance,
            Self::SetGravitationalIntegrity { .. } => CommandKind::SetGravitationalIntegrity,
            Self::ReportStatus => CommandKind::ReportStatus,
        }
    }

    /// Whether a successful execution may change device state.
    #[must_use]
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Self::ReportStatus)
    }
}

/// Payload-free command discriminant, used in rejections and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    Start,
    Stop,
    Pause,
    Resume,
    SetFluxCapacitance,
    SetGravitationalIntegrity,
    ReportStatus,
}

impl CommandKind {
    /// Reason reported when this command is rejected.
    ///
    /// The reason depends only on the command: each command has exactly one
    /// precondition on the current status.
    #[must_use]
    pub fn rejection_reason(self) -> &'static str {
        match self {
            Self::Start => "not stopped",
            Self::Stop => "already stopped",
            Self::Pause | Self::SetFluxCapacitance | Self::SetGravitationalIntegrity => {
                "not running"
            }
            Self::Resume => "not paused",
            Self::ReportStatus => "never rejected",
        }
    }
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start => f.write_str("start"),
            Self::Stop => f.write_str("stop"),
            Self::Pause => f.write_str("pause"),
            Self::Resume => f.write_str("resume"),
            Self::SetFluxCapacitance => f.write_str("set flux capacitance of"),
            Self::SetGravitationalIntegrity => f.write_str("set gravitational integrity of"),
            Self::ReportStatus => f.write_str("report status of"),
        }
    }
}
