//! Interactive console reading line commands from stdin.
//!
//! Stdin is read on a dedicated OS thread that forwards lines over a channel,
//! so a pending read never holds up runtime shutdown.

use std::io::Write;
use std::str::FromStr;
use std::time::Duration;

use tokio::sync::mpsc;

use fluxhub_app::registry::DeviceRegistry;
use fluxhub_app::services::device_service::DeviceService;
use fluxhub_domain::device::StatusReport;
use fluxhub_domain::error::{FluxHubError, ValidationError};
use fluxhub_domain::id::DeviceId;

const HELP: &str = "\
commands:
  help                                        show this message
  exit                                        shut the daemon down
  list-devices                                list device ids
  new-device [id]                             create a device
  kill-device <id>                            remove a device
  start-device <id>                           start a device
  stop-device <id>                            stop a device
  pause-device <id>                           pause a device
  resume-device <id>                          resume a device
  device-status [id]                          status of one or every device
  set-flux-capacitance <id> <farads>          set the flux capacitance
  set-gravitational-integrity <id> <units>    set the gravitational integrity";

/// A parsed console command.
#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    Help,
    Exit,
    ListDevices,
    NewDevice(Option<DeviceId>),
    KillDevice(DeviceId),
    StartDevice(DeviceId),
    StopDevice(DeviceId),
    PauseDevice(DeviceId),
    ResumeDevice(DeviceId),
    DeviceStatus(Option<DeviceId>),
    SetFluxCapacitance(DeviceId, i32),
    SetGravitationalIntegrity(DeviceId, f64),
}

/// Console input that could not be turned into a [`ShellCommand`].
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("unknown command {0:?}, type `help` for the list")]
    UnknownCommand(String),
    #[error("{command}: missing <{argument}>")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },
    #[error("{command}: too many arguments")]
    TooManyArguments { command: &'static str },
    #[error("{argument}: {value:?} is not a valid number")]
    InvalidNumber {
        argument: &'static str,
        value: String,
    },
    #[error(transparent)]
    InvalidId(#[from] ValidationError),
}

struct Args<'a> {
    command: &'static str,
    rest: std::str::SplitWhitespace<'a>,
}

impl Args<'_> {
    fn optional_id(&mut self) -> Result<Option<DeviceId>, ParseError> {
        Ok(self.rest.next().map(DeviceId::from_str).transpose()?)
    }

    fn id(&mut self) -> Result<DeviceId, ParseError> {
        self.optional_id()?.ok_or(ParseError::MissingArgument {
            command: self.command,
            argument: "id",
        })
    }

    fn number<T: FromStr>(&mut self, argument: &'static str) -> Result<T, ParseError> {
        let value = self.rest.next().ok_or(ParseError::MissingArgument {
            command: self.command,
            argument,
        })?;
        value.parse().map_err(|_| ParseError::InvalidNumber {
            argument,
            value: value.to_string(),
        })
    }

    fn finish(mut self, command: ShellCommand) -> Result<ShellCommand, ParseError> {
        match self.rest.next() {
            Some(_) => Err(ParseError::TooManyArguments {
                command: self.command,
            }),
            None => Ok(command),
        }
    }
}

/// Parse one input line. Blank lines yield `None`.
///
/// # Errors
///
/// Returns [`ParseError`] for unknown commands and missing or malformed
/// arguments.
pub fn parse(line: &str) -> Result<Option<ShellCommand>, ParseError> {
    let mut words = line.split_whitespace();
    let Some(word) = words.next() else {
        return Ok(None);
    };
    let word = word.to_ascii_lowercase();
    let command: &'static str = match word.as_str() {
        "help" => "help",
        "exit" => "exit",
        "list-devices" => "list-devices",
        "new-device" => "new-device",
        "kill-device" => "kill-device",
        "start-device" => "start-device",
        "stop-device" => "stop-device",
        "pause-device" => "pause-device",
        "resume-device" => "resume-device",
        "device-status" => "device-status",
        "set-flux-capacitance" => "set-flux-capacitance",
        "set-gravitational-integrity" => "set-gravitational-integrity",
        other => return Err(ParseError::UnknownCommand(other.to_string())),
    };
    let mut args = Args {
        command,
        rest: words,
    };

    let parsed = match command {
        "help" => ShellCommand::Help,
        "exit" => ShellCommand::Exit,
        "list-devices" => ShellCommand::ListDevices,
        "new-device" => ShellCommand::NewDevice(args.optional_id()?),
        "kill-device" => ShellCommand::KillDevice(args.id()?),
        "start-device" => ShellCommand::StartDevice(args.id()?),
        "stop-device" => ShellCommand::StopDevice(args.id()?),
        "pause-device" => ShellCommand::PauseDevice(args.id()?),
        "resume-device" => ShellCommand::ResumeDevice(args.id()?),
        "device-status" => ShellCommand::DeviceStatus(args.optional_id()?),
        "set-flux-capacitance" => {
            let id = args.id()?;
            ShellCommand::SetFluxCapacitance(id, args.number("farads")?)
        }
        _ => {
            let id = args.id()?;
            ShellCommand::SetGravitationalIntegrity(id, args.number("units")?)
        }
    };
    args.finish(parsed).map(Some)
}

/// What the console should do after a command ran.
#[derive(Debug, PartialEq)]
pub enum Outcome {
    Print(String),
    Exit,
}

/// Run `command` against the device service.
///
/// # Errors
///
/// Returns the service error for the failed operation.
pub async fn execute<R: DeviceRegistry>(
    service: &DeviceService<R>,
    command: ShellCommand,
) -> Result<Outcome, FluxHubError> {
    let output = match command {
        ShellCommand::Help => HELP.to_string(),
        ShellCommand::Exit => return Ok(Outcome::Exit),
        ShellCommand::ListDevices => {
            let ids = service.list_devices().await;
            if ids.is_empty() {
                "no devices".to_string()
            } else {
                ids.iter().map(DeviceId::to_string).collect::<Vec<_>>().join("\n")
            }
        }
        ShellCommand::NewDevice(id) => {
            let id = service.create_device(id).await?;
            format!("created device {id}")
        }
        ShellCommand::KillDevice(id) => {
            service.remove_device(&id).await?;
            format!("removed device {id}")
        }
        ShellCommand::StartDevice(id) => render(&service.start(&id).await?),
        ShellCommand::StopDevice(id) => render(&service.stop(&id).await?),
        ShellCommand::PauseDevice(id) => render(&service.pause(&id).await?),
        ShellCommand::ResumeDevice(id) => render(&service.resume(&id).await?),
        ShellCommand::DeviceStatus(Some(id)) => render(&service.status(&id).await?),
        ShellCommand::DeviceStatus(None) => {
            let reports = service.status_all().await?;
            if reports.is_empty() {
                "no devices".to_string()
            } else {
                reports.iter().map(render).collect::<Vec<_>>().join("\n")
            }
        }
        ShellCommand::SetFluxCapacitance(id, farads) => {
            render(&service.set_flux_capacitance(&id, farads).await?)
        }
        ShellCommand::SetGravitationalIntegrity(id, units) => {
            render(&service.set_gravitational_integrity(&id, units).await?)
        }
    };
    Ok(Outcome::Print(output))
}

/// One-line rendering of a status report.
#[must_use]
pub fn render(report: &StatusReport) -> String {
    format!(
        "Device id = {}, state = {}, uptime = {}, flux capacitance = {}, grav. integrity = {}",
        report.id,
        report.status,
        format_uptime(report.uptime),
        report.flux_capacitance,
        report.gravitational_integrity,
    )
}

fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60)
}

/// Forward stdin lines to a channel from a dedicated thread.
///
/// The channel closes at end of input.
pub fn stdin_lines() -> mpsc::Receiver<String> {
    let (sender, receiver) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else { break };
            if sender.blocking_send(line).is_err() {
                break;
            }
        }
    });
    receiver
}

/// Process console lines until `exit` or end of input.
///
/// # Errors
///
/// Returns an error when writing to `out` fails.
pub async fn run<R, W>(
    service: &DeviceService<R>,
    mut lines: mpsc::Receiver<String>,
    mut out: W,
) -> std::io::Result<()>
where
    R: DeviceRegistry,
    W: Write,
{
    while let Some(line) = lines.recv().await {
        let command = match parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                writeln!(out, "error: {err}")?;
                continue;
            }
        };
        match execute(service, command).await {
            Ok(Outcome::Print(text)) => writeln!(out, "{text}")?,
            Ok(Outcome::Exit) => break,
            Err(err) => writeln!(out, "error: {err}")?,
        }
        out.flush()?;
    }
    tracing::info!("console closed");
    Ok(())
}
