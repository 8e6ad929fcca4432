use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod host;
pub mod replay;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Host the pipe: accept a peer, build its modules and print their snapshots.
    Host(HostArgs),
    /// Act as a peer: connect and send frames.
    Send(SendArgs),
    /// Act as a peer: send every line of a script file as one frame.
    Replay(ReplayArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Host(args) => host::run(args, format),
        Command::Send(args) => send::run(args),
        Command::Replay(args) => replay::run(args),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct HostArgs {
    /// Socket path to bind. Default: `west-pros-pipe.sock` in the temp dir.
    #[arg(env = "WESTPIPE_PIPE")]
    pub path: Option<PathBuf>,
    /// Separate socket for heartbeat lines.
    #[arg(long, value_name = "PATH", env = "WESTPIPE_OUTBOUND_PIPE")]
    pub outbound: Option<PathBuf>,
    /// Heartbeat interval (e.g. 1s, 250ms).
    #[arg(long, default_value = "1s", env = "WESTPIPE_HEARTBEAT")]
    pub heartbeat: String,
    /// Log frames that are neither messages nor log records as STDOUT records.
    #[arg(long)]
    pub forward_stray: bool,
    /// Accept configuration documents without the terminator tag.
    #[arg(long)]
    pub legacy_config: bool,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Socket path to connect to.
    #[arg(env = "WESTPIPE_PIPE")]
    pub path: PathBuf,
    /// Raw frame text, sent as is.
    #[arg(long, conflicts_with_all = ["data", "config", "log"])]
    pub text: Option<String>,
    /// Data tick document (JSON).
    #[arg(long, conflicts_with_all = ["text", "config", "log"])]
    pub data: Option<String>,
    /// Configuration document file, sent as terminated fragments.
    #[arg(long, value_name = "FILE", conflicts_with_all = ["text", "data", "log"])]
    pub config: Option<PathBuf>,
    /// Log record as LEVEL:TEXT.
    #[arg(long, value_name = "LEVEL:TEXT", conflicts_with_all = ["text", "data", "config"])]
    pub log: Option<String>,
    /// Largest configuration fragment in UTF-16 code units.
    #[arg(long, default_value_t = westpipe_frame::DEFAULT_FRAGMENT_UNITS)]
    pub fragment_units: usize,
    /// Write timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Socket path to connect to.
    #[arg(env = "WESTPIPE_PIPE")]
    pub path: PathBuf,
    /// Script with one frame text per line. Empty lines and `#` comments are skipped.
    pub file: PathBuf,
    /// Delay between frames (e.g. 20ms, 1s).
    #[arg(long, default_value = "20ms")]
    pub interval: String,
    /// Separate heartbeat socket to connect to and drain.
    #[arg(long, value_name = "PATH")]
    pub outbound: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `150ms`, `2s` or a bare number of seconds.
pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
