use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod flag;
pub mod run;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Boot, select a transport and serve requests.
    Run(RunArgs),
    /// Send request frames and print the responses.
    Send(SendArgs),
    /// Inspect or change the one-shot maintenance flag.
    Flag(FlagArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Run(args) => run::run(args),
        Command::Send(args) => send::run(args, format),
        Command::Flag(args) => flag::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Directory holding the maintenance flag.
    #[arg(long, env = "PICOLINK_STATE_DIR", default_value = ".")]
    pub state_dir: PathBuf,
    /// Boot pin value file (`0` selects maintenance). Unset reads as pulled up.
    #[arg(long, env = "PICOLINK_BOOT_PIN")]
    pub boot_pin: Option<PathBuf>,
    /// Data channel socket path, tried first.
    #[arg(long, env = "PICOLINK_SOCKET")]
    pub socket: Option<PathBuf>,
    /// Hardware serial device, tried last.
    #[arg(long, env = "PICOLINK_SERIAL", default_value = picolink::transport::DEFAULT_SERIAL_PATH)]
    pub serial: PathBuf,
    /// Skip the console channel.
    #[arg(long)]
    pub no_console: bool,
    /// Version reported by `ping` and `get_status`.
    #[arg(long, value_name = "VERSION")]
    pub version_string: Option<String>,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Data channel socket to connect to.
    #[arg(long, env = "PICOLINK_SOCKET", conflicts_with = "serial")]
    pub socket: Option<PathBuf>,
    /// Serial device to open.
    #[arg(long, conflicts_with = "socket")]
    pub serial: Option<PathBuf>,
    /// Serial baud rate.
    #[arg(long, default_value_t = picolink::transport::HARDWARE_BAUD)]
    pub baud: u32,
    /// JSON request payload.
    #[arg(long, default_value = r#"{"type":"ping"}"#)]
    pub json: String,
    /// Number of requests to send.
    #[arg(long, default_value_t = 1)]
    pub count: usize,
    /// Pause between requests (e.g. 300ms, 1s).
    #[arg(long, default_value = "300ms")]
    pub interval: String,
    /// Maximum time to wait for each response (e.g. 1s, 500ms).
    #[arg(long, default_value = "1s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct FlagArgs {
    #[arg(value_enum)]
    pub action: FlagAction,
    /// Directory holding the maintenance flag.
    #[arg(long, env = "PICOLINK_STATE_DIR", default_value = ".")]
    pub state_dir: PathBuf,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum FlagAction {
    /// Arm the flag so the next boot enters maintenance.
    Set,
    /// Remove the flag.
    Clear,
    /// Report whether the flag is armed.
    Status,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
