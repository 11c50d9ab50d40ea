use picolink::boot::{
    self, BootDecision, BootPin, BootSelector, FileFlag, PullUp, SysfsPin, TtyConsole,
};
use picolink::dispatch::{DispatchConfig, Dispatcher, Exit, HostDevice};
use picolink::transport::{self, select, Candidate, SerialConfig};
use tracing::info;

use crate::cmd::RunArgs;
use crate::exit::{transport_error, CliResult, SUCCESS};

pub fn run(args: RunArgs) -> CliResult<i32> {
    let flag = FileFlag::in_dir(&args.state_dir);
    let mut config = DispatchConfig::default();
    if let Some(version) = &args.version_string {
        config.version = version.clone();
    }

    let mut boots = 0u32;
    loop {
        boots += 1;
        let mut selector = BootSelector::new(flag.clone(), boot_pin(&args));
        let mut console = TtyConsole::new();
        let decision = boot::boot(&mut selector, &mut console);
        info!(%decision, boots, "boot complete");

        if decision == BootDecision::Maintenance {
            info!(
                state_dir = %args.state_dir.display(),
                "maintenance mode: console left attached"
            );
            return Ok(SUCCESS);
        }

        let transport =
            select(candidates(&args)).map_err(|err| transport_error("no channel", err))?;
        info!(kind = %transport.kind(), "transport selected");

        let mut dispatcher =
            Dispatcher::new(transport, HostDevice::new(), flag.clone(), config.clone());
        let exit = dispatcher.serve();
        info!(stats = ?dispatcher.stats(), ?exit, "serve loop ended");

        // The console and the transport drop here, like on a hardware reset.
        match exit {
            Exit::Reboot => continue,
            Exit::ChannelClosed => return Ok(SUCCESS),
        }
    }
}

fn boot_pin(args: &RunArgs) -> Box<dyn BootPin> {
    match &args.boot_pin {
        Some(path) => Box::new(SysfsPin::new(path)),
        None => Box::new(PullUp),
    }
}

/// Data channel first, then the console, then hardware serial.
fn candidates(args: &RunArgs) -> Vec<Box<dyn Candidate>> {
    let mut candidates = Vec::with_capacity(3);
    if let Some(path) = &args.socket {
        candidates.push(transport::select::data_socket(path));
    }
    if !args.no_console {
        candidates.push(transport::select::console());
    }
    candidates.push(transport::select::serial(SerialConfig::new(&args.serial)));
    candidates
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use picolink::transport::TransportKind;

    use super::*;

    fn args() -> RunArgs {
        RunArgs {
            state_dir: PathBuf::from("."),
            boot_pin: None,
            socket: None,
            serial: PathBuf::from("/dev/ttyAMA0"),
            no_console: false,
            version_string: None,
        }
    }

    fn kinds(args: &RunArgs) -> Vec<TransportKind> {
        candidates(args).iter().map(|c| c.kind()).collect()
    }

    #[test]
    fn candidates_follow_priority_order() {
        let mut args = args();
        args.socket = Some(PathBuf::from("/tmp/picolink.sock"));
        assert_eq!(
            kinds(&args),
            vec![TransportKind::Data, TransportKind::Console, TransportKind::Serial]
        );
    }

    #[test]
    fn no_console_skips_console_candidate() {
        let mut args = args();
        args.no_console = true;
        assert_eq!(kinds(&args), vec![TransportKind::Serial]);
    }

    #[test]
    fn unset_boot_pin_reads_high() {
        let mut pin = boot_pin(&args());
        assert_eq!(pin.level().expect("pull-up"), picolink::boot::Level::High);
    }
}
