use std::thread;
use std::time::{Duration, Instant};

use picolink::dispatch::{Client, Request, RequestKind};
use picolink::transport::{Channel, SerialConfig, SerialPort, UdsStream};
use serde_json::Value;
use tracing::{debug, info};

use crate::cmd::SendArgs;
use crate::exit::{dispatch_error, transport_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_response, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let interval = parse_duration(&args.interval)?;
    let message = parse_message(&args.json)?;
    if args.count == 0 {
        return Err(CliError::new(USAGE, "--count must be at least 1"));
    }

    let channel = open_channel(&args)?;
    let mut client = Client::new(channel, timeout);
    let payload = serde_json::to_vec(&message)
        .map_err(|err| CliError::new(USAGE, format!("--json could not be encoded: {err}")))?;
    let expects_reply = expects_reply(&message);

    for seq in 1..=args.count {
        if seq > 1 {
            thread::sleep(interval);
        }
        let started = Instant::now();
        if !expects_reply {
            client
                .notify(&message)
                .map_err(|err| dispatch_error("send failed", err))?;
            info!(seq, "request sent; no response expected");
            continue;
        }

        let response = client
            .request_raw(&payload)
            .map_err(|err| dispatch_error("request failed", err))?;
        debug!(seq, len = response.len(), "response received");
        print_response(seq, &response, started.elapsed(), format);
    }

    Ok(SUCCESS)
}

fn open_channel(args: &SendArgs) -> CliResult<Box<dyn Channel>> {
    if let Some(path) = &args.socket {
        let stream = UdsStream::connect(path)
            .map_err(|err| transport_error("connect failed", err))?;
        return Ok(Box::new(stream));
    }
    if let Some(path) = &args.serial {
        let config = SerialConfig {
            path: path.clone(),
            baud: args.baud,
        };
        let port = SerialPort::open(&config).map_err(|err| transport_error("open failed", err))?;
        return Ok(Box::new(port));
    }
    Err(CliError::new(USAGE, "one of --socket or --serial is required"))
}

fn parse_message(json: &str) -> CliResult<Value> {
    serde_json::from_str::<Value>(json)
        .map_err(|err| CliError::new(USAGE, format!("--json is not valid JSON: {err}")))
}

/// `enter_maintenance` is answered by a reboot, never by a frame.
fn expects_reply(message: &Value) -> bool {
    let kind = match message {
        Value::Object(fields) => Request::from_fields(fields.clone()).kind,
        _ => return true,
    };
    kind != RequestKind::EnterMaintenance
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}
