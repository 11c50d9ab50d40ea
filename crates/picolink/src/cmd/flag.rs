use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use picolink::boot::{FileFlag, FlagStore};
use serde::Serialize;

use crate::cmd::{FlagAction, FlagArgs};
use crate::exit::{boot_error, CliResult, SUCCESS};
use crate::output::OutputFormat;

#[derive(Serialize)]
struct FlagOutput {
    path: String,
    armed: bool,
}

pub fn run(args: FlagArgs, format: OutputFormat) -> CliResult<i32> {
    let flag = FileFlag::in_dir(&args.state_dir);
    match args.action {
        FlagAction::Set => flag.arm().map_err(|err| boot_error("arm failed", err))?,
        FlagAction::Clear => flag.clear().map_err(|err| boot_error("clear failed", err))?,
        FlagAction::Status => {}
    }

    let armed = flag
        .is_armed()
        .map_err(|err| boot_error("status failed", err))?;
    print_status(&flag, armed, format);
    Ok(SUCCESS)
}

fn print_status(flag: &FileFlag, armed: bool, format: OutputFormat) {
    let path = flag.path().display().to_string();
    match format {
        OutputFormat::Json => {
            let out = FlagOutput { path, armed };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FLAG", "ARMED"])
                .add_row(vec![path, armed.to_string()]);
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            let state = if armed { "armed" } else { "clear" };
            println!("{path}: {state}");
        }
    }
}
