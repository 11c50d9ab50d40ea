use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("picolink {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: picolink");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("PICOLINK_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("max_frame_bytes: {}", picolink::frame::MAX_FRAME_BYTES);
    println!("hardware_baud: {}", picolink::transport::HARDWARE_BAUD);
    println!("maintenance_flag: {}", picolink::boot::MAINTENANCE_FLAG);

    Ok(SUCCESS)
}
