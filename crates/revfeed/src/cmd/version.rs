use revfeed::demux::{DEFAULT_QUEUE_CAPACITY, DEFAULT_REVISION_BUFFER};
use revfeed::frame::DEFAULT_MAX_PAYLOAD;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("revfeed {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: revfeed");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("REVFEED_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("queue_capacity: {DEFAULT_QUEUE_CAPACITY}");
    println!("revision_buffer: {DEFAULT_REVISION_BUFFER}");
    println!("max_frame_size: {DEFAULT_MAX_PAYLOAD}");

    Ok(SUCCESS)
}
