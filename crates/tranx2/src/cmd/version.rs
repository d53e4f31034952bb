use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    println!("tranx2 {}", env!("CARGO_PKG_VERSION"));
    if !args.extended {
        return Ok(SUCCESS);
    }

    println!(
        "target: {}",
        option_env!("TRANX2_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("os: {} ({})", std::env::consts::OS, std::env::consts::ARCH);
    println!(
        "serial: {}",
        if cfg!(unix) { "termios" } else { "unsupported" }
    );
    println!(
        "protocol: passing {} bytes, noise {} bytes, max transponder id {:#08x}",
        tranx2_codec::PASSING_MSG_LEN,
        tranx2_codec::NOISE_MSG_LEN,
        tranx2_codec::MAX_TRANSPONDER_ID
    );

    Ok(SUCCESS)
}
