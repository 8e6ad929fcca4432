use westpipe_engine::ModuleFactory;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("westpipe {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: westpipe");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("WESTPIPE_BUILD_TARGET").unwrap_or("unknown")
    );
    println!(
        "profile: {}",
        option_env!("WESTPIPE_BUILD_PROFILE").unwrap_or("unknown")
    );
    println!(
        "protocol: data={} config={} log={}",
        westpipe_frame::DATA_HEADER,
        westpipe_frame::CONFIG_HEADER,
        westpipe_frame::LOG_HEADER
    );
    let factory = ModuleFactory::with_builtin();
    println!("modules: {}", factory.tags().join(", "));
    println!(
        "features: engine={}, cli=true",
        cfg!(feature = "engine")
    );

    Ok(SUCCESS)
}
