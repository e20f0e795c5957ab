use serde::Serialize;
use sxbmon_session::Address;

use crate::cmd::info::mode;
use crate::cmd::{connect, ExecArgs, LinkArgs};
use crate::exit::{session_error, CliResult, SUCCESS};
use crate::output::{print_json, OutputFormat};

#[derive(Serialize)]
struct ExecOutput {
    address: Address,
    emulation: bool,
}

pub fn run(args: ExecArgs, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    let overrides = args.overrides()?;
    let mut session = connect(link)?;
    let emulation = overrides.emulation.unwrap_or_else(|| session.emulation());
    session
        .execute(args.address, &overrides)
        .map_err(|err| session_error("exec failed", err))?;
    session.close();

    let out = ExecOutput {
        address: args.address,
        emulation,
    };
    match format {
        OutputFormat::Json => print_json(&out),
        _ => println!("started at {} ({} mode)", out.address, mode(out.emulation)),
    }
    Ok(SUCCESS)
}
