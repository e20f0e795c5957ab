use std::fs;

use serde::Serialize;
use sxbmon_session::Address;

use crate::cmd::{connect, LinkArgs, ReadArgs};
use crate::exit::{io_error, session_error, CliResult, SUCCESS};
use crate::output::{hex_string, hexdump, print_json, print_raw, OutputFormat};

#[derive(Serialize)]
struct ReadOutput {
    address: Address,
    length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file: Option<String>,
}

pub fn run(args: ReadArgs, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    let mut session = connect(link)?;
    let block = session
        .read(args.address, args.length)
        .map_err(|err| session_error("read failed", err))?;
    session.close();

    if let Some(path) = &args.out {
        fs::write(path, block.as_bytes())
            .map_err(|err| io_error(&format!("failed writing {}", path.display()), err))?;
        let out = ReadOutput {
            address: block.start(),
            length: block.len(),
            data: None,
            file: Some(path.display().to_string()),
        };
        match format {
            OutputFormat::Json => print_json(&out),
            _ => println!("{} byte(s) from {} written to {}", out.length, out.address, path.display()),
        }
        return Ok(SUCCESS);
    }

    match format {
        OutputFormat::Json => print_json(&ReadOutput {
            address: block.start(),
            length: block.len(),
            data: Some(hex_string(block.as_bytes())),
            file: None,
        }),
        OutputFormat::Table | OutputFormat::Pretty => println!("{}", hexdump(&block)),
        OutputFormat::Raw => print_raw(block.as_bytes())
            .map_err(|err| io_error("failed writing to stdout", err))?,
    }
    Ok(SUCCESS)
}
