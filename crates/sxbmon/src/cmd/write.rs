use std::fs;

use serde::Serialize;
use sxbmon_session::Address;

use crate::cmd::{connect, LinkArgs, WriteArgs};
use crate::exit::{io_error, session_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_json, OutputFormat};

#[derive(Serialize)]
struct WriteOutput {
    address: Address,
    length: usize,
}

pub fn run(args: WriteArgs, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    let data = resolve_data(&args)?;
    let mut session = connect(link)?;
    session
        .write(args.address, &data)
        .map_err(|err| session_error("write failed", err))?;
    session.close();

    let out = WriteOutput {
        address: args.address,
        length: data.len(),
    };
    match format {
        OutputFormat::Json => print_json(&out),
        _ => println!("wrote {} byte(s) at {}", out.length, out.address),
    }
    Ok(SUCCESS)
}

fn resolve_data(args: &WriteArgs) -> CliResult<Vec<u8>> {
    if let Some(hex) = &args.data {
        return parse_hex(hex);
    }
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    Ok(Vec::new())
}

/// Parse hex bytes, ignoring whitespace, commas and an optional `0x` per byte.
fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let mut digits = String::with_capacity(input.len());
    for token in input.split(|c: char| c.is_whitespace() || c == ',') {
        let token = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
            .unwrap_or(token);
        digits.push_str(token);
    }
    if !digits.is_ascii() {
        return Err(CliError::new(DATA_INVALID, format!("--data is not hex: {input}")));
    }
    if digits.len() % 2 != 0 {
        return Err(CliError::new(
            DATA_INVALID,
            format!("--data has an odd number of hex digits: {input}"),
        ));
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| CliError::new(DATA_INVALID, format!("--data is not hex: {input}")))
        })
        .collect()
}
