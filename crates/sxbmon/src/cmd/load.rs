use std::fs;

use crate::cmd::{connect, LinkArgs, LoadArgs};
use crate::exit::{io_error, session_error, CliResult, SUCCESS};
use crate::output::{print_json, OutputFormat};

pub fn run(args: LoadArgs, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    let bytes = fs::read(&args.file)
        .map_err(|err| io_error(&format!("failed reading {}", args.file.display()), err))?;

    let mut session = connect(link)?;
    let summary = match args.at {
        Some(address) => session.load_at(address, &bytes),
        None => session.load(&bytes),
    }
    .map_err(|err| session_error("load failed", err))?;
    session.close();

    match format {
        OutputFormat::Json => print_json(&summary),
        _ => {
            print!(
                "loaded {} byte(s) in {} section(s)",
                summary.bytes, summary.sections
            );
            match summary.entry {
                Some(entry) => println!(", entry {entry}"),
                None => println!(),
            }
        }
    }
    Ok(SUCCESS)
}
