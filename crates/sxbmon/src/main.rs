mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::{Command, LinkArgs};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "sxbmon", version, about = "WDC SXB board monitor CLI")]
struct Cli {
    #[command(flatten)]
    link: LinkArgs,

    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, &cli.link, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use sxbmon_session::{Address, Register};
    use sxbmon_transport::Parity;

    use super::*;

    #[test]
    fn parses_read_with_hex_address() {
        let cli = Cli::try_parse_from([
            "sxbmon", "--port", "/dev/ttyUSB0", "read", "$2000", "0x40",
        ])
        .expect("read args should parse");

        match cli.command {
            Command::Read(args) => {
                assert_eq!(args.address, Address::new(0x2000));
                assert_eq!(args.length, 0x40);
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(cli.link.port.as_deref(), Some("/dev/ttyUSB0"));
    }

    #[test]
    fn global_link_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "sxbmon", "info", "--port", "COM3", "--baud", "19200", "--parity", "even",
            "--retries", "5",
        ])
        .expect("info args should parse");
        assert!(matches!(cli.command, Command::Info(_)));
        assert_eq!(cli.link.baud, 19200);
        assert_eq!(cli.link.parity, Parity::Even);
        assert_eq!(cli.link.retries, 5);
    }

    #[test]
    fn parses_exec_register_overrides() {
        let cli = Cli::try_parse_from([
            "sxbmon", "exec", "0x0400", "--reg", "A=0x12", "--reg", "x=3",
        ])
        .expect("exec args should parse");
        let Command::Exec(args) = cli.command else {
            panic!("expected exec");
        };
        let overrides = args.overrides().expect("overrides should parse");
        assert_eq!(overrides.get(Register::A), Some(0x12));
        assert_eq!(overrides.get(Register::X), Some(3));
        assert_eq!(overrides.get(Register::Y), None);
    }

    #[test]
    fn rejects_unknown_register() {
        let cli = Cli::try_parse_from(["sxbmon", "exec", "0x0400", "--reg", "Q=1"])
            .expect("exec args should parse");
        let Command::Exec(args) = cli.command else {
            panic!("expected exec");
        };
        let err = args.overrides().expect_err("unknown register should fail");
        assert_eq!(err.code, exit::DATA_INVALID);
        assert!(err.message.contains("unknown register 'Q'"));
    }

    #[test]
    fn rejects_conflicting_write_sources() {
        let err = Cli::try_parse_from([
            "sxbmon", "write", "0x0200", "--data", "a9", "--file", "prog.bin",
        ])
        .expect_err("conflicting args should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn rejects_address_past_bank_zero() {
        let err = Cli::try_parse_from(["sxbmon", "read", "0x10000", "1"])
            .expect_err("address should be rejected");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }
}
