use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use sxbmon_session::{
    parse_number, Address, RegisterOverrides, RetryPolicy, Session, SessionConfig,
    DEFAULT_MAX_ATTEMPTS,
};
use sxbmon_transport::{LinkConfig, Parity, SerialPortLink, DEFAULT_BAUD};
use tracing::debug;

use crate::exit::{
    session_error, transport_error, validation_error, CliError, CliResult, USAGE,
};
use crate::output::OutputFormat;

pub mod exec;
pub mod info;
pub mod load;
pub mod read;
pub mod regs;
pub mod vectors;
pub mod version;
pub mod write;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the board information block.
    Info(InfoArgs),
    /// Read board memory.
    Read(ReadArgs),
    /// Write bytes to board memory.
    Write(WriteArgs),
    /// Load a WDC image (or a raw binary with --at).
    Load(LoadArgs),
    /// Start execution at an address.
    Exec(ExecArgs),
    /// Show or change the saved registers.
    Regs(RegsArgs),
    /// List the shadowed interrupt vectors.
    Vectors(VectorsArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Info(args) => info::run(args, link, format),
        Command::Read(args) => read::run(args, link, format),
        Command::Write(args) => write::run(args, link, format),
        Command::Load(args) => load::run(args, link, format),
        Command::Exec(args) => exec::run(args, link, format),
        Command::Regs(args) => regs::run(args, link, format),
        Command::Vectors(args) => vectors::run(args, link, format),
        Command::Version(args) => version::run(args),
    }
}

/// Serial line and retry settings shared by every board command.
#[derive(Args, Debug)]
pub struct LinkArgs {
    /// Serial device (e.g. /dev/ttyUSB0, COM3).
    #[arg(long, short = 'p', env = "SXBMON_PORT", global = true)]
    pub port: Option<String>,
    /// Line speed in baud.
    #[arg(long, default_value_t = DEFAULT_BAUD, global = true)]
    pub baud: u32,
    /// Parity: none, odd or even.
    #[arg(long, default_value = "none", global = true)]
    pub parity: Parity,
    /// Reply timeout per exchange (e.g. 1s, 500ms).
    #[arg(long, default_value = "1s", global = true)]
    pub timeout: String,
    /// Attempts per exchange before giving up.
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS, global = true)]
    pub retries: u32,
    /// Start programs in 65816 native mode.
    #[arg(long, global = true)]
    pub native: bool,
}

impl LinkArgs {
    fn link_config(&self, timeout: Duration) -> CliResult<LinkConfig> {
        let port = self.port.clone().ok_or_else(|| {
            CliError::new(USAGE, "no serial port given (use --port or SXBMON_PORT)")
        })?;
        Ok(LinkConfig {
            baud: self.baud,
            parity: self.parity,
            timeout,
            ..LinkConfig::new(port)
        })
    }

    fn session_config(&self, timeout: Duration) -> CliResult<SessionConfig> {
        if self.retries == 0 {
            return Err(CliError::new(USAGE, "--retries must be at least 1"));
        }
        Ok(SessionConfig {
            reply_timeout: timeout,
            retry: RetryPolicy {
                max_attempts: self.retries,
                ..RetryPolicy::default()
            },
            native: self.native,
            ..SessionConfig::default()
        })
    }
}

/// Open the serial port and start a board session.
pub fn connect(args: &LinkArgs) -> CliResult<Session<SerialPortLink>> {
    let timeout = parse_duration(&args.timeout)?;
    let link_config = args.link_config(timeout)?;
    let session_config = args.session_config(timeout)?;
    debug!(port = %link_config.port, baud = link_config.baud, "connecting");

    let link =
        SerialPortLink::open(&link_config).map_err(|err| transport_error("open failed", err))?;
    Session::open(link, session_config).map_err(|err| session_error("board did not answer", err))
}

/// Accepts `0x..`, `$..`, `..h` or decimal.
fn number(input: &str) -> Result<usize, String> {
    parse_number(input)
        .map(|n| n as usize)
        .map_err(|err| err.to_string())
}

#[derive(Args, Debug, Default)]
pub struct InfoArgs {}

#[derive(Args, Debug)]
pub struct ReadArgs {
    /// Start address.
    pub address: Address,
    /// Number of bytes.
    #[arg(value_parser = number)]
    pub length: usize,
    /// Write the bytes to a file instead of stdout.
    #[arg(long, short = 'o', value_name = "FILE")]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct WriteArgs {
    /// Start address.
    pub address: Address,
    /// Bytes as hex (e.g. "a9 2a 60" or a92a60).
    #[arg(long, conflicts_with = "file", required_unless_present = "file")]
    pub data: Option<String>,
    /// Read the bytes from a file.
    #[arg(long, value_name = "FILE")]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct LoadArgs {
    /// Image file (assembled/linked with -g).
    pub file: PathBuf,
    /// Treat the file as a raw binary placed at this address.
    #[arg(long, value_name = "ADDR")]
    pub at: Option<Address>,
}

#[derive(Args, Debug)]
pub struct ExecArgs {
    /// Entry address.
    pub address: Address,
    /// Register value to load first (repeatable), e.g. --reg A=0x12.
    #[arg(long = "reg", value_name = "NAME=VALUE")]
    pub registers: Vec<String>,
}

impl ExecArgs {
    pub fn overrides(&self) -> CliResult<RegisterOverrides> {
        RegisterOverrides::parse_assignments(&self.registers)
            .map_err(|err| validation_error("--reg", err))
    }
}

#[derive(Args, Debug)]
pub struct RegsArgs {
    /// Register value to store (repeatable), e.g. --set SP=0x01FF.
    #[arg(long = "set", value_name = "NAME=VALUE")]
    pub set: Vec<String>,
}

#[derive(Args, Debug, Default)]
pub struct VectorsArgs {}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(match unit {
        "ms" => Duration::from_millis(value),
        _ => Duration::from_secs(value),
    })
}
