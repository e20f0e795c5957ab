use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Baud rate the SXB monitor boots with.
pub const DEFAULT_BAUD: u32 = 9600;

/// Default blocking timeout applied to the port itself.
pub const DEFAULT_LINK_TIMEOUT: Duration = Duration::from_secs(1);

/// Parity setting for the serial line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Parity::None => "none",
            Parity::Odd => "odd",
            Parity::Even => "even",
        };
        f.write_str(name)
    }
}

impl FromStr for Parity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "n" => Ok(Parity::None),
            "odd" | "o" => Ok(Parity::Odd),
            "even" | "e" => Ok(Parity::Even),
            other => Err(format!("unknown parity '{other}' (expected none, odd or even)")),
        }
    }
}

/// Settings used to open a serial link.
///
/// Data bits, stop bits and flow control are fixed at 8-N-1 without flow
/// control; the monitor does not support anything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    /// Device path or name (`/dev/ttyUSB0`, `COM3`).
    pub port: String,
    /// Line speed. Default: 9600.
    pub baud: u32,
    /// Parity. Default: none.
    pub parity: Parity,
    /// Blocking timeout for the port. Default: 1s.
    pub timeout: Duration,
}

impl LinkConfig {
    /// Settings for `port` with monitor defaults.
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud: DEFAULT_BAUD,
            parity: Parity::None,
            timeout: DEFAULT_LINK_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_uses_monitor_defaults() {
        let cfg = LinkConfig::new("/dev/ttyUSB0");
        assert_eq!(cfg.port, "/dev/ttyUSB0");
        assert_eq!(cfg.baud, 9600);
        assert_eq!(cfg.parity, Parity::None);
        assert_eq!(cfg.timeout, DEFAULT_LINK_TIMEOUT);
    }

    #[test]
    fn parity_parses_short_and_long_names() {
        assert_eq!("none".parse::<Parity>().unwrap(), Parity::None);
        assert_eq!("O".parse::<Parity>().unwrap(), Parity::Odd);
        assert_eq!("Even".parse::<Parity>().unwrap(), Parity::Even);
        assert!("mark".parse::<Parity>().is_err());
    }
}
