use std::io::{self, IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use sxbmon_session::MemoryBlock;

const HEXDUMP_WIDTH: usize = 16;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_raw(data: &[u8]) -> io::Result<()> {
    write_raw(&mut io::stdout().lock(), data)
}

fn write_raw(out: &mut impl Write, data: &[u8]) -> io::Result<()> {
    out.write_all(data)?;
    out.flush()
}

pub fn print_table(header: &[&str], rows: Vec<Vec<String>>) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.to_vec());
    for row in rows {
        table.add_row(row);
    }
    println!("{table}");
}

/// Format a block as the monitor-style dump.
///
/// ```text
/// 0x2000: A9 2A 8D 00 7F 60 EA EA  EA EA EA EA EA EA EA EA
/// ```
pub fn hexdump(block: &MemoryBlock) -> String {
    let start = usize::from(block.start().get());
    block
        .as_bytes()
        .chunks(HEXDUMP_WIDTH)
        .enumerate()
        .map(|(row, bytes)| {
            let mut line = format!("{:#06x}:", start + row * HEXDUMP_WIDTH);
            for (i, byte) in bytes.iter().enumerate() {
                if i == HEXDUMP_WIDTH / 2 {
                    line.push(' ');
                }
                line.push_str(&format!(" {byte:02X}"));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Lower-case hex with no separators, as carried in JSON output.
pub fn hex_string(data: &[u8]) -> String {
    data.iter().map(|b| format!("{b:02x}")).collect()
}

pub fn format_address(address: u32) -> String {
    if address > 0xFFFF {
        format!("{address:#08x}")
    } else {
        format!("{address:#06x}")
    }
}

#[cfg(test)]
mod tests {
    use sxbmon_session::Address;

    use super::*;

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn raw_output_reports_write_failures() {
        let err = write_raw(&mut ClosedPipe, &[0xA9, 0x2A]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);

        let mut sink = Vec::new();
        write_raw(&mut sink, &[0xA9, 0x2A]).unwrap();
        assert_eq!(sink, [0xA9, 0x2A]);
    }

    #[test]
    fn hexdump_splits_rows_and_halves() {
        let data: Vec<u8> = (0u8..20).collect();
        let block = MemoryBlock::new(Address::new(0x2000), data).unwrap();
        assert_eq!(
            hexdump(&block),
            "0x2000: 00 01 02 03 04 05 06 07  08 09 0A 0B 0C 0D 0E 0F\n\
             0x2010: 10 11 12 13"
        );
    }

    #[test]
    fn hexdump_short_block() {
        let block = MemoryBlock::new(Address::new(0x0010), vec![0xEA]).unwrap();
        assert_eq!(hexdump(&block), "0x0010: EA");
    }

    #[test]
    fn hex_string_is_compact() {
        assert_eq!(hex_string(&[0xDE, 0xAD, 0x01]), "dead01");
    }

    #[test]
    fn addresses_widen_past_bank_zero() {
        assert_eq!(format_address(0x7EC4), "0x7ec4");
        assert_eq!(format_address(0x01_7EC4), "0x017ec4");
    }
}
