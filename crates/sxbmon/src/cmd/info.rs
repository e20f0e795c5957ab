use serde::Serialize;
use sxbmon_session::{BoardInfo, Cpu};

use crate::cmd::{connect, InfoArgs, LinkArgs};
use crate::exit::{CliResult, SUCCESS};
use crate::output::{format_address, print_json, print_table, OutputFormat};

#[derive(Serialize)]
struct InfoOutput<'a> {
    port: &'a str,
    #[serde(flatten)]
    board: BoardInfo,
    emulation: bool,
}

pub fn run(_args: InfoArgs, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    let session = connect(link)?;
    let out = InfoOutput {
        port: link.port.as_deref().unwrap_or_default(),
        board: *session.board_info(),
        emulation: session.emulation(),
    };
    print_info(&out, format);
    session.close();
    Ok(SUCCESS)
}

fn cpu_name(cpu: Cpu) -> &'static str {
    match cpu {
        Cpu::W65C02 => "W65C02",
        Cpu::W65C816 => "W65C816",
    }
}

fn print_info(out: &InfoOutput<'_>, format: OutputFormat) {
    let board = &out.board;
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => print_table(
            &["FIELD", "VALUE"],
            vec![
                row("CPU", cpu_name(board.cpu).to_string()),
                row("Board ID", format!("{:#04x}", board.board_id)),
                row("Monitor RAM", format_address(board.mon_ram)),
                row("Monitor ROM", format_address(board.mon_rom)),
                row("Shadow vectors", format_address(board.shadow_vector_base)),
                row("Hardware I/O", format_address(board.hw_io)),
                row("Hardware vectors", format_address(board.hw_vector_base)),
                row("Mode", mode(out.emulation).to_string()),
            ],
        ),
        OutputFormat::Pretty => {
            println!("Board Info ({}):", out.port);
            println!("  CPU:              {}", cpu_name(board.cpu));
            println!("  Board ID:         {:#04x}", board.board_id);
            println!("  Monitor RAM:      {}", format_address(board.mon_ram));
            println!("  Monitor ROM:      {}", format_address(board.mon_rom));
            println!("  Shadow vectors:   {}", format_address(board.shadow_vector_base));
            println!("  Hardware I/O:     {}", format_address(board.hw_io));
            println!("  Hardware vectors: {}", format_address(board.hw_vector_base));
            println!("  Mode:             {}", mode(out.emulation));
        }
        OutputFormat::Raw => println!("{}", cpu_name(board.cpu)),
    }
}

fn row(field: &str, value: String) -> Vec<String> {
    vec![field.to_string(), value]
}

pub(crate) fn mode(emulation: bool) -> &'static str {
    if emulation {
        "emulation"
    } else {
        "native"
    }
}
