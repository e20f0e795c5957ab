use serde::Serialize;
use sxbmon_session::Vector;

use crate::cmd::{connect, LinkArgs, VectorsArgs};
use crate::exit::{CliResult, SUCCESS};
use crate::output::{format_address, print_json, print_table, OutputFormat};

#[derive(Serialize)]
struct VectorOutput {
    vector: &'static str,
    native: Option<u32>,
    emulation: Option<u32>,
    /// Hardware vector the active shadow entry corresponds to.
    hardware: Option<u32>,
}

pub fn run(_args: VectorsArgs, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    let session = connect(link)?;
    let board = *session.board_info();
    let emulation = session.emulation();
    session.close();

    let rows: Vec<VectorOutput> = Vector::ALL
        .iter()
        .map(|&vector| VectorOutput {
            vector: vector.name(),
            native: board.vector(vector, false),
            emulation: board.vector(vector, true),
            hardware: board
                .vector(vector, emulation)
                .map(|addr| board.hardware_address(addr)),
        })
        .collect();

    match format {
        OutputFormat::Json => print_json(&rows),
        OutputFormat::Table => print_table(
            &["VECTOR", "NATIVE", "EMULATION", "HARDWARE"],
            rows.iter()
                .map(|v| {
                    vec![
                        v.vector.to_string(),
                        optional_address(v.native),
                        optional_address(v.emulation),
                        optional_address(v.hardware),
                    ]
                })
                .collect(),
        ),
        OutputFormat::Pretty | OutputFormat::Raw => {
            for v in &rows {
                println!(
                    "{:<6} native={} emulation={} hardware={}",
                    v.vector,
                    optional_address(v.native),
                    optional_address(v.emulation),
                    optional_address(v.hardware)
                );
            }
        }
    }
    Ok(SUCCESS)
}

fn optional_address(address: Option<u32>) -> String {
    address.map(format_address).unwrap_or_else(|| "-".to_string())
}
