//! Print the board description and the page-zero contents of a connected SXB.
//!
//! Usage: cargo run --example board-report -- /dev/ttyUSB0

use sxbmon::session::{Address, Session, SessionConfig, Vector};
use sxbmon::transport::{LinkConfig, SerialPortLink};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let port = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/dev/ttyUSB0".to_string());

    let link = SerialPortLink::open(&LinkConfig::new(port))?;
    let mut session = Session::open(link, SessionConfig::default())?;

    let board = *session.board_info();
    let emulation = session.emulation();
    println!("cpu={:?} board_id={:#04x} mon_ram={:#06x}", board.cpu, board.board_id, board.mon_ram);
    for vector in Vector::ALL {
        if let Some(address) = board.vector(vector, emulation) {
            println!("{:<6} {:#06x}", vector.name(), address);
        }
    }

    let zero_page = session.read(Address::new(0x0000), 0x100)?;
    for (row, bytes) in zero_page.as_bytes().chunks(16).enumerate() {
        println!("{:#06x}: {:02X?}", row * 16, bytes);
    }

    let registers = session.get_registers()?;
    println!("{registers:?}");

    session.close();
    Ok(())
}
