use sxbmon_session::{Register, RegisterOverrides, RegisterSet};

use crate::cmd::{connect, LinkArgs, RegsArgs};
use crate::exit::{session_error, validation_error, CliResult, SUCCESS};
use crate::output::{print_json, print_table, OutputFormat};

pub fn run(args: RegsArgs, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    let overrides = RegisterOverrides::parse_assignments(&args.set)
        .map_err(|err| validation_error("--set", err))?;

    let mut session = connect(link)?;
    let mut registers = session
        .get_registers()
        .map_err(|err| session_error("reading registers failed", err))?;
    if !overrides.is_empty() {
        registers.apply(&overrides);
        session
            .set_registers(&registers)
            .map_err(|err| session_error("writing registers failed", err))?;
    }
    session.close();

    print_registers(&registers, format);
    Ok(SUCCESS)
}

fn format_register(registers: &RegisterSet, register: Register) -> String {
    let value = registers.get(register);
    match register.bits() {
        16 => format!("{value:#06x}"),
        8 => format!("{value:#04x}"),
        _ => value.to_string(),
    }
}

fn print_registers(registers: &RegisterSet, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(registers),
        OutputFormat::Table => print_table(
            &["REGISTER", "VALUE"],
            Register::ALL
                .iter()
                .map(|&r| vec![r.name().to_string(), format_register(registers, r)])
                .collect(),
        ),
        OutputFormat::Pretty | OutputFormat::Raw => {
            let line = Register::ALL
                .iter()
                .map(|&r| format!("{}={}", r.name(), format_register(registers, r)))
                .collect::<Vec<_>>()
                .join(" ");
            println!("{line}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_values_use_register_width() {
        let registers = RegisterSet::reset(true);
        assert_eq!(format_register(&registers, Register::SP), "0x01ff");
        assert_eq!(format_register(&registers, Register::P), "0x76");
        assert_eq!(format_register(&registers, Register::E), "1");
    }
}
