use std::process::ExitCode;

use emv_common::{DataObjectList, DefaultValueTable, DolKind};

/// Print the terminal default values, and decode a PDOL when one is given
pub fn cmd_dol_table(pdol: Option<&str>) -> ExitCode {
    print!("{}", DefaultValueTable::standard().dump());

    let Some(pdol) = pdol else {
        return ExitCode::SUCCESS;
    };

    let bytes = match hex::decode(pdol) {
        Ok(bytes) => bytes,
        Err(err) => {
            eprintln!("PDOL is not valid hex: {}", err);
            return ExitCode::FAILURE;
        }
    };

    match DataObjectList::decode(&bytes) {
        Ok(dol) => {
            println!();
            print!("{}", dol.dump(DolKind::Pdol, 0));
            println!("Total: {} bytes", dol.total_length());
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Malformed PDOL: {}", err);
            ExitCode::FAILURE
        }
    }
}
