use std::process::ExitCode;

use crate::formatters::{format_record, FormatMode};

use super::{run_session, SessionArgs};

pub fn cmd_read(args: &SessionArgs, format_mode: FormatMode) -> ExitCode {
    let Some(outcome) = run_session(args) else {
        return ExitCode::FAILURE;
    };

    match outcome.result {
        Ok(record) => {
            if format_mode == FormatMode::Human {
                println!("=== Card Data ===\n");
            }
            println!("{}", format_record(&record, format_mode));
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{}: {}", err.code(), err);
            eprintln!("{} exchange(s) with the card", outcome.trace.len());
            ExitCode::FAILURE
        }
    }
}
