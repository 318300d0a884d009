use std::process::ExitCode;

use emv_reader::apdu::ApduResponse;
use emv_reader::TraceEvent;

use crate::formatters::FormatMode;

use super::dump_all_tags::dump_all_tags;
use super::{run_session, SessionArgs};

fn command_name(command: &[u8]) -> &'static str {
    match command.get(1) {
        Some(0xA4) => "SELECT",
        Some(0xA8) => "GET PROCESSING OPTIONS",
        Some(0xB2) => "READ RECORD",
        _ => "UNKNOWN",
    }
}

fn dump_event(index: usize, event: &TraceEvent, format_mode: FormatMode) {
    println!(
        "Exchange {} ({}): {} {}",
        index + 1,
        event.state,
        command_name(&event.command),
        hex::encode_upper(&event.command)
    );

    match &event.response {
        Err(err) => println!("  <failed: {}>", err),
        Ok(raw) => match ApduResponse::from_raw(raw) {
            Some(response) if response.is_success() => {
                dump_all_tags(&response.data, 1, format_mode)
            }
            Some(response) => println!("  Status: {}", response.status_string()),
            None => println!("  <short response: {}>", hex::encode_upper(raw)),
        },
    }
    println!();
}

pub fn cmd_dump(args: &SessionArgs, format_mode: FormatMode) -> ExitCode {
    println!("EMV Tag Dump - All TLV Tags\n");

    let Some(outcome) = run_session(args) else {
        return ExitCode::FAILURE;
    };

    println!("=== DUMPING ALL TLV TAGS FROM ALL RESPONSES ===\n");
    println!("Total exchanges: {}\n", outcome.trace.len());

    for (i, event) in outcome.trace.iter().enumerate() {
        dump_event(i, event, format_mode);
    }

    match outcome.result {
        Ok(_) => {
            println!("=== Dump Complete ===");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Session ended with {}: {}", err.code(), err);
            ExitCode::FAILURE
        }
    }
}
