use std::process::ExitCode;

use crate::formatters::{format_record, FormatMode};
use crate::worker::{CardCommand, CardEvent, CardWorker};

use super::SessionArgs;

/// Read cards as they are presented until `count` sessions have ended
pub fn cmd_watch(args: &SessionArgs, count: Option<usize>, format_mode: FormatMode) -> ExitCode {
    let (events, commands) = CardWorker::spawn(args);
    let mut sessions = 0;

    while let Ok(event) = events.recv() {
        match event {
            CardEvent::ReaderAvailable { reader_name } => println!("Reader: {}", reader_name),
            CardEvent::ReaderUnavailable { error } => eprintln!("Reader unavailable: {}", error),
            CardEvent::Armed => println!("Present a card..."),
            CardEvent::CardDetected => println!("Card detected, reading"),
            CardEvent::DataReady { record, exchanges } => {
                sessions += 1;
                println!("{}", format_record(&record, format_mode));
                println!("({} exchanges)\n", exchanges);
            }
            CardEvent::Error { code, message } => {
                sessions += 1;
                eprintln!("{}: {}\n", code, message);
            }
            CardEvent::CardRemoved => println!("Card removed"),
        }

        if count.is_some_and(|limit| sessions >= limit) {
            let _ = commands.send(CardCommand::Stop);
            break;
        }
    }

    ExitCode::SUCCESS
}
