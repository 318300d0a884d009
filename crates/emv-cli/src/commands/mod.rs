pub mod dol_table;
pub mod dump;
pub mod dump_all_tags;
pub mod read;
pub mod watch;

use std::time::Duration;

use clap::Args;
use emv_common::TtqVariant;
use emv_reader::{CardReader, ReaderConfig, RecordPolicy, SessionManager, SessionOutcome};

/// Options shared by every command that talks to a card
#[derive(Args, Clone, Debug)]
pub struct SessionArgs {
    /// Reader name (substring match); the first attached reader if omitted
    #[arg(short, long)]
    pub reader: Option<String>,

    /// TTQ variants (0-3) to try in order when the card rejects GPO
    #[arg(long = "ttq", value_parser = parse_ttq, num_args = 1..)]
    pub ttq: Vec<TtqVariant>,

    /// GET PROCESSING OPTIONS budget per card (clamped to 8)
    #[arg(long, default_value_t = 4)]
    pub max_gpo_attempts: usize,

    /// Stop reading records once PAN and expiry are known
    #[arg(long)]
    pub stop_when_complete: bool,

    /// Per-exchange timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout: u64,

    /// Seconds to wait for a card to be presented
    #[arg(long, default_value_t = 30)]
    pub wait: u64,
}

impl SessionArgs {
    pub fn config(&self) -> ReaderConfig {
        let policy = if self.stop_when_complete {
            RecordPolicy::StopWhenComplete
        } else {
            RecordPolicy::Exhaustive
        };

        ReaderConfig::new()
            .with_ttq_variants(self.ttq.iter().copied())
            .with_max_gpo_attempts(self.max_gpo_attempts)
            .with_record_policy(policy)
            .with_timeout(Duration::from_secs(self.timeout))
    }
}

fn parse_ttq(s: &str) -> Result<TtqVariant, String> {
    let selector: u8 = s
        .trim_start_matches("0x")
        .parse()
        .map_err(|_| format!("`{}` is not a TTQ selector", s))?;
    TtqVariant::new(selector).ok_or_else(|| format!("TTQ selector must be 0-3, got {}", selector))
}

/// Wait for a card on the selected reader and run one session over it
pub(crate) fn run_session(args: &SessionArgs) -> Option<SessionOutcome> {
    let reader = match CardReader::new() {
        Ok(r) => r,
        Err(err) => {
            eprintln!("Failed to establish PC/SC context: {}", err);
            return None;
        }
    };

    let reader_name = match reader.find_reader(args.reader.as_deref()) {
        Ok(name) => name,
        Err(err) => {
            eprintln!("No usable reader: {}", err);
            return None;
        }
    };
    println!("Reader: {}", reader_name.to_string_lossy());

    let manager = SessionManager::new(args.config());
    manager.arm();
    println!("Present a card...\n");

    match reader.wait_for_card(&reader_name, Some(Duration::from_secs(args.wait))) {
        Ok(true) => {}
        Ok(false) => {
            eprintln!("No card presented within {} seconds", args.wait);
            return None;
        }
        Err(err) => {
            eprintln!("Failed to watch reader: {}", err);
            return None;
        }
    }

    let mut transport = reader.transport(&reader_name);
    match manager.on_card_discovered(&mut transport) {
        Ok(outcome) => Some(outcome),
        Err(err) => {
            eprintln!("{}: {}", err.code(), err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ttq() {
        assert_eq!(parse_ttq("2"), Ok(TtqVariant::new(2).unwrap()));
        assert_eq!(parse_ttq("0x03"), Ok(TtqVariant::new(3).unwrap()));
        assert!(parse_ttq("4").is_err());
        assert!(parse_ttq("x").is_err());
    }
}
