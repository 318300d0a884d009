//! Hardware-dependent integration tests
//!
//! These tests require a PC/SC reader, and most need a contactless payment
//! card on it. They are ignored by default and must be explicitly run with:
//!
//!     cargo test --package emv-reader --test hardware_integration -- --ignored
//!
//! Every session sends at least one GET PROCESSING OPTIONS, which advances
//! the card's transaction counter. Do not loop these tests.

use std::time::Duration;

use emv_reader::apdu::{check_status, commands};
use emv_reader::protocol::aids;
use emv_reader::{CardReader, ReaderConfig, SessionManager, Transport};

/// Test that we can connect to a card reader
///
/// **Requires**: Card reader connected (card not required)
#[test]
#[ignore = "requires hardware: card reader"]
fn test_connect_to_reader() {
    let reader = CardReader::new().expect("Failed to establish PC/SC context");
    let readers = reader.list_readers().expect("Failed to list readers");
    assert!(!readers.is_empty(), "No reader attached");
}

/// Test that an inserted card is seen and answers PPSE
///
/// **Requires**: Contactless payment card on the reader
#[test]
#[ignore = "requires hardware: card on reader"]
fn test_select_ppse() {
    let reader = CardReader::new().expect("Failed to establish PC/SC context");
    let name = reader.find_reader(None).expect("No reader attached");
    assert!(
        reader
            .wait_for_card(&name, Some(Duration::from_secs(10)))
            .expect("Status change failed"),
        "No card presented"
    );

    let mut transport = reader.transport(&name);
    transport.connect().expect("Failed to connect to card");

    let response = commands::select(aids::PPSE)
        .send(&mut transport)
        .expect("PPSE exchange failed");
    let payload = check_status(&response).expect("PPSE rejected");
    println!("PPSE FCI: {}", hex::encode_upper(payload));
    assert!(emv_common::find_tag(payload, &[0x4F]).is_some());
}

/// Full session through the manager
///
/// **Requires**: Contactless payment card on the reader
#[test]
#[ignore = "requires hardware: EMV card"]
fn test_full_session() {
    let reader = CardReader::new().expect("Failed to establish PC/SC context");
    let name = reader.find_reader(None).expect("No reader attached");

    let manager = SessionManager::new(ReaderConfig::default());
    manager.arm();
    assert!(
        reader
            .wait_for_card(&name, Some(Duration::from_secs(10)))
            .expect("Status change failed"),
        "No card presented"
    );

    let mut transport = reader.transport(&name);
    let outcome = manager
        .on_card_discovered(&mut transport)
        .expect("Session was not started");

    for event in &outcome.trace {
        println!(
            "[{}] {} -> {:?}",
            event.state,
            hex::encode_upper(&event.command),
            event.response.as_ref().map(hex::encode_upper)
        );
    }

    let record = outcome.result.expect("Card could not be read");
    println!("{} {} ({})", record.brand, record.expiry, record.pan.len());
    assert!(record.ready);
    assert_eq!(record.expiry.len(), 5);
    assert!(!manager.is_armed());
}
