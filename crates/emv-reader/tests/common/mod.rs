//! Scripted in-memory card for driving sessions without hardware

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use emv_common::tlv::encode;
use emv_reader::apdu::commands;
use emv_reader::{Transport, TransportError};

pub type CommandLog = Rc<RefCell<Vec<Vec<u8>>>>;

#[derive(Clone)]
enum Reply {
    Respond(Vec<u8>),
    Timeout,
}

struct Rule {
    /// Only applies while this AID is selected
    aid: Option<Vec<u8>>,
    prefix: Vec<u8>,
    reply: Reply,
}

/// A card answering from a table of command prefixes
///
/// Rules scoped to the currently selected AID win over unscoped ones.
/// Unmatched commands get `6D00`.
pub struct MockCard<'a> {
    rules: Vec<Rule>,
    selected: Option<Vec<u8>>,
    log: CommandLog,
    connects: usize,
    hook: Option<Box<dyn FnMut(&[u8]) + 'a>>,
}

impl<'a> MockCard<'a> {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            selected: None,
            log: Rc::default(),
            connects: 0,
            hook: None,
        }
    }

    pub fn respond(mut self, prefix: &[u8], response: Vec<u8>) -> Self {
        self.rules.push(Rule {
            aid: None,
            prefix: prefix.to_vec(),
            reply: Reply::Respond(response),
        });
        self
    }

    pub fn respond_for(mut self, aid: &[u8], prefix: &[u8], response: Vec<u8>) -> Self {
        self.rules.push(Rule {
            aid: Some(aid.to_vec()),
            prefix: prefix.to_vec(),
            reply: Reply::Respond(response),
        });
        self
    }

    pub fn time_out_on(mut self, prefix: &[u8]) -> Self {
        self.rules.push(Rule {
            aid: None,
            prefix: prefix.to_vec(),
            reply: Reply::Timeout,
        });
        self
    }

    /// Run `hook` on every command before it is answered
    pub fn on_command(mut self, hook: impl FnMut(&[u8]) + 'a) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    pub fn log(&self) -> CommandLog {
        Rc::clone(&self.log)
    }

    pub fn connects(&self) -> usize {
        self.connects
    }

    fn lookup(&self, command: &[u8]) -> Reply {
        let scoped = self.rules.iter().find(|rule| {
            rule.aid.is_some() && rule.aid == self.selected && command.starts_with(&rule.prefix)
        });
        let unscoped = || {
            self.rules
                .iter()
                .find(|rule| rule.aid.is_none() && command.starts_with(&rule.prefix))
        };

        scoped
            .or_else(unscoped)
            .map(|rule| rule.reply.clone())
            .unwrap_or(Reply::Respond(vec![0x6D, 0x00]))
    }
}

impl Transport for MockCard<'_> {
    fn connect(&mut self) -> Result<(), TransportError> {
        self.connects += 1;
        Ok(())
    }

    fn transceive(&mut self, command: &[u8]) -> Result<Vec<u8>, TransportError> {
        self.log.borrow_mut().push(command.to_vec());
        if let Some(hook) = self.hook.as_mut() {
            hook(command);
        }

        if command.starts_with(&SELECT_PREFIX) && command.len() > 5 {
            let len = command[4] as usize;
            self.selected = command.get(5..5 + len).map(<[u8]>::to_vec);
        }

        match self.lookup(command) {
            Reply::Respond(response) => Ok(response),
            Reply::Timeout => Err(TransportError::Timeout),
        }
    }

    fn close(&mut self) {}

    fn set_timeout(&mut self, _timeout: Duration) {}
}

pub const SELECT_PREFIX: [u8; 4] = [0x00, 0xA4, 0x04, 0x00];
pub const GPO_PREFIX: [u8; 2] = [0x80, 0xA8];
pub const READ_RECORD_PREFIX: [u8; 2] = [0x00, 0xB2];

pub fn hex(s: &str) -> Vec<u8> {
    hex::decode(s).unwrap()
}

pub fn ok(data: Vec<u8>) -> Vec<u8> {
    [data, vec![0x90, 0x00]].concat()
}

pub fn select(aid: &[u8]) -> Vec<u8> {
    commands::select(aid).build()
}

pub fn read_record(record: u8, sfi: u8) -> Vec<u8> {
    commands::read_record(record, sfi).build()
}

/// PPSE FCI listing `aids` in order
pub fn ppse_response(aids: &[&[u8]]) -> Vec<u8> {
    let entries: Vec<u8> = aids
        .iter()
        .enumerate()
        .flat_map(|(i, aid)| {
            encode(
                &[0x61],
                &[encode(&[0x4F], aid), encode(&[0x87], &[i as u8 + 1])].concat(),
            )
        })
        .collect();

    ok(encode(
        &[0x6F],
        &[
            encode(&[0x84], b"2PAY.SYS.DDF01"),
            encode(&[0xA5], &encode(&[0xBF, 0x0C], &entries)),
        ]
        .concat(),
    ))
}

/// Application FCI, with a PDOL when one is given
pub fn fci(aid: &[u8], pdol: Option<&[u8]>) -> Vec<u8> {
    let mut proprietary = encode(&[0x50], b"DEBIT");
    if let Some(pdol) = pdol {
        proprietary.extend(encode(&[0x9F, 0x38], pdol));
    }

    ok(encode(
        &[0x6F],
        &[encode(&[0x84], aid), encode(&[0xA5], &proprietary)].concat(),
    ))
}

/// Format 2 GPO response carrying an AFL
pub fn gpo_format2(afl: &[u8]) -> Vec<u8> {
    ok(encode(
        &[0x77],
        &[encode(&[0x82], &[0x19, 0x80]), encode(&[0x94], afl)].concat(),
    ))
}

/// One encoded data object with a hex value
pub fn field(tag: &[u8], value: &str) -> Vec<u8> {
    encode(tag, &hex(value))
}

/// Record template around already encoded fields
pub fn record(fields: &[Vec<u8>]) -> Vec<u8> {
    ok(encode(&[0x70], &fields.concat()))
}

pub fn commands_with_prefix(log: &CommandLog, prefix: &[u8]) -> Vec<Vec<u8>> {
    log.borrow()
        .iter()
        .filter(|c| c.starts_with(prefix))
        .cloned()
        .collect()
}
