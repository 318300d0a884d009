//! Reader configuration

use std::time::Duration;

use emv_common::TtqVariant;

/// Hard ceiling on GET PROCESSING OPTIONS exchanges in one session.
///
/// Every successful GPO increments the card's Application Transaction
/// Counter; once the two-byte counter saturates the card stops working for
/// good. No configuration can raise the session budget above this value.
pub const GPO_ATTEMPT_CEILING: usize = 8;

/// Values the terminal supplies for country and currency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalConfig {
    /// Terminal Country Code (9F1A), ISO 3166 numeric in BCD
    pub country_code: [u8; 2],
    /// Transaction Currency Code (5F2A), ISO 4217 numeric in BCD
    pub currency_code: [u8; 2],
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            country_code: [0x08, 0x26],
            currency_code: [0x09, 0x86],
        }
    }
}

/// How far the AFL reader goes once PAN and expiry are known
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecordPolicy {
    /// Read every record the AFL declares
    #[default]
    Exhaustive,
    /// Stop issuing READ RECORD once both fields are found
    StopWhenComplete,
}

/// Session configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderConfig {
    pub terminal: TerminalConfig,
    ttq_variants: Vec<TtqVariant>,
    max_gpo_attempts: usize,
    pub record_policy: RecordPolicy,
    pub timeout: Duration,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            terminal: TerminalConfig::default(),
            ttq_variants: vec![TtqVariant::STANDARD],
            max_gpo_attempts: 4,
            record_policy: RecordPolicy::Exhaustive,
            timeout: Duration::from_secs(10),
        }
    }
}

impl ReaderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// TTQ variants to try per AID, in order
    ///
    /// Duplicates are dropped; an empty list falls back to the standard variant.
    pub fn with_ttq_variants(mut self, variants: impl IntoIterator<Item = TtqVariant>) -> Self {
        let mut unique = Vec::new();
        for variant in variants {
            if !unique.contains(&variant) {
                unique.push(variant);
            }
        }
        if unique.is_empty() {
            unique.push(TtqVariant::STANDARD);
        }
        self.ttq_variants = unique;
        self
    }

    /// Session-wide GPO budget, clamped to `1..=GPO_ATTEMPT_CEILING`
    pub fn with_max_gpo_attempts(mut self, attempts: usize) -> Self {
        self.max_gpo_attempts = attempts.clamp(1, GPO_ATTEMPT_CEILING);
        self
    }

    pub fn with_record_policy(mut self, policy: RecordPolicy) -> Self {
        self.record_policy = policy;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_terminal(mut self, terminal: TerminalConfig) -> Self {
        self.terminal = terminal;
        self
    }

    pub fn ttq_variants(&self) -> &[TtqVariant] {
        &self.ttq_variants
    }

    pub fn max_gpo_attempts(&self) -> usize {
        self.max_gpo_attempts
    }
}
