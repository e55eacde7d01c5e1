//! Shared fixtures for the engine integration tests.

#![allow(dead_code)]

use secflow_core::{AccountId, Amount, EngineConfig, Sector};
use secflow_engine::Orchestrator;
use tracing_subscriber::EnvFilter;

/// A compact layout whose symbols are plain letters, so words read like
/// `"AI"`: AGRICULTURE `A-C`, ENERGY `E`, FINANCE `F-G`, INDUSTRY `I-K`,
/// SERVICES `S-U`.
pub const LETTER_LAYOUT: &str = r#"
sectors:
  - sector: AGRICULTURE
    start: "A"
    capacity: 3
  - sector: ENERGY
    start: "E"
    capacity: 1
  - sector: FINANCE
    start: "F"
    capacity: 2
  - sector: INDUSTRY
    start: "I"
    capacity: 3
  - sector: SERVICES
    start: "S"
    capacity: 3
joint_classes:
  - from: AGRICULTURE
    to: INDUSTRY
max_hops: 3
"#;

/// Install a test-writer subscriber once; `RUST_LOG` overrides the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_test_writer()
        .try_init();
}

pub fn acct(id: &str) -> AccountId {
    AccountId::new(id).unwrap()
}

pub fn units(n: u64) -> Amount {
    Amount::from_units(n)
}

pub fn letter_config() -> EngineConfig {
    EngineConfig::from_yaml_str(LETTER_LAYOUT).unwrap()
}

pub fn letter_engine() -> Orchestrator {
    init_tracing();
    Orchestrator::new(letter_config()).unwrap()
}

pub fn default_engine() -> Orchestrator {
    init_tracing();
    Orchestrator::new(EngineConfig::default()).unwrap()
}

/// Register `(id, sector, balance)` accounts.
pub fn open(engine: &mut Orchestrator, accounts: &[(&str, Sector, u64)]) {
    for (id, sector, balance) in accounts {
        engine.create_account(acct(id), *sector, units(*balance)).unwrap();
    }
}

/// Add `from → to` links.
pub fn link(engine: &mut Orchestrator, links: &[(&str, &str)]) {
    for (from, to) in links {
        engine.connect(&acct(from), &acct(to)).unwrap();
    }
}
