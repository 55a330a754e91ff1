#![doc(test(attr(deny(warnings))))]

//! Compta Core keeps a personal double-entry ledger in memory and answers,
//! for every account and month, the projected balance, the cleared balance,
//! and a rolling average, plus short-range overdraft warnings and recurring
//! entry generation.

pub mod core;
pub mod errors;
pub mod utils;

pub use crate::core::ledger_manager::{LedgerManager, SubscriptionId};
pub use compta_config::{ConfigManager, EngineConfig};
pub use errors::LedgerError;
pub use utils::build_info;

pub use compta_domain as domain;
pub use compta_engine as engine;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing with the default directive.
pub fn init() {
    init_with(&EngineConfig::default());
}

/// Initializes global tracing with `config`'s directive and logs the build
/// metadata once.
pub fn init_with(config: &EngineConfig) {
    INIT_TRACING.call_once(|| {
        utils::init_tracing(&config.log_directive);
        let build = build_info::current();
        tracing::info!(build = %build, rustc = build.rustc, "Compta Core tracing initialized.");
    });
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_does_not_panic() {
        super::init();
        super::init();
    }
}
