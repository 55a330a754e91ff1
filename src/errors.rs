use compta_config::ConfigError;
use compta_engine::CoreError;
use thiserror::Error;

/// Failures surfaced by [`crate::LedgerManager`].
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Ledger state lock poisoned by a panicking writer")]
    Poisoned,
}

impl LedgerError {
    /// The engine error behind this failure, if any.
    pub fn core(&self) -> Option<&CoreError> {
        match self {
            LedgerError::Core(err) => Some(err),
            _ => None,
        }
    }
}
