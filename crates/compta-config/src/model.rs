use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Tunables of the ledger engine. Every field falls back to its default when
/// missing from the stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Months in the rolling average window.
    pub average_window: usize,
    /// Decimal places kept by the rolling average.
    pub average_scale: u32,
    /// Store zero averages instead of letting the previous value carry over.
    pub store_zero_averages: bool,
    /// Default `tracing` directive, overridden by `RUST_LOG`.
    pub log_directive: String,
    /// Display name of the virtual savings account.
    pub savings_account_name: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            average_window: 12,
            average_scale: 2,
            store_zero_averages: false,
            log_directive: Self::default_log_directive(),
            savings_account_name: "Épargne".into(),
        }
    }
}

impl EngineConfig {
    pub fn default_log_directive() -> String {
        "compta_core=info".into()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.average_window == 0 {
            return Err(ConfigError::Invalid(
                "average_window must be at least one month".into(),
            ));
        }
        if self.average_scale > 28 {
            return Err(ConfigError::Invalid(format!(
                "average_scale {} exceeds the 28 supported decimal places",
                self.average_scale
            )));
        }
        if self.savings_account_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "savings_account_name must not be empty".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{ "average_window": 6 }"#).unwrap();
        assert_eq!(config.average_window, 6);
        assert_eq!(config.average_scale, 2);
        assert_eq!(config.log_directive, "compta_core=info");
    }

    #[test]
    fn zero_window_is_invalid() {
        let config = EngineConfig {
            average_window: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
