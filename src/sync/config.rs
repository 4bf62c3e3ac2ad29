/*!
 * Wait Configuration
 *
 * Runtime selection of the wait implementation level
 */

use super::capability::{set_api_level, ApiLevel};
use crate::errors::WaitResult;
use tracing::{info, warn};

/// Environment variable consulted by [`WaitConfig::from_env`]
pub const STRATEGY_ENV: &str = "ADDR_WAIT_STRATEGY";

/// Strategy type selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyType {
    /// Native wait-on-address primitive (Linux futex)
    Native,
    /// Wait table emulation (lock + condvar per entry)
    Fallback,
    /// Native when the host provides it, wait table otherwise
    Auto,
}

impl StrategyType {
    /// Parse a strategy name (case-insensitive)
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "native" | "futex" => Some(StrategyType::Native),
            "fallback" | "table" | "condvar" => Some(StrategyType::Fallback),
            "auto" | "" => Some(StrategyType::Auto),
            _ => None,
        }
    }
}

/// Wait subsystem configuration
///
/// The level is process-wide and fixed at first use, so apply the
/// configuration before any thread waits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitConfig {
    /// Preferred strategy
    pub strategy: StrategyType,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyType::Auto,
        }
    }
}

impl WaitConfig {
    /// Configuration forcing the wait table (testing, diagnostics)
    pub const fn fallback() -> Self {
        Self {
            strategy: StrategyType::Fallback,
        }
    }

    /// Configuration requiring the native primitive
    pub const fn native() -> Self {
        Self {
            strategy: StrategyType::Native,
        }
    }

    /// Read the strategy from `ADDR_WAIT_STRATEGY`
    ///
    /// Unset or unrecognized values fall back to `Auto`.
    pub fn from_env() -> Self {
        let strategy = match std::env::var(STRATEGY_ENV) {
            Ok(value) => StrategyType::parse(&value).unwrap_or_else(|| {
                warn!(value = %value, "unrecognized {}, using auto", STRATEGY_ENV);
                StrategyType::Auto
            }),
            Err(_) => StrategyType::Auto,
        };
        Self { strategy }
    }

    /// Apply the configuration, returning the level in effect
    pub fn apply(&self) -> WaitResult<ApiLevel> {
        let level = match self.strategy {
            StrategyType::Native => set_api_level(ApiLevel::NativeWait)?,
            StrategyType::Fallback => set_api_level(ApiLevel::Fallback)?,
            StrategyType::Auto => {
                if super::capability::probe() {
                    ApiLevel::NativeWait
                } else {
                    ApiLevel::Fallback
                }
            }
        };
        info!(strategy = ?self.strategy, level = ?level, "wait configuration applied");
        Ok(level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_strategy() {
        assert_eq!(StrategyType::parse("Native"), Some(StrategyType::Native));
        assert_eq!(StrategyType::parse(" fallback "), Some(StrategyType::Fallback));
        assert_eq!(StrategyType::parse(""), Some(StrategyType::Auto));
        assert_eq!(StrategyType::parse("spin"), None);
    }

    #[test]
    fn test_presets() {
        assert_eq!(WaitConfig::default().strategy, StrategyType::Auto);
        assert_eq!(WaitConfig::fallback(), WaitConfig { strategy: StrategyType::Fallback });
        assert_eq!(WaitConfig::native().strategy, StrategyType::Native);
    }

    #[test]
    fn test_auto_apply_matches_probe() {
        let level = WaitConfig::default().apply().unwrap();
        assert_eq!(level == ApiLevel::NativeWait, super::super::capability::probe());
    }
}
