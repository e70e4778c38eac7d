//! Simulation configuration.
//!
//! Cold, process-wide numbers live here and are handed out by `Arc` at
//! startup; there is no hot-path compile-time feature split like a
//! latency-sensitive system would want, since nothing here runs often enough
//! to matter for codegen.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub sales_tax_rate: f64,
    pub broker_fee_rate: f64,
    pub min_price: f64,
    pub idle_tax: f64,

    /// Count-windowed lookback for price model / history `average`.
    pub internal_lookback: usize,
    /// Time-windowed lookback for `t_average`, in ticks of `trader_tick_ms`.
    pub external_lookback_ticks: u64,

    pub history_capacity: usize,
    pub price_model_window: usize,

    pub auction_tick_ms: u64,
    pub max_processed_per_flush_auction: usize,
    pub max_processed_per_flush_agent: usize,

    pub mailbox_capacity: usize,

    /// Supervisor's weighted-spawn decay constant (negative: oversupplied
    /// commodities become less likely to be (re)spawned).
    pub supervisor_gamma: f64,
    pub supervisor_lookback_ms: i64,
    pub target_steptime_ms: u64,

    /// Population floor the supervisor spawns new agents to maintain.
    pub target_trader_count: usize,
    /// Caps how many agents one control-tick spawns, even if the deficit
    /// against `target_trader_count` is larger.
    pub max_spawns_per_tick: usize,
    /// New-agent starting money and inventory capacity, matching the values
    /// the reference scenarios spawn farmers with.
    pub starting_money: f64,
    pub starting_capacity: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sales_tax_rate: 0.08,
            broker_fee_rate: 0.03,
            min_price: 0.10,
            idle_tax: 20.0,
            internal_lookback: 50,
            external_lookback_ticks: 50,
            history_capacity: 60_000,
            price_model_window: 50,
            auction_tick_ms: 10,
            max_processed_per_flush_auction: 800,
            max_processed_per_flush_agent: 100,
            mailbox_capacity: 4096,
            supervisor_gamma: -0.02,
            supervisor_lookback_ms: 5_000,
            target_steptime_ms: 500,
            target_trader_count: 40,
            max_spawns_per_tick: 4,
            starting_money: 100.0,
            starting_capacity: 50.0,
        }
    }
}

impl Config {
    /// The `external_lookback` time window, derived from the agent tick rate
    /// actually in use (spec: `external_lookback ≈ 50 × trader_tick_ms`).
    pub fn external_lookback_ms(&self, trader_tick_ms: u64) -> i64 {
        (self.external_lookback_ticks * trader_tick_ms) as i64
    }

    /// Overlay a handful of `BAZAARBOT_*` environment variables onto the
    /// defaults. Unset or unparsable variables are ignored rather than
    /// treated as a startup failure.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        macro_rules! overlay {
            ($field:ident, $env:literal) => {
                if let Ok(raw) = std::env::var($env) {
                    if let Ok(parsed) = raw.parse() {
                        cfg.$field = parsed;
                    } else {
                        tracing::warn!(
                            "ignoring unparsable {}={:?}",
                            $env,
                            raw
                        );
                    }
                }
            };
        }
        overlay!(sales_tax_rate, "BAZAARBOT_SALES_TAX_RATE");
        overlay!(broker_fee_rate, "BAZAARBOT_BROKER_FEE_RATE");
        overlay!(min_price, "BAZAARBOT_MIN_PRICE");
        overlay!(idle_tax, "BAZAARBOT_IDLE_TAX");
        overlay!(auction_tick_ms, "BAZAARBOT_AUCTION_TICK_MS");
        overlay!(target_steptime_ms, "BAZAARBOT_TARGET_STEPTIME_MS");
        overlay!(target_trader_count, "BAZAARBOT_TARGET_TRADER_COUNT");
        overlay!(starting_money, "BAZAARBOT_STARTING_MONEY");
        overlay!(starting_capacity, "BAZAARBOT_STARTING_CAPACITY");
        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_design_numbers() {
        let cfg = Config::default();
        assert_eq!(cfg.sales_tax_rate, 0.08);
        assert_eq!(cfg.broker_fee_rate, 0.03);
        assert_eq!(cfg.min_price, 0.10);
        assert_eq!(cfg.history_capacity, 60_000);
        assert_eq!(cfg.auction_tick_ms, 10);
        assert_eq!(cfg.max_processed_per_flush_auction, 800);
        assert_eq!(cfg.max_processed_per_flush_agent, 100);
    }

    #[test]
    fn external_lookback_scales_with_tick_rate() {
        let cfg = Config::default();
        assert_eq!(cfg.external_lookback_ms(500), 25_000);
    }
}
