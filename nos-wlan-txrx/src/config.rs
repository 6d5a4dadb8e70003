//! Transmit path configuration
//!
//! Values mirror the driver ini options. `set_option` accepts them by name
//! so the configuration can be loaded from key/value pairs.

use nos_wlan_api::{Milliseconds, Result, TxError};

use crate::stats_ring::StatsEvictionPolicy;

/// Default backlog bound per virtual interface
pub const DEFAULT_MAX_Q_DEPTH: usize = 512;
/// Default flow-control low watermark (descriptors)
pub const DEFAULT_LOW_WATERMARK: u32 = 100;
/// Default number of frames that triggers a device-wide bundle flush
pub const DEFAULT_BUNDLE_SIZE: usize = 16;
/// Default number of ACK replacements before a forced flush
pub const DEFAULT_ACK_REPLACE_THRESHOLD: u32 = 20;
/// Default stats ring capacity
pub const DEFAULT_POOL_CAPACITY: usize = 32;
/// Default number of frames one scheduler pass may send
pub const DEFAULT_TX_BUDGET_PER_PASS: u32 = 64;
/// Default delayed-ACK flush timeout
pub const DEFAULT_ACK_TIMER_MS: Milliseconds = 3;
/// Default bundle flush timeout
pub const DEFAULT_BUNDLE_TIMER_MS: Milliseconds = 100;
/// Descriptors kept back for EAPOL/DHCP frames
pub const DEFAULT_HI_PRIO_RESERVE: u32 = 20;

/// Configuration shared by every interface of a physical device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxConfig {
    /// Backlog queue bound per interface
    pub max_q_depth: usize,
    /// Device-level low watermark used for the scheduler's admission margin
    pub low_watermark: u32,
    /// Shared bundle counter value that flushes every bundle queue
    pub bundle_size_threshold: usize,
    /// Maximum ACK replacements per flow before a forced flush
    pub ack_replace_threshold: u32,
    /// Master switch for TCP ACK coalescing
    pub coalescing_enabled: bool,
    /// Master switch for bundling
    pub bundling_enabled: bool,
    /// Stats ring capacity (N)
    pub pool_capacity: usize,
    /// Upper bound on frames sent by one scheduler pass
    pub tx_budget_per_pass: u32,
    /// Delayed-ACK flush timeout
    pub ack_timer_ms: Milliseconds,
    /// Bundle flush timeout
    pub bundle_timer_ms: Milliseconds,
    /// Descriptors reserved for latency-sensitive frames
    pub hi_prio_reserve: u32,
    /// Record per-packet telemetry
    pub per_pkt_stats_enabled: bool,
    /// Which stats records are sacrificed when the ring is full
    pub stats_eviction: StatsEvictionPolicy,
}

impl Default for TxConfig {
    fn default() -> Self {
        Self {
            max_q_depth: DEFAULT_MAX_Q_DEPTH,
            low_watermark: DEFAULT_LOW_WATERMARK,
            bundle_size_threshold: DEFAULT_BUNDLE_SIZE,
            ack_replace_threshold: DEFAULT_ACK_REPLACE_THRESHOLD,
            coalescing_enabled: false,
            bundling_enabled: false,
            pool_capacity: DEFAULT_POOL_CAPACITY,
            tx_budget_per_pass: DEFAULT_TX_BUDGET_PER_PASS,
            ack_timer_ms: DEFAULT_ACK_TIMER_MS,
            bundle_timer_ms: DEFAULT_BUNDLE_TIMER_MS,
            hi_prio_reserve: DEFAULT_HI_PRIO_RESERVE,
            per_pkt_stats_enabled: false,
            stats_eviction: StatsEvictionPolicy::default(),
        }
    }
}

impl TxConfig {
    /// Check the values the engine relies on being non-zero
    pub fn validate(&self) -> Result<()> {
        if self.max_q_depth == 0 {
            return Err(TxError::InvalidConfig("max_q_depth must be non-zero"));
        }
        if self.pool_capacity == 0 {
            return Err(TxError::InvalidConfig("pool_capacity must be non-zero"));
        }
        if self.tx_budget_per_pass == 0 {
            return Err(TxError::InvalidConfig("tx_budget_per_pass must be non-zero"));
        }
        if self.ack_timer_ms == 0 || self.bundle_timer_ms == 0 {
            return Err(TxError::InvalidConfig("timer periods must be non-zero"));
        }
        Ok(())
    }

    /// Set one option by its ini name
    pub fn set_option(&mut self, name: &str, value: &str) -> Result<()> {
        match name {
            "max_q_depth" => self.max_q_depth = parse_num(value)?,
            "low_watermark" => self.low_watermark = parse_num(value)?,
            "bundle_size_threshold" => self.bundle_size_threshold = parse_num(value)?,
            "ack_replace_threshold" => self.ack_replace_threshold = parse_num(value)?,
            "coalescing_enabled" => self.coalescing_enabled = parse_bool(value)?,
            "bundling_enabled" => self.bundling_enabled = parse_bool(value)?,
            "pool_capacity" => self.pool_capacity = parse_num(value)?,
            "tx_budget_per_pass" => self.tx_budget_per_pass = parse_num(value)?,
            "ack_timer_ms" => self.ack_timer_ms = parse_num(value)?,
            "bundle_timer_ms" => self.bundle_timer_ms = parse_num(value)?,
            "hi_prio_reserve" => self.hi_prio_reserve = parse_num(value)?,
            "per_pkt_stats_enabled" => self.per_pkt_stats_enabled = parse_bool(value)?,
            "stats_eviction" => {
                self.stats_eviction = match value.trim() {
                    "complete_first" => StatsEvictionPolicy::CompleteOldestFirst,
                    "complete_newest_first" => StatsEvictionPolicy::CompleteNewestFirst,
                    "host_first" => StatsEvictionPolicy::HostFilledFirst,
                    _ => return Err(TxError::InvalidConfig("unknown stats_eviction policy")),
                }
            }
            _ => return Err(TxError::UnknownOption),
        }
        Ok(())
    }

    /// Build a configuration from key/value pairs on top of the defaults
    pub fn from_options<'a, I>(options: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut config = Self::default();
        for (name, value) in options {
            config.set_option(name, value)?;
        }
        config.validate()?;
        Ok(config)
    }
}

fn parse_num<T: core::str::FromStr>(value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| TxError::InvalidConfig("expected a number"))
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(TxError::InvalidConfig("expected a boolean")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(TxConfig::default().validate().is_ok());
    }

    #[test]
    fn test_from_options() {
        let config = TxConfig::from_options([
            ("max_q_depth", "3"),
            ("coalescing_enabled", "1"),
            ("ack_replace_threshold", " 5 "),
            ("stats_eviction", "host_first"),
        ])
        .unwrap();
        assert_eq!(config.max_q_depth, 3);
        assert!(config.coalescing_enabled);
        assert_eq!(config.ack_replace_threshold, 5);
        assert_eq!(config.stats_eviction, StatsEvictionPolicy::HostFilledFirst);
        assert!(!config.bundling_enabled);
    }

    #[test]
    fn test_unknown_option() {
        let mut config = TxConfig::default();
        assert_eq!(config.set_option("gDelAckEnable", "1"), Err(TxError::UnknownOption));
    }

    #[test]
    fn test_bad_values() {
        let mut config = TxConfig::default();
        assert!(matches!(
            config.set_option("max_q_depth", "lots"),
            Err(TxError::InvalidConfig(_))
        ));
        assert!(matches!(
            config.set_option("bundling_enabled", "maybe"),
            Err(TxError::InvalidConfig(_))
        ));
        assert!(TxConfig::from_options([("pool_capacity", "0")]).is_err());
    }
}
