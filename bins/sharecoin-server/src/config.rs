//! Server configuration loaded from environment variables.

use std::fmt;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use sharecoin_sim::constants::{
    BLOCK_TIME_HISTORY, DISCOVERY_INTERVAL, SETTLEMENT_INTERVAL,
};

#[derive(Clone)]
pub struct Config {
    /// JSON-RPC endpoint of the chain hosting the ShareCoin contract.
    pub rpc_url: String,
    /// Hex private key that signs settlement transactions.
    pub private_key: String,
    /// ShareCoin contract address.
    pub contract_address: String,
    /// Address to bind the HTTP server.
    pub bind_addr: String,
    pub discovery_interval: Duration,
    pub settlement_interval: Duration,
    /// Upper bound on any single contract call.
    pub rpc_timeout: Duration,
    /// Discovery timestamps kept for the average block time.
    pub history_capacity: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup so tests need not touch the
    /// process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let rpc_url = lookup("SHARECOIN_RPC_URL")
            .unwrap_or_else(|| "http://127.0.0.1:8545".to_string());

        let private_key =
            lookup("SHARECOIN_PRIVATE_KEY").context("SHARECOIN_PRIVATE_KEY is required")?;

        let contract_address = lookup("SHARECOIN_CONTRACT_ADDRESS")
            .context("SHARECOIN_CONTRACT_ADDRESS is required")?;

        let bind_addr = lookup("SHARECOIN_BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3001".to_string());

        let discovery_secs = parse_u64(
            &lookup,
            "SHARECOIN_DISCOVERY_INTERVAL_SECS",
            DISCOVERY_INTERVAL.as_secs(),
        )?;
        let settlement_secs = parse_u64(
            &lookup,
            "SHARECOIN_SETTLEMENT_INTERVAL_SECS",
            SETTLEMENT_INTERVAL.as_secs(),
        )?;
        let timeout_secs = parse_u64(&lookup, "SHARECOIN_RPC_TIMEOUT_SECS", 20)?;
        let history_capacity =
            parse_u64(&lookup, "SHARECOIN_HISTORY_CAPACITY", BLOCK_TIME_HISTORY as u64)? as usize;

        if discovery_secs == 0 || settlement_secs == 0 || timeout_secs == 0 {
            bail!("scheduler intervals and RPC timeout must be greater than zero");
        }

        Ok(Config {
            rpc_url,
            private_key,
            contract_address,
            bind_addr,
            discovery_interval: Duration::from_secs(discovery_secs),
            settlement_interval: Duration::from_secs(settlement_secs),
            rpc_timeout: Duration::from_secs(timeout_secs),
            history_capacity,
        })
    }
}

fn parse_u64(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> Result<u64> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} must be a non-negative integer")),
        None => Ok(default),
    }
}

// Keep the signing key out of logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("rpc_url", &self.rpc_url)
            .field("private_key", &"<redacted>")
            .field("contract_address", &self.contract_address)
            .field("bind_addr", &self.bind_addr)
            .field("discovery_interval", &self.discovery_interval)
            .field("settlement_interval", &self.settlement_interval)
            .field("rpc_timeout", &self.rpc_timeout)
            .field("history_capacity", &self.history_capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("SHARECOIN_PRIVATE_KEY", "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d"),
        ("SHARECOIN_CONTRACT_ADDRESS", "0x66109699EaebC93c9Df7ce3c3342AEbC009E2896"),
    ];

    #[test]
    fn defaults() {
        let cfg = Config::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(cfg.rpc_url, "http://127.0.0.1:8545");
        assert_eq!(cfg.bind_addr, "0.0.0.0:3001");
        assert_eq!(cfg.discovery_interval, Duration::from_secs(10));
        assert_eq!(cfg.settlement_interval, Duration::from_secs(900));
        assert_eq!(cfg.rpc_timeout, Duration::from_secs(20));
        assert_eq!(cfg.history_capacity, 50);
    }

    #[test]
    fn private_key_required() {
        let err = Config::from_lookup(lookup(&REQUIRED[1..])).unwrap_err();
        assert!(err.to_string().contains("SHARECOIN_PRIVATE_KEY"));
    }

    #[test]
    fn contract_address_required() {
        let err = Config::from_lookup(lookup(&REQUIRED[..1])).unwrap_err();
        assert!(err.to_string().contains("SHARECOIN_CONTRACT_ADDRESS"));
    }

    #[test]
    fn overrides_are_parsed() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("SHARECOIN_DISCOVERY_INTERVAL_SECS", "2"));
        pairs.push(("SHARECOIN_SETTLEMENT_INTERVAL_SECS", " 60 "));
        pairs.push(("SHARECOIN_BIND_ADDR", "127.0.0.1:9000"));
        let cfg = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(cfg.discovery_interval, Duration::from_secs(2));
        assert_eq!(cfg.settlement_interval, Duration::from_secs(60));
        assert_eq!(cfg.bind_addr, "127.0.0.1:9000");
    }

    #[test]
    fn garbage_and_zero_intervals_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("SHARECOIN_DISCOVERY_INTERVAL_SECS", "soon"));
        assert!(Config::from_lookup(lookup(&pairs)).is_err());

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("SHARECOIN_SETTLEMENT_INTERVAL_SECS", "0"));
        assert!(Config::from_lookup(lookup(&pairs)).is_err());
    }

    #[test]
    fn debug_redacts_key() {
        let cfg = Config::from_lookup(lookup(&REQUIRED)).unwrap();
        let debug = format!("{cfg:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("59c6995e"));
    }
}
