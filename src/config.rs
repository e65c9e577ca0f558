use std::time::Duration;

use crc32fast::Hasher;
use once_cell::sync::Lazy;

use crate::entity::{HIERARCHY_TABLE, NODE_TABLE};

static DEFAULT_LOCK_KEY: Lazy<AdvisoryLockKey> =
    Lazy::new(|| AdvisoryLockKey::derived_from(NODE_TABLE, HIERARCHY_TABLE));

/// Static configuration for the closure-table engine: how mutating
/// operations serialize, and how long they wait before giving up.
#[derive(Clone, Debug)]
pub struct ClosureTableConfig {
    advisory_lock_strategy: AdvisoryLockStrategy,
    lock_wait_timeout: Duration,
    lock_retry_interval: Duration,
}

impl ClosureTableConfig {
    pub fn new() -> Self {
        Self {
            advisory_lock_strategy: AdvisoryLockStrategy::Namespaced(DEFAULT_LOCK_KEY.clone()),
            lock_wait_timeout: Duration::from_secs(5),
            lock_retry_interval: Duration::from_millis(50),
        }
    }

    pub fn with_advisory_lock_strategy(mut self, strategy: AdvisoryLockStrategy) -> Self {
        self.advisory_lock_strategy = strategy;
        self
    }

    /// Upper bound on the total time a mutating operation may spend waiting
    /// for the hierarchy lock before it fails with `Contention`.
    pub fn with_lock_wait_timeout(mut self, timeout: Duration) -> Self {
        self.lock_wait_timeout = timeout;
        self
    }

    pub fn with_lock_retry_interval(mut self, interval: Duration) -> Self {
        self.lock_retry_interval = interval;
        self
    }

    pub fn advisory_lock_strategy(&self) -> &AdvisoryLockStrategy {
        &self.advisory_lock_strategy
    }

    pub fn lock_wait_timeout(&self) -> Duration {
        self.lock_wait_timeout
    }

    pub fn lock_retry_interval(&self) -> Duration {
        self.lock_retry_interval
    }
}

impl Default for ClosureTableConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Key used for PostgreSQL advisory locks.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct AdvisoryLockKey(String);

impl AdvisoryLockKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    fn derived_from(node_table: &str, hierarchy_table: &str) -> Self {
        let mut hasher = Hasher::new();
        hasher.update(node_table.as_bytes());
        hasher.update(b"/");
        hasher.update(hierarchy_table.as_bytes());
        let crc = hasher.finalize();
        Self(format!(
            "closure-table::{node_table}::{hierarchy_table}::{crc:x}"
        ))
    }
}

/// Configuration describing how to acquire advisory locks.
///
/// The lock only applies on PostgreSQL; SQLite serializes writing
/// transactions itself, so the strategy is ignored there.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AdvisoryLockStrategy {
    Disabled,
    Namespaced(AdvisoryLockKey),
}

impl AdvisoryLockStrategy {
    pub fn key(&self) -> Option<&AdvisoryLockKey> {
        match self {
            AdvisoryLockStrategy::Disabled => None,
            AdvisoryLockStrategy::Namespaced(key) => Some(key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_lock_key_is_namespaced_by_both_tables() {
        let config = ClosureTableConfig::default();
        let key = config
            .advisory_lock_strategy()
            .key()
            .expect("default strategy carries a key");
        assert!(key
            .as_str()
            .starts_with("closure-table::nodes::node_hierarchies::"));
    }

    #[test]
    fn derived_keys_are_stable() {
        let a = AdvisoryLockKey::derived_from("nodes", "node_hierarchies");
        let b = AdvisoryLockKey::derived_from("nodes", "node_hierarchies");
        assert_eq!(a, b);
    }
}
