//! Cache Statistics Module
//!
//! Per-server counters in the shape memcached reports them.

use serde::{Deserialize, Serialize};

// == Cache Stats ==
/// Counters reported by a cache server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Keys requested by get commands
    pub cmd_get: u64,
    /// Store commands (set, add)
    pub cmd_set: u64,
    /// Requested keys that were found
    pub get_hits: u64,
    /// Requested keys that were missing or expired
    pub get_misses: u64,
    /// Items dropped to make room for new ones
    pub evictions: u64,
    /// Items currently stored
    pub curr_items: usize,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&mut self) {
        self.cmd_get += 1;
        self.get_hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.cmd_get += 1;
        self.get_misses += 1;
    }

    pub fn record_set(&mut self) {
        self.cmd_set += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn set_curr_items(&mut self, count: usize) {
        self.curr_items = count;
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = CacheStats::new();
        assert_eq!(stats, CacheStats::default());
    }

    #[test]
    fn test_get_counters_mixed() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        assert_eq!(stats.cmd_get, 4);
        assert_eq!(stats.get_hits, 3);
        assert_eq!(stats.get_misses, 1);
    }

    #[test]
    fn test_counters() {
        let mut stats = CacheStats::new();
        stats.record_set();
        stats.record_eviction();
        stats.set_curr_items(42);
        assert_eq!(stats.cmd_set, 1);
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.curr_items, 42);
    }

    #[test]
    fn test_stats_serialize() {
        let mut stats = CacheStats::new();
        stats.record_miss();
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["get_misses"], 1);
        assert_eq!(json["curr_items"], 0);
    }
}
