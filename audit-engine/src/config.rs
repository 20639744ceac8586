// Operation logging configuration
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Background workers persisting async records
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// Bounded queue length per worker
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Records older than this many days are purged by the retention sweep
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    /// Seconds between retention sweeps, 0 disables the sweep
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
    /// Operations slower than this are reported as slow
    #[serde(default = "default_slow_threshold")]
    pub slow_operation_threshold_ms: i64,
}

fn default_worker_count() -> usize {
    4
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_retention_days() -> u32 {
    90
}

fn default_cleanup_interval() -> u64 {
    86_400
}

fn default_slow_threshold() -> i64 {
    5_000
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            queue_capacity: default_queue_capacity(),
            retention_days: default_retention_days(),
            cleanup_interval_secs: default_cleanup_interval(),
            slow_operation_threshold_ms: default_slow_threshold(),
        }
    }
}

impl AuditConfig {
    pub fn cleanup_interval(&self) -> Option<Duration> {
        (self.cleanup_interval_secs > 0).then(|| Duration::from_secs(self.cleanup_interval_secs))
    }
}
