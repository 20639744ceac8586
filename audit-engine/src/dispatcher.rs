//! Sync and async persistence of log entries
//!
//! Both modes share one entry point, [`LogDispatcher::persist`]. The async
//! path hands entries to a fixed pool of workers, each owning a bounded
//! queue. Entries are routed by correlation id so all records of one
//! request land on the same worker and keep their submission order.
//!
//! Persistence failures never reach the caller. They are reported through
//! `tracing`, and entries that cannot be queued are written in full to the
//! `audit_fallback` target before being dropped.

use crate::config::AuditConfig;
use crate::entry::LogEntry;
use crate::storage::LogStore;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Target receiving entries that could not be queued
pub const FALLBACK_TARGET: &str = "audit_fallback";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// Persist before returning to the caller
    Sync,
    /// Queue for a background worker and return immediately
    #[default]
    Async,
}

enum Job {
    Persist(LogEntry),
    Flush(oneshot::Sender<()>),
}

pub struct LogDispatcher {
    store: Arc<dyn LogStore>,
    queues: RwLock<Vec<mpsc::Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    round_robin: AtomicUsize,
}

impl LogDispatcher {
    /// Start the worker pool. Must be called from within a Tokio runtime.
    pub fn new(store: Arc<dyn LogStore>, config: &AuditConfig) -> Self {
        let worker_count = config.worker_count.max(1);
        let capacity = config.queue_capacity.max(1);

        let mut queues = Vec::with_capacity(worker_count);
        let mut workers = Vec::with_capacity(worker_count);
        for index in 0..worker_count {
            let (tx, rx) = mpsc::channel(capacity);
            queues.push(tx);
            workers.push(tokio::spawn(run_worker(index, Arc::clone(&store), rx)));
        }
        debug!(worker_count, capacity, "Operation log dispatcher started");

        Self {
            store,
            queues: RwLock::new(queues),
            workers: Mutex::new(workers),
            round_robin: AtomicUsize::new(0),
        }
    }

    pub fn store(&self) -> &Arc<dyn LogStore> {
        &self.store
    }

    /// Persist an entry through the requested channel. Never fails.
    pub async fn persist(&self, entry: LogEntry, mode: DispatchMode) {
        match mode {
            DispatchMode::Sync => store_entry(self.store.as_ref(), entry).await,
            DispatchMode::Async => self.enqueue(entry),
        }
    }

    fn shard(&self, entry: &LogEntry, shards: usize) -> Option<usize> {
        match &entry.correlation_id {
            Some(correlation_id) => {
                let mut hasher = DefaultHasher::new();
                correlation_id.hash(&mut hasher);
                hasher
                    .finish()
                    .checked_rem(shards as u64)
                    .and_then(|index| usize::try_from(index).ok())
            }
            None => self
                .round_robin
                .fetch_add(1, Ordering::Relaxed)
                .checked_rem(shards),
        }
    }

    fn enqueue(&self, entry: LogEntry) {
        let sender = {
            let queues = self.queues.read();
            self.shard(&entry, queues.len())
                .and_then(|index| queues.get(index).cloned())
        };
        let Some(sender) = sender else {
            fallback(&entry, "dispatcher shut down");
            return;
        };

        match sender.try_send(Job::Persist(entry)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(Job::Persist(entry))) => {
                fallback(&entry, "queue full");
            }
            Err(mpsc::error::TrySendError::Closed(Job::Persist(entry))) => {
                fallback(&entry, "worker stopped");
            }
            Err(_) => {}
        }
    }

    /// Wait until every entry queued before this call has been handled
    pub async fn flush(&self) {
        let senders: Vec<mpsc::Sender<Job>> = self.queues.read().clone();
        let mut acks = Vec::with_capacity(senders.len());
        for sender in senders {
            let (tx, rx) = oneshot::channel();
            if sender.send(Job::Flush(tx)).await.is_ok() {
                acks.push(rx);
            }
        }
        for ack in acks {
            let _ = ack.await;
        }
    }

    /// Drain the queues and stop the workers. Later async entries fall back.
    pub async fn shutdown(&self) {
        self.flush().await;
        self.queues.write().clear();

        let workers = std::mem::take(&mut *self.workers.lock());
        for worker in workers {
            if let Err(e) = worker.await {
                warn!(error = %e, "Operation log worker ended abnormally");
            }
        }
        debug!("Operation log dispatcher stopped");
    }
}

async fn run_worker(index: usize, store: Arc<dyn LogStore>, mut rx: mpsc::Receiver<Job>) {
    while let Some(job) = rx.recv().await {
        match job {
            Job::Persist(entry) => store_entry(store.as_ref(), entry).await,
            Job::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
    debug!(worker = index, "Operation log worker stopped");
}

async fn store_entry(store: &dyn LogStore, entry: LogEntry) {
    let operation = entry.operation.clone();
    let correlation_id = entry.correlation_id.clone();
    if let Err(e) = store.append(entry).await {
        error!(
            operation = %operation,
            correlation_id = ?correlation_id,
            error = %e,
            "Failed to save operation log"
        );
    }
}

fn fallback(entry: &LogEntry, reason: &str) {
    let record = serde_json::to_string(entry).unwrap_or_else(|e| e.to_string());
    warn!(
        target: FALLBACK_TARGET,
        reason,
        operation = %entry.operation,
        status = %entry.status,
        user_id = %entry.user_id,
        correlation_id = ?entry.correlation_id,
        record = %record,
        "Dropped operation log record"
    );
}
