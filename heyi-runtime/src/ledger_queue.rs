//! Supervised background queue for ledger writes
//!
//! Writes are accepted without waiting and each one runs as its own task, so a
//! failing or panicking write never reaches the scan path. Writes are not
//! ordered with respect to each other.

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tracing::{debug, error, warn};

use heyi_signals::{LedgerEntry, SharedLedger, SignalError};

/// Fire-and-forget delivery of ledger entries
pub struct LedgerQueue {
    tx: Mutex<Option<mpsc::UnboundedSender<LedgerEntry>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl LedgerQueue {
    /// Start the queue worker. Must be called inside a tokio runtime.
    pub fn spawn(ledger: SharedLedger) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(ledger, rx));

        Self {
            tx: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Queue an entry; never waits
    pub fn enqueue(&self, entry: LedgerEntry) {
        let guard = self.tx.lock();
        let Some(tx) = guard.as_ref() else {
            warn!("Ledger queue is shut down, dropping {} entry", entry.kind.as_str());
            return;
        };
        if let Err(e) = tx.send(entry) {
            warn!("Ledger worker gone, dropping {} entry", e.0.kind.as_str());
        }
    }

    /// Stop accepting entries and wait for pending writes to finish
    pub async fn shutdown(&self) {
        self.tx.lock().take();
        let worker = self.worker.lock().take();

        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                error!("Ledger worker failed: {}", e);
            }
        }
    }
}

async fn run_worker(ledger: SharedLedger, mut rx: mpsc::UnboundedReceiver<LedgerEntry>) {
    let mut writes = JoinSet::new();

    loop {
        tokio::select! {
            entry = rx.recv() => {
                let Some(entry) = entry else { break };
                let ledger = ledger.clone();
                writes.spawn(async move {
                    let written = ledger.record(&entry).await;
                    written.map(|_| entry)
                });
            }
            Some(done) = writes.join_next(), if !writes.is_empty() => log_write(done),
        }
    }

    while let Some(done) = writes.join_next().await {
        log_write(done);
    }
    debug!("Ledger worker drained");
}

fn log_write(done: Result<Result<LedgerEntry, SignalError>, JoinError>) {
    match done {
        Ok(Ok(entry)) => debug!("{} scan saved for {}", entry.kind.as_str(), entry.subject),
        Ok(Err(e)) => error!("Failed to save scan to ledger: {}", e),
        Err(e) => error!("Ledger write task panicked: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use heyi_core::Score;
    use heyi_signals::ScanLedger;
    use std::sync::Arc;

    #[derive(Default)]
    struct RecordingLedger {
        entries: Mutex<Vec<LedgerEntry>>,
    }

    #[async_trait]
    impl ScanLedger for RecordingLedger {
        async fn record(&self, entry: &LedgerEntry) -> Result<(), SignalError> {
            if entry.subject.contains("panic") {
                panic!("ledger exploded");
            }
            if entry.subject.contains("fail") {
                return Err(SignalError::Ledger("503".to_string()));
            }
            self.entries.lock().push(entry.clone());
            Ok(())
        }
    }

    fn entry(subject: &str) -> LedgerEntry {
        LedgerEntry::image(subject, Score::Value(50.0)).unwrap()
    }

    #[tokio::test]
    async fn test_shutdown_drains_pending_writes() {
        let ledger = Arc::new(RecordingLedger::default());
        let queue = LedgerQueue::spawn(ledger.clone());

        for i in 0..5 {
            queue.enqueue(entry(&format!("https://cdn.example.com/{}.png", i)));
        }
        queue.shutdown().await;

        assert_eq!(ledger.entries.lock().len(), 5);
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let ledger = Arc::new(RecordingLedger::default());
        let queue = LedgerQueue::spawn(ledger.clone());

        queue.enqueue(entry("https://cdn.example.com/fail.png"));
        queue.enqueue(entry("https://cdn.example.com/panic.png"));
        queue.enqueue(entry("https://cdn.example.com/ok.png"));
        queue.shutdown().await;

        let entries = ledger.entries.lock();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].subject, "https://cdn.example.com/ok.png");
    }

    #[tokio::test]
    async fn test_enqueue_after_shutdown_is_dropped() {
        let ledger = Arc::new(RecordingLedger::default());
        let queue = LedgerQueue::spawn(ledger.clone());
        queue.shutdown().await;

        queue.enqueue(entry("https://cdn.example.com/late.png"));
        queue.shutdown().await;
        assert!(ledger.entries.lock().is_empty());
    }
}
