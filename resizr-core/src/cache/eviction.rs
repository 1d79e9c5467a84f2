//! Background deletion of evicted artifacts
//!
//! Evicted keys go through a bounded channel to a single consumer thread, which
//! serializes all deletions and so limits concurrent disk I/O during mass
//! eviction. Producers never block: if the queue is somehow full the artifacts
//! are deleted inline instead.
//!
//! On shutdown the sender is dropped and the worker drains what is already
//! queued before exiting, so pending deletions are flushed, not abandoned.

use super::store::ArtifactStore;
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

pub struct DeletionQueue {
    sender: Mutex<Option<SyncSender<String>>>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
    store: Arc<ArtifactStore>,
}

impl DeletionQueue {
    /// Spawn the consumer. `capacity` should be at least the storage capacity + 1.
    pub fn start(store: Arc<ArtifactStore>, capacity: usize) -> std::io::Result<Self> {
        let (sender, receiver) = mpsc::sync_channel(capacity.max(1));

        let worker_store = Arc::clone(&store);
        let worker = thread::Builder::new()
            .name("resizr-evict".to_string())
            .spawn(move || Self::worker_loop(worker_store, receiver))?;

        Ok(Self { sender: Mutex::new(Some(sender)), worker: Mutex::new(Some(worker)), store })
    }

    /// Queue deletion of `key`'s artifacts
    pub fn enqueue(&self, key: String) {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let rejected = match sender.as_ref() {
            Some(tx) => match tx.try_send(key) {
                Ok(()) => None,
                Err(TrySendError::Full(key)) => {
                    log::warn!("deletion queue full, deleting {} inline", key);
                    Some(key)
                }
                Err(TrySendError::Disconnected(key)) => Some(key),
            },
            None => Some(key),
        };
        drop(sender);

        if let Some(key) = rejected {
            Self::delete(&self.store, &key);
        }
    }

    /// Stop accepting work, flush the queue and join the worker
    pub fn shutdown(&self) {
        self.sender.lock().unwrap_or_else(PoisonError::into_inner).take();

        let worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = worker {
            if handle.join().is_err() {
                log::error!("deletion worker for {} panicked", self.store.root().display());
            }
        }
    }

    fn worker_loop(store: Arc<ArtifactStore>, receiver: Receiver<String>) {
        log::debug!("deletion worker started for {}", store.root().display());
        for key in receiver {
            Self::delete(&store, &key);
        }
        log::debug!("deletion worker stopped for {}", store.root().display());
    }

    fn delete(store: &ArtifactStore, key: &str) {
        log::debug!("deleting cached artifacts {}", key);
        if let Err(e) = store.remove(key) {
            log::error!("{}", e);
        }
    }
}

impl Drop for DeletionQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}
