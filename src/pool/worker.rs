//! Pool worker threads
//!
//! Each worker pulls jobs from the shared queue until it has run its task
//! quota, then starts its own replacement and exits. The replacement gets a
//! fresh [`WorkerContext`], so per-worker state never lives longer than the
//! quota allows.

use crate::cache::ComputationCache;
use crate::config::Settings;
use crate::error::{Result, XrdError};
use crossbeam_channel::Receiver;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

/// A unit of work queued on the pool
pub(crate) type Job = Box<dyn FnOnce(&WorkerContext) + Send + 'static>;

/// Per-worker state handed to every task
#[derive(Debug)]
pub struct WorkerContext {
    /// Slot of this worker in the pool, stable across recycling
    pub worker_id: usize,
    /// How many times this slot has been recycled
    pub generation: usize,
    pub settings: Arc<Settings>,
    pub cache: ComputationCache,
}

impl WorkerContext {
    /// Set up a fresh worker
    ///
    /// A cache that cannot be opened is replaced by an in-memory one, so a
    /// worker always starts.
    pub fn initialise(worker_id: usize, generation: usize, settings: Arc<Settings>) -> Self {
        let cache = ComputationCache::from_settings(&settings).unwrap_or_else(|e| {
            tracing::warn!(
                "Worker {} could not open the {} cache, using memory: {}",
                worker_id,
                settings.cache,
                e
            );
            ComputationCache::memory()
        });
        Self {
            worker_id,
            generation,
            settings,
            cache,
        }
    }
}

/// State shared between the pool handle and its workers
pub(crate) struct Shared {
    pub(crate) jobs: Receiver<Job>,
    pub(crate) settings: Arc<Settings>,
    pub(crate) max_tasks: usize,
    pub(crate) handles: Mutex<Vec<JoinHandle<()>>>,
    pub(crate) spawned: AtomicUsize,
    pub(crate) completed: AtomicUsize,
}

impl Shared {
    pub(crate) fn take_handle(&self) -> Option<JoinHandle<()>> {
        match self.handles.lock() {
            Ok(mut handles) => handles.pop(),
            Err(poisoned) => poisoned.into_inner().pop(),
        }
    }
}

/// Start a worker thread in `slot`
pub(crate) fn spawn_worker(shared: &Arc<Shared>, slot: usize, generation: usize) -> Result<()> {
    let worker_shared = Arc::clone(shared);
    let handle = std::thread::Builder::new()
        .name(format!("xrd-worker-{}", slot))
        .spawn(move || run_worker(worker_shared, slot, generation))
        .map_err(|e| XrdError::Pool(format!("Failed to start worker {}: {}", slot, e)))?;
    shared.spawned.fetch_add(1, Ordering::SeqCst);

    let mut handles = shared
        .handles
        .lock()
        .map_err(|_| XrdError::Pool("worker list lock poisoned".to_string()))?;
    handles.push(handle);
    Ok(())
}

fn run_worker(shared: Arc<Shared>, slot: usize, generation: usize) {
    let context = WorkerContext::initialise(slot, generation, Arc::clone(&shared.settings));
    tracing::trace!("Worker {} (generation {}) started", slot, generation);

    let mut done = 0usize;
    while done < shared.max_tasks {
        match shared.jobs.recv() {
            Ok(job) => {
                job(&context);
                done += 1;
                shared.completed.fetch_add(1, Ordering::SeqCst);
            }
            // Queue closed and drained
            Err(_) => {
                tracing::trace!("Worker {} exiting after {} tasks", slot, done);
                return;
            }
        }
    }

    tracing::debug!(
        "Worker {} ran {} tasks, starting generation {}",
        slot,
        done,
        generation + 1
    );
    if let Err(e) = spawn_worker(&shared, slot, generation + 1) {
        tracing::error!("Could not replace worker {}: {}", slot, e);
    }
}
