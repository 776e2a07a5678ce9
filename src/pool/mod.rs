//! Worker pool
//!
//! A fixed number of worker threads pulling jobs from a shared
//! `crossbeam-channel` queue. The pool is an explicit handle: it is created
//! once at startup and passed to whatever needs to submit work.
//!
//! # Lifecycle
//!
//! - Workers run with [`Settings::for_worker`] (no GUI, fetch-only file cache)
//! - After `max_tasks_per_worker` tasks a worker is replaced by a fresh one
//! - [`WorkerPool::close`] stops accepting work, lets queued tasks finish and
//!   joins every worker; dropping the pool does the same
//!
//! # Example
//!
//! ```ignore
//! let total = WorkerPool::scope(PoolConfig::from_settings(&settings), |pool| {
//!     let handle = pool.submit(|ctx| ctx.worker_id)?;
//!     handle.wait()
//! })?;
//! ```

mod worker;

pub use worker::WorkerContext;

use crate::config::Settings;
use crate::error::{Result, XrdError};
use crossbeam_channel::{Receiver, Sender};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use worker::{spawn_worker, Job, Shared};

/// Pool size and worker settings
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub workers: usize,
    pub max_tasks_per_worker: usize,
    /// Settings each worker is initialised with
    pub worker_settings: Settings,
}

impl PoolConfig {
    /// Pool sized from settings (one worker per CPU unless configured)
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            workers: settings.pool_workers.unwrap_or_else(num_cpus::get).max(1),
            max_tasks_per_worker: settings.max_tasks_per_worker,
            worker_settings: settings.for_worker(),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_max_tasks_per_worker(mut self, max_tasks: usize) -> Self {
        self.max_tasks_per_worker = max_tasks;
        self
    }
}

/// Pending result of a submitted task
#[derive(Debug)]
pub struct TaskHandle<R> {
    result: Receiver<Result<R>>,
}

impl<R> TaskHandle<R> {
    /// Block until the task has run
    pub fn wait(self) -> Result<R> {
        self.result
            .recv()
            .map_err(|_| XrdError::Pool("worker exited before finishing the task".to_string()))?
    }
}

/// Fixed-size pool of recycled worker threads
pub struct WorkerPool {
    sender: Option<Sender<Job>>,
    shared: Arc<Shared>,
    workers: usize,
}

impl WorkerPool {
    pub fn new(config: PoolConfig) -> Result<Self> {
        if config.workers == 0 {
            return Err(XrdError::Configuration(
                "worker pool needs at least one worker".to_string(),
            ));
        }
        if config.max_tasks_per_worker == 0 {
            return Err(XrdError::Configuration(
                "max_tasks_per_worker must be at least 1".to_string(),
            ));
        }

        let (sender, jobs) = crossbeam_channel::unbounded();
        let shared = Arc::new(Shared {
            jobs,
            settings: Arc::new(config.worker_settings),
            max_tasks: config.max_tasks_per_worker,
            handles: Mutex::new(Vec::with_capacity(config.workers)),
            spawned: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        });

        let mut pool = Self {
            sender: Some(sender),
            shared,
            workers: config.workers,
        };
        for slot in 0..config.workers {
            if let Err(e) = spawn_worker(&pool.shared, slot, 0) {
                pool.close();
                return Err(e);
            }
        }
        tracing::info!(
            "Started worker pool with {} workers ({} tasks per worker)",
            pool.workers,
            pool.shared.max_tasks
        );
        Ok(pool)
    }

    /// Run `f` with a pool that is closed and joined afterwards, whatever
    /// `f` returns
    pub fn scope<T>(config: PoolConfig, f: impl FnOnce(&WorkerPool) -> Result<T>) -> Result<T> {
        let mut pool = Self::new(config)?;
        let result = f(&pool);
        pool.close();
        result
    }

    /// Queue a task
    pub fn submit<F, R>(&self, f: F) -> Result<TaskHandle<R>>
    where
        F: FnOnce(&WorkerContext) -> R + Send + 'static,
        R: Send + 'static,
    {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| XrdError::Pool("pool is closed".to_string()))?;

        let (tx, rx) = crossbeam_channel::bounded(1);
        let job: Job = Box::new(move |ctx| {
            let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| f(ctx))).map_err(|panic| {
                XrdError::Pool(format!(
                    "task panicked on worker {}: {}",
                    ctx.worker_id,
                    panic_message(panic.as_ref())
                ))
            });
            let _ = tx.send(outcome);
        });
        sender
            .send(job)
            .map_err(|_| XrdError::Pool("pool is closed".to_string()))?;
        Ok(TaskHandle { result: rx })
    }

    /// Run `f` over every item and collect the results in input order
    pub fn map<T, R, F>(&self, items: Vec<T>, f: F) -> Result<Vec<R>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(&WorkerContext, T) -> R + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let handles = items
            .into_iter()
            .map(|item| {
                let f = Arc::clone(&f);
                self.submit(move |ctx| f(ctx, item))
            })
            .collect::<Result<Vec<_>>>()?;
        handles.into_iter().map(TaskHandle::wait).collect()
    }

    /// Stop accepting work, finish queued tasks and join every worker
    pub fn close(&mut self) {
        if self.sender.take().is_none() {
            return;
        }
        tracing::info!("Closing worker pool ...");
        // Workers that hit their quota while draining add their successor
        // before exiting, so keep joining until the list stays empty.
        while let Some(handle) = self.shared.take_handle() {
            if handle.join().is_err() {
                tracing::error!("A pool worker panicked");
            }
        }
        tracing::debug!(
            "Worker pool closed after {} tasks",
            self.shared.completed.load(Ordering::SeqCst)
        );
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_none()
    }

    /// Configured number of concurrent workers
    pub fn size(&self) -> usize {
        self.workers
    }

    /// Worker threads started so far, recycled replacements included
    pub fn workers_spawned(&self) -> usize {
        self.shared.spawned.load(Ordering::SeqCst)
    }

    pub fn tasks_completed(&self) -> usize {
        self.shared.completed.load(Ordering::SeqCst)
    }

    /// Settings workers run with
    pub fn worker_settings(&self) -> &Settings {
        &self.shared.settings
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers)
            .field("closed", &self.is_closed())
            .field("spawned", &self.workers_spawned())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
