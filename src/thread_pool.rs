//! This module contains the api and worker logic for the thread pool.

use alloc::format;
use core::fmt;
use core::mem;
use core::ptr::NonNull;
use std::sync::PoisonError;

use tracing::debug;
use tracing::trace;
use tracing::trace_span;

use crate::batch::Batch;
use crate::error::SpawnError;
use crate::latch::CountLatch;
use crate::platform::*;
use crate::unwind::AbortOnDrop;

// -----------------------------------------------------------------------------
// Configuration

/// The number of worker threads a pool may spawn when no cap is configured.
pub const DEFAULT_THREADS_MAX: u32 = 16;

/// The stack size requested for each worker thread when none is configured.
pub const DEFAULT_STACK_SIZE: usize = 16 * 1024 * 1024;

/// Tunables for a [`ThreadPool`].
///
/// A value of zero in either field means "use the default", so
/// `Config::default()` gives a pool of up to [`DEFAULT_THREADS_MAX`] threads
/// with [`DEFAULT_STACK_SIZE`] byte stacks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Config {
    /// The maximum number of worker threads the pool will spawn.
    pub threads_max: u32,
    /// The stack size, in bytes, requested for each worker thread.
    pub stack_size: usize,
}

impl Config {
    /// Creates a configuration with every field left at its default.
    pub const fn new() -> Config {
        Config {
            threads_max: 0,
            stack_size: 0,
        }
    }

    /// Sets the maximum number of worker threads.
    pub const fn threads_max(mut self, threads_max: u32) -> Config {
        self.threads_max = threads_max;
        self
    }

    /// Sets the stack size of worker threads, in bytes.
    pub const fn stack_size(mut self, stack_size: usize) -> Config {
        self.stack_size = stack_size;
        self
    }

    /// Replaces every unset (zero) field with its default.
    pub const fn normalize(mut self) -> Config {
        if self.threads_max == 0 {
            self.threads_max = DEFAULT_THREADS_MAX;
        }
        if self.stack_size == 0 {
            self.stack_size = DEFAULT_STACK_SIZE;
        }
        self
    }
}

// -----------------------------------------------------------------------------
// Thread pool types

/// A pool of lazily spawned worker threads which execute [`Batch`]es of
/// [`Task`](crate::Task)s.
///
/// # Creating Thread Pools
///
/// Pools are created with [`ThreadPool::scope`], which hands the closure a
/// reference to a fresh pool and tears the pool down when the closure returns.
/// A fresh pool has no threads at all.
///
/// ```
/// # #![cfg(not(loom))]
/// use core::sync::atomic::{AtomicBool, Ordering};
/// use lazypool::{Batch, Config, Task, ThreadPool};
///
/// let ran = AtomicBool::new(false);
/// let mut task = Task::new(|| ran.store(true, Ordering::Relaxed));
/// let batch = Batch::from_task(&mut task);
///
/// ThreadPool::scope(Config::new().threads_max(8), |pool| {
///     assert_eq!(pool.threads(), 0);
///     pool.schedule(batch).unwrap();
/// });
///
/// assert!(ran.load(Ordering::Relaxed));
/// ```
///
/// # Spawning Threads
///
/// Each call to [`ThreadPool::schedule`] spawns at most one new worker, and
/// only if no worker is currently idle and the pool is below its configured
/// thread cap. A large batch submitted in one call therefore starts out on a
/// single thread; the pool grows across subsequent calls. Workers are detached
/// and never shrink away while the pool is open.
///
/// # Tearing Down
///
/// Returning from the closure passed to `scope` blocks until every queued
/// task has run and every worker has exited. There is no cancellation: if a
/// task never returns, neither does `scope`.
pub struct ThreadPool<'env> {
    config: Config,
    /// The number of live worker threads.
    threads_count: CountLatch,
    /// The number of workers waiting on `work_is_ready`.
    threads_idle: AtomicU32,
    state: Mutex<ThreadPoolState<'env>>,
    /// Signalled when work is queued or the pool is shutting down.
    work_is_ready: Condvar,
}

struct ThreadPoolState<'env> {
    /// The shared work queue.
    queue: Batch<'env>,
    /// Set once, when the pool starts shutting down.
    done: bool,
}

// -----------------------------------------------------------------------------
// Thread pool creation and teardown

impl<'env> ThreadPool<'env> {
    /// Creates a thread pool with the given configuration and passes it to
    /// `f`. When `f` returns, this blocks until every task scheduled on the
    /// pool has run and every worker thread has exited, then returns the
    /// result of `f`.
    ///
    /// Tasks scheduled on the pool must outlive `'env`, which is to say they
    /// must be created outside the closure. The same holds if `f` panics: the
    /// pool is still drained before the panic continues to unwind.
    pub fn scope<F, R>(config: Config, f: F) -> R
    where
        F: FnOnce(&ThreadPool<'env>) -> R,
    {
        let thread_pool = ThreadPool::new(config);
        let shutdown = ShutdownOnDrop(&thread_pool);
        let result = f(&thread_pool);
        drop(shutdown);
        result
    }

    /// Creates a new thread pool. No threads are spawned.
    fn new(config: Config) -> ThreadPool<'env> {
        let config = config.normalize();
        debug!(
            "creating thread pool with up to {} thread(s) and {} byte stacks",
            config.threads_max, config.stack_size
        );
        ThreadPool {
            config,
            threads_count: CountLatch::new(),
            threads_idle: AtomicU32::new(0),
            state: Mutex::new(ThreadPoolState {
                queue: Batch::new(),
                done: false,
            }),
            work_is_ready: Condvar::new(),
        }
    }

    /// Stops the pool, blocking until all queued work is done and all workers
    /// have exited.
    #[cold]
    fn shutdown(&self) {
        debug!("shutting down thread pool");

        self.lock_state().done = true;

        // Wake every idle worker so that it sees the `done` flag. Busy workers
        // will see it the next time they find the queue empty.
        self.work_is_ready.notify_all();

        trace!("waiting for {} worker(s) to exit", self.threads_count.get());
        self.threads_count.wait();

        // The last worker counts down while holding the lock. Taking the lock
        // once more ensures it has completely let go of the pool.
        drop(self.lock_state());

        debug!("thread pool shut down");
    }

    /// Returns the configuration of the pool, with defaults filled in.
    pub fn config(&self) -> Config {
        self.config
    }

    /// Returns the number of live worker threads. This is advisory: the value
    /// may be out of date by the time it is read.
    pub fn threads(&self) -> u32 {
        self.threads_count.get()
    }

    /// Returns the number of worker threads currently waiting for work. This
    /// is advisory: the value may be out of date by the time it is read.
    pub fn idle_threads(&self) -> u32 {
        self.threads_idle.load(Ordering::Relaxed)
    }

    fn lock_state(&self) -> MutexGuard<'_, ThreadPoolState<'env>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Shuts down a thread pool when dropped.
struct ShutdownOnDrop<'a, 'env>(&'a ThreadPool<'env>);

impl Drop for ShutdownOnDrop<'_, '_> {
    fn drop(&mut self) {
        self.0.shutdown();
    }
}

impl fmt::Debug for ThreadPool<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadPool")
            .field("config", &self.config)
            .field("threads", &self.threads())
            .field("idle_threads", &self.idle_threads())
            .finish_non_exhaustive()
    }
}

// -----------------------------------------------------------------------------
// Thread pool scheduling api

impl<'env> ThreadPool<'env> {
    /// Queues every task in `batch` for execution on the pool.
    ///
    /// If no worker is idle and the pool is below its thread cap, one new
    /// worker is spawned. Then, if any worker is idle, exactly one is woken;
    /// busy workers pick up the rest of the queue when they finish their
    /// current task.
    ///
    /// Scheduling an empty batch does nothing.
    ///
    /// # Errors
    ///
    /// Returns a [`SpawnError`] if a new worker was needed and the operating
    /// system failed to create it. The batch has been queued regardless, and
    /// will be run by existing workers or by the worker spawned on the next
    /// successful call.
    pub fn schedule(&self, batch: Batch<'env>) -> Result<(), SpawnError> {
        if batch.is_empty() {
            return Ok(());
        }

        trace!("scheduling batch of {} task(s)", batch.len());
        self.lock_state().queue.push(batch);

        let mut idle = self.threads_idle.load(Ordering::Relaxed);
        if idle == 0 && self.threads_count.get() < self.config.threads_max {
            self.spawn_worker()?;
            // The new worker will either find the work on its first pass
            // through the queue or be waiting by the time we signal.
            idle += 1;
        }

        if idle > 0 {
            self.work_is_ready.notify_one();
        }

        Ok(())
    }

    /// Spawns a detached worker thread.
    #[cold]
    fn spawn_worker(&self) -> Result<(), SpawnError> {
        let index = self.threads_count.get();
        debug!("spawning worker with index {}", index);

        // Count the worker before it starts, so that teardown can never observe
        // a running worker which is not yet counted.
        self.threads_count.increment();

        let thread_pool = PoolPtr(NonNull::from(self).cast());
        let spawned = ThreadBuilder::new()
            .name(format!("lazypool worker {index}"))
            .stack_size(self.config.stack_size)
            .spawn(move || worker_main(thread_pool, index));

        match spawned {
            // Dropping the handle detaches the thread.
            Ok(_handle) => Ok(()),
            Err(err) => {
                debug!("failed to spawn worker: {}", err);
                self.threads_count.count_down();
                Err(SpawnError::new(err))
            }
        }
    }
}

// -----------------------------------------------------------------------------
// Main worker loop

/// A type-erased pointer to the thread pool that owns a worker.
struct PoolPtr(NonNull<()>);

// SAFETY: The pointer is only ever turned into a shared reference, and
// `ThreadPool` is `Sync`.
unsafe impl Send for PoolPtr {}

/// The entry point of each worker thread.
fn worker_main(thread_pool: PoolPtr, index: u32) {
    let span = trace_span!("worker", index);
    let _enter = span.enter();

    // SAFETY: The pointer was created from a reference in `spawn_worker`. The
    // pool cannot be dropped until `shutdown` returns, and `shutdown` waits
    // until this worker has counted down and released the lock. The guard
    // returned by `run` is the last thing to touch the pool.
    let thread_pool = unsafe { thread_pool.0.cast::<ThreadPool<'_>>().as_ref() };
    let state = thread_pool.run();
    drop(state);
}

impl<'env> ThreadPool<'env> {
    /// The main loop for a worker thread. It pops one task at a time off the
    /// shared queue and runs it with the lock released, sleeping whenever the
    /// queue is empty.
    ///
    /// Returns once the pool is shutting down and the queue is empty. The
    /// worker has already been counted out, and the returned guard must be
    /// the final access this thread makes to the pool.
    fn run(&self) -> MutexGuard<'_, ThreadPoolState<'env>> {
        trace!("starting worker");

        let mut state = self.lock_state();
        loop {
            if state.queue.is_empty() {
                if state.done {
                    trace!("exiting worker");
                    self.threads_count.count_down();
                    return state;
                }

                trace!("waiting for work");
                self.threads_idle.fetch_add(1, Ordering::Relaxed);
                state = self
                    .work_is_ready
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
                self.threads_idle.fetch_sub(1, Ordering::Relaxed);
            }

            let task = state.queue.pop_front();
            drop(state);

            if let Some(task) = task {
                // A task must not unwind through the worker, or the worker
                // would never be counted out.
                let abort_guard = AbortOnDrop;
                task.run();
                mem::forget(abort_guard);
            }

            state = self.lock_state();
        }
    }
}

// -----------------------------------------------------------------------------
// Tests
