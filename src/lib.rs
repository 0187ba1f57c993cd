//! A lazily-spawning thread pool with allocation-free batch scheduling.
//!
//! `lazypool` runs caller-supplied units of work on a small pool of OS
//! threads. Work is submitted as a [`Batch`] of [`Task`]s: an intrusive,
//! singly-linked list threaded through storage that the caller owns. Building
//! a batch, merging two batches and handing a batch to the pool are all O(1)
//! and never touch the allocator.
//!
//! Threads are spawned lazily. A [`ThreadPool`] starts with no threads at all,
//! and [`ThreadPool::schedule`] grows it by at most one worker per call, and
//! only when no worker is idle and the configured cap has not been reached.
//!
//! ```
//! # #![cfg(not(loom))]
//! use core::sync::atomic::{AtomicUsize, Ordering};
//! use lazypool::{Batch, Config, Task, ThreadPool};
//!
//! let counter = AtomicUsize::new(0);
//! let mut tasks: Vec<_> = (0..64)
//!     .map(|_| Task::new(|| {
//!         counter.fetch_add(1, Ordering::Relaxed);
//!     }))
//!     .collect();
//!
//! let batch: Batch<'_> = tasks.iter_mut().collect();
//!
//! ThreadPool::scope(Config::new().threads_max(4), |pool| {
//!     pool.schedule(batch).unwrap();
//! });
//!
//! // Leaving the scope waits for every queued task to run.
//! assert_eq!(counter.load(Ordering::Relaxed), 64);
//! ```
//!
//! # Task storage
//!
//! Tasks are never owned by the pool. A batch holds an exclusive borrow of
//! each of its tasks, and the pool can only be reached from inside
//! [`ThreadPool::scope`], which tears the pool down (waiting for every queued
//! and running task) before it returns. Together these make it impossible to
//! free, move or reuse a task while a worker may still run it.

#![no_std]

// -----------------------------------------------------------------------------
// Boilerplate for building without the standard library

extern crate alloc;
extern crate std;

// -----------------------------------------------------------------------------
// Modules

mod batch;
mod compile_fail;
mod error;
mod latch;
mod task;
mod thread_pool;
mod unwind;

// -----------------------------------------------------------------------------
// Top-level exports

pub use batch::Batch;
pub use error::SpawnError;
pub use task::Task;
pub use thread_pool::Config;
pub use thread_pool::DEFAULT_STACK_SIZE;
pub use thread_pool::DEFAULT_THREADS_MAX;
pub use thread_pool::ThreadPool;

// -----------------------------------------------------------------------------
// Platform Support

// This crate uses `loom` for testing, which requires mocking all of the core
// threading primitives (`Mutex` and the like).
//
// To make things a bit simpler, we re-export all the important types in the
// `platform` module.

#[cfg(not(loom))]
mod platform {

    // Core exports

    pub use core::sync::atomic::AtomicU32;
    pub use core::sync::atomic::Ordering;
    pub use std::sync::Condvar;
    pub use std::sync::Mutex;
    pub use std::sync::MutexGuard;
    pub use std::thread::Builder as ThreadBuilder;

    // Futex support

    /// Blocks while `atomic` still holds `value`. May wake spuriously.
    #[inline]
    pub fn wait(atomic: &AtomicU32, value: u32) {
        atomic_wait::wait(atomic, value);
    }

    /// Wakes every thread blocked in [`wait`] on `atomic`.
    #[inline]
    pub fn wake_all(atomic: *const AtomicU32) {
        atomic_wait::wake_all(atomic);
    }
}

#[cfg(loom)]
mod platform {

    // Core exports

    pub use loom::sync::Condvar;
    pub use loom::sync::Mutex;
    pub use loom::sync::MutexGuard;
    pub use loom::sync::atomic::AtomicU32;
    pub use loom::sync::atomic::Ordering;
    pub use loom::thread::Builder as ThreadBuilder;

    // Futex support
    //
    // Loom has no model of futexes, so waiting becomes a yield and the waiting
    // thread is responsible for re-checking the value.

    pub fn wait(_atomic: &AtomicU32, _value: u32) {
        loom::thread::yield_now();
    }

    pub fn wake_all(_atomic: *const AtomicU32) {}
}
