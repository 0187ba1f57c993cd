//! Integration tests for the thread pool.

#![cfg(not(loom))]

use core::panic::AssertUnwindSafe;
use core::sync::atomic::{AtomicUsize, Ordering};
use std::panic::catch_unwind;
use std::sync::Barrier;
use std::sync::Mutex;
use std::thread;

use lazypool::{Batch, Config, DEFAULT_STACK_SIZE, DEFAULT_THREADS_MAX, Task, ThreadPool};
use tracing::Level;
use tracing::info;

// -----------------------------------------------------------------------------
// Infrastructure

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::TRACE)
        .with_test_writer()
        .without_time()
        .with_thread_names(true)
        .try_init();
}

/// Returns one hit counter per task, which each task increments when run.
fn hit_counters(count: usize) -> Vec<AtomicUsize> {
    (0..count).map(|_| AtomicUsize::new(0)).collect()
}

fn assert_all_ran_once(hits: &[AtomicUsize]) {
    for (index, hit) in hits.iter().enumerate() {
        assert_eq!(hit.load(Ordering::Relaxed), 1, "task {index} ran the wrong number of times");
    }
}

// -----------------------------------------------------------------------------
// Lifecycle

#[test]
fn init_deinit() {
    init_tracing();

    let threads = ThreadPool::scope(Config::new().threads_max(8), |pool| {
        assert_eq!(pool.config().threads_max, 8);
        assert_eq!(pool.config().stack_size, DEFAULT_STACK_SIZE);
        pool.threads()
    });

    assert_eq!(threads, 0);
}

#[test]
fn default_config() {
    init_tracing();

    ThreadPool::scope(Config::default(), |pool| {
        assert_eq!(pool.config().threads_max, DEFAULT_THREADS_MAX);
        assert_eq!(pool.config().stack_size, DEFAULT_STACK_SIZE);
    });
}

#[test]
fn single_task() {
    init_tracing();

    let counter = AtomicUsize::new(0);
    let mut task = Task::new(|| {
        counter.fetch_add(1, Ordering::Relaxed);
    });
    let batch = Batch::from_task(&mut task);

    ThreadPool::scope(Config::new().threads_max(8), |pool| {
        pool.schedule(batch).unwrap();
        // The first schedule always finds the pool empty and spawns.
        assert_eq!(pool.threads(), 1);
    });

    assert_eq!(counter.load(Ordering::Relaxed), 1);
}

#[test]
fn thousand_tasks() {
    init_tracing();

    let counter = AtomicUsize::new(0);
    let hits = hit_counters(1000);
    let mut tasks: Vec<_> = hits
        .iter()
        .map(|hit| {
            let counter = &counter;
            Task::new(move || {
                hit.fetch_add(1, Ordering::Relaxed);
                counter.fetch_add(1, Ordering::Relaxed);
            })
        })
        .collect();

    let mut batch = Batch::new();
    for task in &mut tasks {
        batch.push(Batch::from_task(task));
    }
    assert_eq!(batch.len(), 1000);

    ThreadPool::scope(Config::new().threads_max(8), |pool| {
        pool.schedule(batch).unwrap();
        // A single burst only ever spawns a single worker.
        assert_eq!(pool.threads(), 1);
    });

    assert_eq!(counter.load(Ordering::Relaxed), 1000);
    assert_all_ran_once(&hits);
}

#[test]
fn single_batch_any_size_any_cap() {
    init_tracing();

    for threads_max in 1..=4 {
        for size in [0, 1, 17, 1000] {
            let hits = hit_counters(size);
            let mut tasks: Vec<_> = hits
                .iter()
                .map(|hit| {
                    Task::new(move || {
                        hit.fetch_add(1, Ordering::Relaxed);
                    })
                })
                .collect();
            let batch: Batch<'_> = tasks.iter_mut().collect();
            assert_eq!(batch.len(), size);

            ThreadPool::scope(Config::new().threads_max(threads_max), |pool| {
                pool.schedule(batch).unwrap();
                assert!(pool.threads() <= 1);
            });

            drop(tasks);
            assert_all_ran_once(&hits);
        }
    }
}

#[test]
fn empty_batch() {
    init_tracing();

    ThreadPool::scope(Config::new().threads_max(8), |pool| {
        pool.schedule(Batch::new()).unwrap();
        assert_eq!(pool.threads(), 0);
    });
}

#[test]
fn single_thread_two_batches() {
    init_tracing();

    let order = Mutex::new(Vec::new());
    let mut tasks: Vec<_> = (0..10)
        .map(|index| {
            let order = &order;
            Task::new(move || order.lock().unwrap().push(index))
        })
        .collect();

    let (first, second) = tasks.split_at_mut(5);
    let first: Batch<'_> = first.iter_mut().collect();
    let second: Batch<'_> = second.iter_mut().collect();

    ThreadPool::scope(Config::new().threads_max(1), |pool| {
        pool.schedule(first).unwrap();
        pool.schedule(second).unwrap();
        assert_eq!(pool.threads(), 1);
    });

    // With a single worker, tasks run in queue order.
    drop(tasks);
    let order = order.into_inner().unwrap();
    assert_eq!(order, (0..10).collect::<Vec<_>>());
}

#[test]
fn many_small_batches() {
    init_tracing();

    let hits = hit_counters(200);
    let mut tasks: Vec<_> = hits
        .iter()
        .map(|hit| {
            Task::new(move || {
                hit.fetch_add(1, Ordering::Relaxed);
            })
        })
        .collect();

    ThreadPool::scope(Config::new().threads_max(4), |pool| {
        for task in &mut tasks {
            pool.schedule(Batch::from_task(task)).unwrap();
            assert!(pool.threads() <= 4);
        }
    });

    assert_all_ran_once(&hits);
}

#[test]
fn second_schedule_adds_thread() {
    init_tracing();

    // Both tasks block until the other is running, so this only completes if
    // the second schedule spawns a second worker.
    let barrier = Barrier::new(2);
    let mut a = Task::new(|| {
        barrier.wait();
    });
    let mut b = Task::new(|| {
        barrier.wait();
    });
    let a = Batch::from_task(&mut a);
    let b = Batch::from_task(&mut b);

    ThreadPool::scope(Config::new().threads_max(2), |pool| {
        pool.schedule(a).unwrap();
        pool.schedule(b).unwrap();
        assert_eq!(pool.threads(), 2);
    });
}

#[test]
fn schedule_from_many_threads() {
    init_tracing();

    let hits = hit_counters(400);
    let mut tasks: Vec<_> = hits
        .iter()
        .map(|hit| {
            Task::new(move || {
                hit.fetch_add(1, Ordering::Relaxed);
            })
        })
        .collect();

    let batches: Vec<Batch<'_>> = tasks
        .chunks_mut(100)
        .map(|chunk| chunk.iter_mut().collect())
        .collect();

    ThreadPool::scope(Config::new().threads_max(3), |pool| {
        thread::scope(|s| {
            for batch in batches {
                s.spawn(move || pool.schedule(batch).unwrap());
            }
        });
        assert!(pool.threads() >= 1);
    });

    assert_all_ran_once(&hits);
}

#[test]
fn tasks_run_on_named_workers() {
    init_tracing();

    let names = Mutex::new(Vec::new());
    let mut tasks: Vec<_> = (0..8)
        .map(|_| {
            let names = &names;
            Task::new(move || {
                let name = thread::current().name().map(str::to_owned);
                names.lock().unwrap().push(name);
            })
        })
        .collect();
    let batch: Batch<'_> = tasks.iter_mut().collect();

    ThreadPool::scope(Config::new().threads_max(2).stack_size(256 * 1024), |pool| {
        pool.schedule(batch).unwrap();
    });

    drop(tasks);
    let names = names.into_inner().unwrap();
    assert_eq!(names.len(), 8);
    for name in names {
        assert!(name.unwrap().starts_with("lazypool worker"));
    }
}

#[test]
fn tasks_can_be_rescheduled_after_teardown() {
    init_tracing();

    let counter = AtomicUsize::new(0);
    let mut tasks: Vec<_> = (0..16)
        .map(|_| {
            Task::new(|| {
                counter.fetch_add(1, Ordering::Relaxed);
            })
        })
        .collect();

    for round in 1..=3 {
        let batch: Batch<'_> = tasks.iter_mut().collect();
        ThreadPool::scope(Config::new().threads_max(4), |pool| {
            pool.schedule(batch).unwrap();
        });
        assert_eq!(counter.load(Ordering::Relaxed), 16 * round);
    }
}

#[test]
fn panicking_scope_still_drains() {
    init_tracing();

    let hits = hit_counters(50);
    let mut tasks: Vec<_> = hits
        .iter()
        .map(|hit| {
            Task::new(move || {
                hit.fetch_add(1, Ordering::Relaxed);
            })
        })
        .collect();
    let batch: Batch<'_> = tasks.iter_mut().collect();

    let result = catch_unwind(AssertUnwindSafe(|| {
        ThreadPool::scope(Config::new().threads_max(2), |pool| {
            pool.schedule(batch).unwrap();
            panic!("scope body failed");
        })
    }));

    assert!(result.is_err());
    assert_all_ran_once(&hits);
}

#[test]
#[cfg(all(target_os = "linux", target_pointer_width = "64"))]
fn spawn_failure_keeps_tasks_queued() {
    init_tracing();

    let counter = AtomicUsize::new(0);
    let mut task = Task::new(|| {
        counter.fetch_add(1, Ordering::Relaxed);
    });
    let batch = Batch::from_task(&mut task);

    // No system can map a stack this large.
    ThreadPool::scope(Config::new().stack_size(1 << 62), |pool| {
        let err = pool.schedule(batch).unwrap_err();
        info!("spawn failed as expected: {}", err);
        assert!(err.raw_os_error().is_some());
        assert_eq!(pool.threads(), 0);
    });

    // There was never a worker to run it.
    assert_eq!(counter.load(Ordering::Relaxed), 0);
}
