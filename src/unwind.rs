//! Panic handling for worker threads.

use std::eprintln;
use std::process::abort;

/// Aborts the program when dropped.
///
/// Workers hold one of these while running a task. A panic escaping the task
/// would otherwise unwind the worker without releasing its live count, and
/// teardown would wait for it forever.
pub struct AbortOnDrop;

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        eprintln!("lazypool: a task panicked on a worker thread; aborting");
        abort();
    }
}
