//! Errors reported by the thread pool.

use std::io;

/// The pool tried to grow, but the operating system refused to create a new
/// worker thread.
///
/// This is reported by [`ThreadPool::schedule`](crate::ThreadPool::schedule)
/// *after* the batch has been queued. The tasks are not lost: any worker that
/// is already running will drain them, and so will the first worker spawned
/// by a later, successful call to `schedule`.
#[derive(Debug, thiserror::Error)]
#[error("failed to spawn worker thread")]
pub struct SpawnError {
    #[source]
    source: io::Error,
}

impl SpawnError {
    pub(crate) fn new(source: io::Error) -> SpawnError {
        SpawnError { source }
    }

    /// Returns the OS error code reported by thread creation, if there is one.
    pub fn raw_os_error(&self) -> Option<i32> {
        self.source.raw_os_error()
    }

    /// Returns the underlying I/O error.
    pub fn io_error(&self) -> &io::Error {
        &self.source
    }
}

impl From<SpawnError> for io::Error {
    fn from(err: SpawnError) -> io::Error {
        err.source
    }
}
