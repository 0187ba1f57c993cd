//! This module defines the unit of work scheduled on the pool, the [`Task`].
//!
//! A task is a work closure with an intrusive link stored alongside it, so that
//! tasks can be strung together into a [`Batch`](crate::Batch) without
//! allocating. The link and a type-erased "run" function live in a
//! [`TaskHeader`] at the very start of the task. Batches and the pool only ever
//! deal in pointers to headers, which lets tasks holding different closure
//! types share the same queue.
//!
//! After a task is linked into a batch, the pool refers to it by a [`TaskRef`].
//! Task refs are type-erased and can be sent between threads without moving
//! the underlying task.

use core::fmt;
use core::marker::PhantomData;
use core::ptr::NonNull;

// -----------------------------------------------------------------------------
// Header

/// The type-erased, intrusive part of a task.
pub(crate) struct TaskHeader {
    /// The next task in whichever batch currently holds this one.
    pub(crate) next: Option<NonNull<TaskHeader>>,
    /// Runs the work closure of the `Task` this header is embedded in. This
    /// always points to `Task::<F>::run` for the task's own `F`.
    run: unsafe fn(NonNull<TaskHeader>),
}

// -----------------------------------------------------------------------------
// Task

/// A unit of work that can be scheduled on a [`ThreadPool`].
///
/// The storage for a task always belongs to the caller. Scheduling a task
/// borrows it (through [`Batch::from_task`]) for as long as the enclosing
/// [`ThreadPool::scope`] lasts, and the work closure is called exactly once
/// per scheduling, on one of the pool's worker threads.
///
/// Tasks carry no return value. Results must be communicated through whatever
/// the closure captures, such as an atomic counter or a channel.
///
/// [`ThreadPool`]: crate::ThreadPool
/// [`ThreadPool::scope`]: crate::ThreadPool::scope
/// [`Batch::from_task`]: crate::Batch::from_task
#[repr(C)]
pub struct Task<F> {
    /// Must stay the first field, so that a pointer to the task is also a
    /// pointer to its header.
    header: TaskHeader,
    work: F,
}

impl<F> Task<F>
where
    F: FnMut() + Send,
{
    /// Creates a new task which will call `work` when it runs.
    pub const fn new(work: F) -> Task<F> {
        Task {
            header: TaskHeader {
                next: None,
                run: Self::run,
            },
            work,
        }
    }

    /// Detaches the task from any batch it was previously part of, and returns
    /// a pointer to its header.
    ///
    /// The pointer is derived from the whole task rather than from the header
    /// field, so that it may later be cast back to a `Task<F>`.
    pub(crate) fn header_ptr(&mut self) -> NonNull<TaskHeader> {
        self.header.next = None;
        NonNull::from(self).cast()
    }

    /// Executes a task through a pointer to its header.
    ///
    /// # Safety
    ///
    /// `this` must have been produced by `header_ptr` on a `Task<F>` (with this
    /// same `F`), and the caller must have exclusive access to that task for
    /// the duration of the call.
    unsafe fn run(this: NonNull<TaskHeader>) {
        // SAFETY: The header is the first field of a `#[repr(C)]` struct and
        // the pointer carries the provenance of the whole task, so it can be
        // cast back. The caller guarantees exclusive access.
        let task = unsafe { this.cast::<Self>().as_mut() };
        (task.work)();
    }
}

impl<F> fmt::Debug for Task<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("linked", &self.header.next.is_some())
            .finish_non_exhaustive()
    }
}

// -----------------------------------------------------------------------------
// Task references

/// A reference to a task that has been taken out of a batch, and is about to
/// be executed. Consuming the `TaskRef` runs the task.
///
/// This is analogous to a `&'env mut Task<F>` with `F` erased.
pub(crate) struct TaskRef<'env> {
    header: NonNull<TaskHeader>,
    marker: PhantomData<&'env mut TaskHeader>,
}

impl<'env> TaskRef<'env> {
    /// Creates a task ref from a header pointer.
    ///
    /// # Safety
    ///
    /// The pointer must come from `Task::header_ptr`, the task must remain
    /// exclusively borrowed for `'env`, and no other `TaskRef` may exist for it.
    #[inline(always)]
    pub(crate) unsafe fn new(header: NonNull<TaskHeader>) -> TaskRef<'env> {
        TaskRef {
            header,
            marker: PhantomData,
        }
    }

    /// Returns the address of the task, for comparisons.
    #[cfg(test)]
    pub(crate) fn addr(&self) -> usize {
        self.header.as_ptr() as usize
    }

    /// Runs the task's work closure on the current thread.
    #[inline(always)]
    pub(crate) fn run(self) {
        // SAFETY: The header was produced by `header_ptr`, so reading it is
        // valid, and its `run` function matches the task's real type.
        let run = unsafe { self.header.as_ref().run };
        // SAFETY: The constructor of `TaskRef` guarantees exclusive access to
        // the task for `'env`, and `run` consumes the only reference to it.
        unsafe { run(self.header) }
    }
}

// SAFETY: A task ref is only created for tasks whose closures are `Send`
// (enforced by `Batch::from_task`), and it grants exclusive access, so moving
// it to another thread is like moving a `&mut Task<F>` with `F: Send`.
unsafe impl Send for TaskRef<'_> {}
