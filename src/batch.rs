//! An unordered collection of tasks which can be scheduled as a group.

use core::fmt;
use core::marker::PhantomData;
use core::ptr::NonNull;

use crate::task::Task;
use crate::task::TaskHeader;
use crate::task::TaskRef;

// -----------------------------------------------------------------------------
// Batch

/// A collection of [`Task`]s submitted to a [`ThreadPool`] together.
///
/// Batches are intrusive singly-linked lists threaded through the tasks
/// themselves, so building one never allocates. Creating a batch from a task,
/// merging two batches, and scheduling a batch are all O(1).
///
/// A batch exclusively borrows every task in it for `'env`. Batches are moved,
/// never copied: merging one batch into another with [`Batch::push`] consumes
/// it.
///
/// The order of tasks in a batch is the order in which they will be dequeued,
/// but once a pool has more than one worker the order in which they *run* is
/// unspecified. Callers should treat a batch as unordered.
///
/// ```
/// # #![cfg(not(loom))]
/// use lazypool::{Batch, Task};
///
/// let mut a = Task::new(|| println!("a"));
/// let mut b = Task::new(|| println!("b"));
///
/// let mut batch = Batch::from_task(&mut a);
/// batch.push(Batch::from_task(&mut b));
/// assert_eq!(batch.len(), 2);
/// ```
///
/// [`ThreadPool`]: crate::ThreadPool
pub struct Batch<'env> {
    len: usize,
    head: Option<NonNull<TaskHeader>>,
    tail: Option<NonNull<TaskHeader>>,
    /// The batch behaves as if it contained a `&'env mut` reference to each of
    /// its tasks.
    marker: PhantomData<&'env mut TaskHeader>,
}

impl<'env> Batch<'env> {
    /// Creates an empty batch. The empty batch is the identity for
    /// [`Batch::push`], and scheduling it is a no-op.
    pub const fn new() -> Batch<'env> {
        Batch {
            len: 0,
            head: None,
            tail: None,
            marker: PhantomData,
        }
    }

    /// Creates a batch containing a single task.
    ///
    /// The task is borrowed for the whole of `'env`, which cannot end before
    /// the pool it is scheduled on has finished running it.
    pub fn from_task<F>(task: &'env mut Task<F>) -> Batch<'env>
    where
        F: FnMut() + Send + 'env,
    {
        let header = task.header_ptr();
        Batch {
            len: 1,
            head: Some(header),
            tail: Some(header),
            marker: PhantomData,
        }
    }

    /// Returns the number of tasks in the batch.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the batch contains no tasks.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Moves every task in `other` to the end of this batch.
    ///
    /// This is O(1). Merging an empty batch is a no-op, and merging into an
    /// empty batch simply replaces it.
    pub fn push(&mut self, other: Batch<'env>) {
        let (Some(other_head), Some(other_tail)) = (other.head, other.tail) else {
            return;
        };

        match self.tail {
            None => *self = other,
            Some(tail) => {
                // SAFETY: `tail` is linked into this batch, which holds an
                // exclusive borrow of it. `other_head` belongs to a different
                // batch (batches can't share tasks, because they hold
                // exclusive borrows), so this cannot create a cycle.
                unsafe { (*tail.as_ptr()).next = Some(other_head) };
                self.tail = Some(other_tail);
                self.len += other.len;
            }
        }
    }

    /// Removes the task at the front of the batch.
    ///
    /// Returns `None` without modifying the batch if it is empty.
    pub(crate) fn pop_front(&mut self) -> Option<TaskRef<'env>> {
        let head = self.head?;

        // SAFETY: `head` is linked into this batch, which holds an exclusive
        // borrow of it.
        let next = unsafe { head.as_ref().next };

        if self.tail == Some(head) {
            self.head = None;
            self.tail = None;
        } else {
            self.head = next;
        }
        self.len -= 1;

        // SAFETY: The task was linked into this batch through `from_task`,
        // which borrowed it for `'env`. It has just been unlinked, so this is
        // the only reference to it.
        Some(unsafe { TaskRef::new(head) })
    }
}

impl Default for Batch<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Batch<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Batch")
            .field("len", &self.len)
            .field("head", &self.head)
            .field("tail", &self.tail)
            .finish()
    }
}

impl<'env, F> Extend<&'env mut Task<F>> for Batch<'env>
where
    F: FnMut() + Send + 'env,
{
    fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = &'env mut Task<F>>,
    {
        for task in iter {
            self.push(Batch::from_task(task));
        }
    }
}

impl<'env, F> FromIterator<&'env mut Task<F>> for Batch<'env>
where
    F: FnMut() + Send + 'env,
{
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = &'env mut Task<F>>,
    {
        let mut batch = Batch::new();
        batch.extend(iter);
        batch
    }
}

// SAFETY: A batch is, in effect, a list of `&'env mut Task<F>` references,
// and `from_task` only accepts tasks whose closures are `Send`.
unsafe impl Send for Batch<'_> {}

// -----------------------------------------------------------------------------
// Tests
