//! Contains a set of compile failure doctests.

// -----------------------------------------------------------------------------
// Ensures non-send closures cannot be turned into tasks.

/** ```compile_fail,E0277

use std::rc::Rc;
use lazypool::Task;

let r = Rc::new(22);
let task = Task::new(move || {
    let _ = r.clone();
}); //~ ERROR

``` */
mod nonsend_task {}

// -----------------------------------------------------------------------------
// Ensures a task cannot be dropped while a batch still refers to it.

/** ```compile_fail,E0505

use lazypool::{Batch, Config, Task, ThreadPool};

let mut task = Task::new(|| {});
let batch = Batch::from_task(&mut task);
drop(task); //~ ERROR

ThreadPool::scope(Config::new(), |pool| pool.schedule(batch).unwrap());

``` */
mod drop_linked_task {}

// -----------------------------------------------------------------------------
// Ensures a task cannot be linked into two batches at once.

/** ```compile_fail,E0499

use lazypool::{Batch, Task};

let mut task = Task::new(|| {});
let mut batch = Batch::from_task(&mut task);
batch.push(Batch::from_task(&mut task)); //~ ERROR

``` */
mod double_link {}

// -----------------------------------------------------------------------------
// Ensures tasks created inside a scope cannot be scheduled on its pool, since
// they would be freed before teardown waits for them.

/** ```compile_fail,E0597

use lazypool::{Batch, Config, Task, ThreadPool};

ThreadPool::scope(Config::new(), |pool| {
    let mut task = Task::new(|| {});
    pool.schedule(Batch::from_task(&mut task)).unwrap(); //~ ERROR
});

``` */
mod task_inside_scope {}

// -----------------------------------------------------------------------------
// Ensures the pool cannot escape its scope.

/** ```compile_fail

use lazypool::{Config, ThreadPool};

let pool = ThreadPool::scope(Config::new(), |pool| pool); //~ ERROR

``` */
mod escape_scope {}
