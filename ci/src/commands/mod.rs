// Compile commands
mod compile;
mod compile_check;

pub use compile::*;
pub use compile_check::*;

// Documentation commands
mod doc;
mod doc_check;

pub use doc::*;
pub use doc_check::*;
pub use doc_test::*;

// Lint commands
mod clippy;
mod format;
mod lints;

pub use clippy::*;
pub use format::*;
pub use lints::*;


pub use test::*;

// Miri commands
mod miri;

pub use miri::*;

// Loom test suite commands
mod loom;
mod loom_check;
mod loom_clippy;

pub use loom::*;
pub use loom_check::*;
pub use loom_clippy::*;
pub use loom_test::*;
