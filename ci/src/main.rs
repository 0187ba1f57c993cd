//! CI script used for lazypool.
//!
//! Runs the same checks as CI: formatting, clippy, tests, docs and the loom suite.

mod ci;
mod commands;
mod prepare;

pub use self::{ci::*, prepare::*};

fn main() {
    argh::from_env::<CI>().run();
}
