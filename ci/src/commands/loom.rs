use crate::{
    commands::{LoomCheckCommand, LoomClippyCommand, LoomTestCommand},
    Flag, Prepare, PreparedCommand,
};
use argh::FromArgs;

/// Runs the whole loom tier: `loom-check`, then `loom-clippy`, then `loom-test`.
///
/// The models are slow to explore. Preemptions are bounded inside the test
/// suite itself.
#[derive(FromArgs, Default)]
#[argh(subcommand, name = "loom")]
pub struct LoomCommand {}

impl Prepare for LoomCommand {
    fn prepare<'a>(&self, sh: &'a xshell::Shell, flags: Flag) -> Vec<PreparedCommand<'a>> {
        [
            LoomCheckCommand::default().prepare(sh, flags),
            LoomClippyCommand::default().prepare(sh, flags),
            LoomTestCommand::default().prepare(sh, flags),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}
