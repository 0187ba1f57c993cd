use argh::FromArgs;
use xshell::cmd;

use crate::{Flag, Prepare, PreparedCommand};

/// Checks the library and the loom models for clippy warnings, built with `--cfg loom`.
#[derive(FromArgs, Default)]
#[argh(subcommand, name = "loom-clippy")]
pub struct LoomClippyCommand {}

impl Prepare for LoomClippyCommand {
    fn prepare<'a>(&self, sh: &'a xshell::Shell, _flags: Flag) -> Vec<PreparedCommand<'a>> {
        let command = PreparedCommand::new::<Self>(
            cmd!(sh, "cargo clippy --lib --test loom -- -Dwarnings"),
            "Please fix clippy warnings in the loom platform code or models above.",
        )
        .with_env_var("RUSTFLAGS", "--cfg loom");
        vec![command]
    }
}
