use argh::FromArgs;
use xshell::cmd;

use crate::Flag;
use crate::Prepare;
use crate::PreparedCommand;

/// Runs the unit tests and the miri test suite under miri.
#[derive(FromArgs, Default)]
#[argh(subcommand, name = "miri")]
pub struct MiriCommand {}

impl Prepare for MiriCommand {
    fn prepare<'a>(&self, sh: &'a xshell::Shell, _flags: Flag) -> Vec<PreparedCommand<'a>> {
        let command = PreparedCommand::new::<Self>(
            cmd!(sh, "cargo +nightly miri test --test miri --lib"),
            "Please fix undefined behavior reported by miri in output above.",
        )
        // Workers are detached, and may still be exiting when a test returns.
        .with_env_var("MIRIFLAGS", "-Zmiri-ignore-leaks");
        vec![command]
    }
}
