use super::SpawnSpec;
use crate::eval::CommandContext;

/// Read-only git subcommands.
pub const SUBCOMMANDS: &[&str] = &[
    "status",
    "log",
    "show",
    "diff",
    "branch",
    "rev-parse",
    "remote",
];

pub fn build(ctx: &CommandContext) -> SpawnSpec {
    SpawnSpec {
        executable: "git".into(),
        args: ctx.args().to_vec(),
    }
}
