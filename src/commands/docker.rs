use super::SpawnSpec;
use crate::eval::CommandContext;

/// Read-only docker subcommands.
pub const SUBCOMMANDS: &[&str] = &["ps", "logs", "images", "inspect", "stats", "version", "info"];

pub fn build(ctx: &CommandContext) -> SpawnSpec {
    SpawnSpec {
        executable: "docker".into(),
        args: ctx.args().to_vec(),
    }
}
