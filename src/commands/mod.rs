pub type CmdResult<T> = slipway::Result<(T, i32)>;

pub mod cron;
pub mod deploy;
pub mod prune;
pub mod service;
pub mod target;

use slipway::ssh::SshClient;
use slipway::target::{resolve_name, Target, TargetName};
use slipway::{config, Result};

/// Resolve the target from the `--target` flag (falling back to `TARGET`,
/// then staging), load its config, and build the SSH executor for it.
pub(crate) fn resolve_target(flag: Option<TargetName>) -> Result<(Target, SshClient)> {
    let name = resolve_name(flag)?;
    let target = config::load(name)?;
    let client = SshClient::from_target(&target)?;
    Ok((target, client))
}
