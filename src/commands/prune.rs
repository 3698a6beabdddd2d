use clap::Args;
use serde::Serialize;

use slipway::deploy;
use slipway::prune::PruneOutcome;
use slipway::target::TargetName;

use super::CmdResult;

#[derive(Args)]
pub struct PruneArgs {
    /// Deployment environment (falls back to $TARGET, then staging)
    #[arg(long, value_enum)]
    pub target: Option<TargetName>,

    /// Retain this many releases (overrides target config)
    #[arg(long)]
    pub keep: Option<usize>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PruneOutput {
    pub command: String,
    pub target: TargetName,
    pub outcome: PruneOutcome,
}

pub fn run(args: PruneArgs) -> CmdResult<PruneOutput> {
    if args.keep == Some(0) {
        return Err(slipway::Error::validation_invalid_argument(
            "keep",
            "At least one release must be retained",
            None,
        ));
    }

    let (target, client) = super::resolve_target(args.target)?;
    let outcome = deploy::prune_only(&target, &client, args.keep)?;

    // Partial failures are reported but non-fatal; pruning is best effort.
    let exit_code = 0;

    Ok((
        PruneOutput {
            command: "prune.run".to_string(),
            target: target.name,
            outcome,
        },
        exit_code,
    ))
}
