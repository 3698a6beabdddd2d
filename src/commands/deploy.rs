use clap::Args;
use serde::Serialize;

use slipway::deploy::{self, DeployOptions, DeployReport};
use slipway::plan::Mode;
use slipway::target::TargetName;

use super::CmdResult;

#[derive(Args)]
pub struct DeployArgs {
    /// Deployment environment (falls back to $TARGET, then staging)
    #[arg(long, value_enum)]
    pub target: Option<TargetName>,

    /// cold starts the process; restart signals the running one
    #[arg(long, value_enum, default_value = "restart")]
    pub mode: Mode,

    /// Retain this many releases after the deploy (overrides target config)
    #[arg(long)]
    pub keep: Option<usize>,

    /// Print the plan without executing anything
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployOutput {
    pub command: String,
    #[serde(flatten)]
    pub report: DeployReport,
}

pub fn run(args: DeployArgs) -> CmdResult<DeployOutput> {
    if let Some(keep) = args.keep {
        if keep == 0 {
            return Err(slipway::Error::validation_invalid_argument(
                "keep",
                "At least one release must be retained",
                None,
            ));
        }
    }

    let (target, client) = super::resolve_target(args.target)?;

    let options = DeployOptions {
        mode: args.mode,
        keep: args.keep,
        dry_run: args.dry_run,
    };

    let report = deploy::deploy(&target, &client, &options)?;

    Ok((
        DeployOutput {
            command: "deploy.run".to_string(),
            report,
        },
        0,
    ))
}
