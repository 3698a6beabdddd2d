use clap::Args;
use serde::Serialize;

use slipway::deploy::{self, MaintenanceOp};
use slipway::orchestrator::StepReport;
use slipway::target::TargetName;

use super::CmdResult;

#[derive(Args)]
pub struct CronArgs {
    /// Deployment environment (falls back to $TARGET, then staging)
    #[arg(long, value_enum)]
    pub target: Option<TargetName>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CronOutput {
    pub command: String,
    pub target: TargetName,
    pub step: StepReport,
}

pub fn run_set(args: CronArgs) -> CmdResult<CronOutput> {
    run(args, MaintenanceOp::SetCrontab, "crontab.set")
}

pub fn run_disable(args: CronArgs) -> CmdResult<CronOutput> {
    run(args, MaintenanceOp::DisableCrontab, "crontab.disable")
}

fn run(args: CronArgs, op: MaintenanceOp, command: &str) -> CmdResult<CronOutput> {
    let (target, client) = super::resolve_target(args.target)?;
    let step = deploy::maintenance(&target, &client, op)?;

    Ok((
        CronOutput {
            command: command.to_string(),
            target: target.name,
            step,
        },
        0,
    ))
}
