use clap::Args;
use serde::Serialize;

use slipway::deploy::{self, MaintenanceOp};
use slipway::orchestrator::StepReport;
use slipway::target::TargetName;

use super::CmdResult;

#[derive(Args)]
pub struct ServiceArgs {
    /// Deployment environment (falls back to $TARGET, then staging)
    #[arg(long, value_enum)]
    pub target: Option<TargetName>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceOutput {
    pub command: String,
    pub target: TargetName,
    pub step: StepReport,
}

pub fn run_stop(args: ServiceArgs) -> CmdResult<ServiceOutput> {
    run(args, MaintenanceOp::Stop, "service.stop")
}

pub fn run_clear_cache(args: ServiceArgs) -> CmdResult<ServiceOutput> {
    run(args, MaintenanceOp::ClearCache, "service.clear_cache")
}

fn run(args: ServiceArgs, op: MaintenanceOp, command: &str) -> CmdResult<ServiceOutput> {
    let (target, client) = super::resolve_target(args.target)?;
    let step = deploy::maintenance(&target, &client, op)?;

    Ok((
        ServiceOutput {
            command: command.to_string(),
            target: target.name,
            step,
        },
        0,
    ))
}
