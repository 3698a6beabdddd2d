//! High-level deploy entry points: mint a release id, build the plan, hold
//! the per-target lock for the duration of the run, execute, then prune.

use serde::Serialize;

use crate::error::Result;
use crate::executor::RemoteExecutor;
use crate::layout::ReleaseId;
use crate::lock::DeployLock;
use crate::orchestrator::{DeploymentOrchestrator, RunReport, StepReport};
use crate::plan::{self, Mode, Step, StepKind};
use crate::prune::{self, PruneOutcome};
use crate::target::{Target, TargetName};

#[derive(Debug, Clone, Copy)]
pub struct DeployOptions {
    pub mode: Mode,
    /// Overrides the target's configured retention when set.
    pub keep: Option<usize>,
    pub dry_run: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployReport {
    pub target: TargetName,
    pub release_id: ReleaseId,
    pub mode: Mode,
    pub dry_run: bool,
    /// The plan as it would run; only present for dry runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planned: Option<Vec<Step>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run: Option<RunReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prune: Option<PruneOutcome>,
}

/// Deploy a fresh release to the target. Fail forward: on any step failure
/// the run halts, the partial release stays on disk, and `current` still
/// points at the previous release.
pub fn deploy(
    target: &Target,
    executor: &dyn RemoteExecutor,
    options: &DeployOptions,
) -> Result<DeployReport> {
    let release_id = ReleaseId::now();
    let plan = plan::build(target, &release_id, options.mode)?;

    if options.dry_run {
        return Ok(DeployReport {
            target: target.name,
            release_id,
            mode: options.mode,
            dry_run: true,
            planned: Some(plan.steps),
            run: None,
            prune: None,
        });
    }

    let layout = target.layout();
    let lock = DeployLock::acquire(executor, target.name, &layout)?;

    let orchestrator = DeploymentOrchestrator::new(executor, target.step_timeout_secs);
    let run = match orchestrator.run(&plan) {
        Ok(run) => run,
        Err(err) => {
            // Lock releases via Drop; the failed release stays for inspection.
            drop(lock);
            return Err(err);
        }
    };

    let keep = options.keep.unwrap_or(target.keep_releases);
    let prune = match prune::prune(executor, &layout, keep) {
        Ok(outcome) => Some(outcome),
        Err(err) => {
            // The release is already live; a prune failure is not worth
            // failing the deploy over.
            log_status!("prune", "Skipping retention sweep: {}", err);
            None
        }
    };

    if let Err(err) = lock.release() {
        log_status!("lock", "{}", err);
    }

    log_status!("deploy", "Release {} is now current on {}", release_id, target.name);

    Ok(DeployReport {
        target: target.name,
        release_id,
        mode: options.mode,
        dry_run: false,
        planned: None,
        run: Some(run),
        prune,
    })
}

/// Prune old releases without deploying. Holds the per-target deploy lock
/// for the sweep: deleting release directories while another run is
/// mid-activation on the same target would race the `current` flip.
pub fn prune_only(
    target: &Target,
    executor: &dyn RemoteExecutor,
    keep: Option<usize>,
) -> Result<PruneOutcome> {
    target.validate()?;
    let layout = target.layout();
    let lock = DeployLock::acquire(executor, target.name, &layout)?;

    let keep = keep.unwrap_or(target.keep_releases);
    let outcome = match prune::prune(executor, &layout, keep) {
        Ok(outcome) => outcome,
        Err(err) => {
            drop(lock);
            return Err(err);
        }
    };

    if let Err(err) = lock.release() {
        log_status!("lock", "{}", err);
    }

    Ok(outcome)
}

/// Operations that run against the active release, outside a deploy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaintenanceOp {
    SetCrontab,
    DisableCrontab,
    Stop,
    ClearCache,
}

impl MaintenanceOp {
    pub fn step_name(&self) -> &'static str {
        match self {
            MaintenanceOp::SetCrontab => "set_crontab",
            MaintenanceOp::DisableCrontab => "disable_crontab",
            MaintenanceOp::Stop => "stop",
            MaintenanceOp::ClearCache => "clear_cache",
        }
    }

    fn template<'t>(&self, target: &'t Target) -> &'t str {
        match self {
            MaintenanceOp::SetCrontab => &target.cron_set_command,
            MaintenanceOp::DisableCrontab => &target.cron_disable_command,
            MaintenanceOp::Stop => &target.stop_command,
            MaintenanceOp::ClearCache => &target.clear_cache_command,
        }
    }
}

/// Run a single maintenance operation against the target's active release.
pub fn maintenance(
    target: &Target,
    executor: &dyn RemoteExecutor,
    op: MaintenanceOp,
) -> Result<StepReport> {
    target.validate()?;

    let step = plan::render_step(
        target,
        op.step_name(),
        op.template(target),
        StepKind::SafeToRetry,
        None,
    )?;

    DeploymentOrchestrator::new(executor, target.step_timeout_secs)
        .run_standalone(target.name, &step)
}
