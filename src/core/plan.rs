//! Release plans: the ordered sequence of steps a deploy will execute,
//! built entirely up front so nothing is decided mid-run.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::layout::{ReleaseId, ReleaseLayout};
use crate::target::{Target, TargetName};
use crate::utils::shell;
use crate::utils::template::{self, TemplateVars};

/// Whether an operator may safely re-run a step after a failure.
///
/// `DestructiveOnce` steps must not be replayed into the same release id;
/// retrying them means minting a new release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    SafeToRetry,
    DestructiveOnce,
}

/// One remote command, fully rendered. Immutable value object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    pub command: String,
    pub kind: StepKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[clap(rename_all = "lowercase")]
pub enum Mode {
    /// First deploy on a host: finish by starting the process.
    Cold,
    /// Normal deploy: finish by signalling the running process to reload.
    Restart,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReleasePlan {
    pub target: TargetName,
    pub release_id: ReleaseId,
    pub mode: Mode,
    /// The `current` symlink this plan will flip; the orchestrator reads it
    /// just before activation to report the superseded release.
    pub current_path: String,
    pub steps: Vec<Step>,
}

/// Step names double as the states of the deploy lifecycle; the run report
/// and error details use them verbatim.
pub mod step_names {
    pub const CHECKOUT: &str = "checkout";
    pub const LINK_SHARED: &str = "link_shared";
    pub const INSTALL_DEPS: &str = "install_deps";
    pub const BUILD_INDEXES: &str = "build_indexes";
    pub const SYNC_ASSETS: &str = "sync_assets";
    pub const ACTIVATE: &str = "activate";
    pub const SET_CRONTAB: &str = "set_crontab";
    pub const START: &str = "start";
    pub const RESTART: &str = "restart";
}

/// Template variables shared by every command in a deploy. Values with shell
/// metacharacters are quoted; plain paths pass through untouched.
pub fn command_vars(target: &Target, release_id: Option<&ReleaseId>) -> HashMap<String, String> {
    let layout = target.layout();
    let mut vars = HashMap::from([
        (TemplateVars::HOME.to_string(), shell::quote_arg(layout.home())),
        (
            TemplateVars::SHARED_PATH.to_string(),
            shell::quote_arg(&layout.shared_path()),
        ),
        (
            TemplateVars::VERSIONS_PATH.to_string(),
            shell::quote_arg(&layout.versions_path()),
        ),
        (
            TemplateVars::CURRENT_PATH.to_string(),
            shell::quote_arg(&layout.current_path()),
        ),
        (
            TemplateVars::TARGET.to_string(),
            target.name.as_str().to_string(),
        ),
        (TemplateVars::USER.to_string(), shell::quote_arg(&target.user)),
        (
            TemplateVars::BRANCH.to_string(),
            shell::quote_arg(&target.branch),
        ),
        (TemplateVars::REPO.to_string(), shell::quote_arg(&target.repo)),
    ]);

    if let Some(id) = release_id {
        vars.insert(
            TemplateVars::VERSION_PATH.to_string(),
            shell::quote_arg(&layout.version_path(id)),
        );
    }

    vars
}

/// Render a single configured command template into a step.
/// Fails at build time if the template references an unknown variable.
pub fn render_step(
    target: &Target,
    name: &str,
    template_str: &str,
    kind: StepKind,
    release_id: Option<&ReleaseId>,
) -> Result<Step> {
    let vars = command_vars(target, release_id);
    let command = template::render_strict(template_str, &vars)?;
    Ok(Step {
        name: name.to_string(),
        command,
        kind,
    })
}

/// Build the full deploy plan for a target. The cold and restart plans share
/// every step except the final process-activation step.
pub fn build(target: &Target, release_id: &ReleaseId, mode: Mode) -> Result<ReleasePlan> {
    target.validate()?;

    let layout = target.layout();
    let version_path = layout.version_path(release_id);
    let id = Some(release_id);

    let mut steps = Vec::with_capacity(9);

    steps.push(Step {
        name: "prepare".to_string(),
        command: format!(
            "mkdir -p {} {}",
            shell::quote_path(&layout.versions_path()),
            shell::quote_path(&layout.shared_path()),
        ),
        kind: StepKind::SafeToRetry,
    });

    steps.push(render_step(
        target,
        step_names::CHECKOUT,
        &target.checkout_command,
        StepKind::DestructiveOnce,
        id,
    )?);

    // One command for all shared links; ln -sfn makes replay a no-op.
    let links: Vec<String> = target
        .shared_links
        .iter()
        .map(|link| {
            format!(
                "ln -sfn {} {}",
                shell::quote_path(&format!("{}/{}", layout.shared_path(), link.from)),
                shell::quote_path(&format!("{}/{}", version_path, link.to)),
            )
        })
        .collect();
    steps.push(Step {
        name: step_names::LINK_SHARED.to_string(),
        command: links.join(" && "),
        kind: StepKind::SafeToRetry,
    });

    steps.push(render_step(
        target,
        step_names::INSTALL_DEPS,
        &target.install_command,
        StepKind::SafeToRetry,
        id,
    )?);
    steps.push(render_step(
        target,
        step_names::BUILD_INDEXES,
        &target.index_command,
        StepKind::SafeToRetry,
        id,
    )?);
    steps.push(render_step(
        target,
        step_names::SYNC_ASSETS,
        &target.assets_command,
        StepKind::SafeToRetry,
        id,
    )?);

    steps.push(activation_step(&layout, release_id));

    steps.push(render_step(
        target,
        step_names::SET_CRONTAB,
        &target.cron_set_command,
        StepKind::SafeToRetry,
        id,
    )?);

    steps.push(match mode {
        Mode::Cold => render_step(
            target,
            step_names::START,
            &target.start_command,
            StepKind::DestructiveOnce,
            id,
        )?,
        Mode::Restart => render_step(
            target,
            step_names::RESTART,
            &target.restart_command,
            StepKind::SafeToRetry,
            id,
        )?,
    });

    Ok(ReleasePlan {
        target: target.name,
        release_id: release_id.clone(),
        mode,
        current_path: layout.current_path(),
        steps,
    })
}

/// The one correctness-critical step: point `current` at the new release in
/// a single remote invocation. The staging link is created (or replaced)
/// first, then renamed over `current`; rename is atomic on POSIX, so a
/// concurrent reader always sees the old target or the new one, never
/// a missing link.
fn activation_step(layout: &ReleaseLayout, release_id: &ReleaseId) -> Step {
    let command = format!(
        "ln -sfn {} {} && mv -Tf {} {}",
        shell::quote_path(&layout.version_path(release_id)),
        shell::quote_path(&layout.current_staging_path()),
        shell::quote_path(&layout.current_staging_path()),
        shell::quote_path(&layout.current_path()),
    );
    Step {
        name: step_names::ACTIVATE.to_string(),
        command,
        kind: StepKind::SafeToRetry,
    }
}
