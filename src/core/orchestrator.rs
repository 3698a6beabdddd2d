//! Sequential plan execution against a remote executor.
//!
//! The lifecycle is strictly linear: steps run in plan order, the first
//! failure halts the run, and nothing is rolled back. A half-applied release
//! stays on disk for inspection; `current` still points at the previous
//! release because activation is the only step that touches it.

use chrono::Utc;
use serde::Serialize;

use crate::error::{Error, Result, StepFailedDetails};
use crate::executor::{CommandOutput, RemoteExecutor};
use crate::layout::ReleaseId;
use crate::plan::{step_names, ReleasePlan, Step};
use crate::target::TargetName;
use crate::utils::shell;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseStatus {
    InProgress,
    Active,
    Superseded,
    Failed,
}

/// The lifecycle record for one release attempt. Created at the start of the
/// run as `InProgress`; becomes `Active` only inside the activation step.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseRecord {
    pub id: ReleaseId,
    pub created_at: String,
    pub status: ReleaseStatus,
}

impl ReleaseRecord {
    fn new(id: ReleaseId) -> Self {
        Self {
            id,
            created_at: Utc::now().to_rfc3339(),
            status: ReleaseStatus::InProgress,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepReport {
    pub name: String,
    pub command: String,
    pub exit_code: i32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub target: TargetName,
    pub record: ReleaseRecord,
    pub steps: Vec<StepReport>,
    /// The release that was active before this run took over.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub superseded: Option<ReleaseId>,
}

pub struct DeploymentOrchestrator<'a> {
    executor: &'a dyn RemoteExecutor,
    /// Per-step wall-clock limit, applied with a remote `timeout(1)` wrapper.
    step_timeout_secs: Option<u64>,
}

impl<'a> DeploymentOrchestrator<'a> {
    pub fn new(executor: &'a dyn RemoteExecutor, step_timeout_secs: Option<u64>) -> Self {
        Self {
            executor,
            step_timeout_secs,
        }
    }

    pub fn run(&self, plan: &ReleasePlan) -> Result<RunReport> {
        let mut record = ReleaseRecord::new(plan.release_id.clone());
        let mut steps = Vec::with_capacity(plan.steps.len());
        let mut superseded = None;

        for step in &plan.steps {
            if step.name == step_names::ACTIVATE {
                superseded = self.read_active_release(plan);
            }

            log_status!("deploy", "{}: {}", step.name, step.command);
            let output =
                self.execute_step(plan.target, Some(&plan.release_id), &mut record, step)?;

            if step.name == step_names::ACTIVATE {
                record.status = ReleaseStatus::Active;
            }

            steps.push(StepReport {
                name: step.name.clone(),
                command: step.command.clone(),
                exit_code: output.exit_code,
            });
        }

        Ok(RunReport {
            target: plan.target,
            record,
            steps,
            superseded,
        })
    }

    /// Run one standalone step (crontab management, stop, clear-cache)
    /// outside a release lifecycle.
    pub fn run_standalone(&self, target: TargetName, step: &Step) -> Result<StepReport> {
        log_status!("run", "{}: {}", step.name, step.command);
        let mut record = ReleaseRecord::new(ReleaseId::now());
        let output = self.execute_step(target, None, &mut record, step)?;
        Ok(StepReport {
            name: step.name.clone(),
            command: step.command.clone(),
            exit_code: output.exit_code,
        })
    }

    fn execute_step(
        &self,
        target: TargetName,
        release_id: Option<&ReleaseId>,
        record: &mut ReleaseRecord,
        step: &Step,
    ) -> Result<CommandOutput> {
        let command = self.wrap_timeout(&step.command);
        let output = self.executor.run(&command)?;

        if output.success {
            return Ok(output);
        }

        record.status = ReleaseStatus::Failed;
        let timed_out = output.timed_out();
        let details = StepFailedDetails {
            step: step.name.clone(),
            target: target.as_str().to_string(),
            release_id: release_id.map(|id| id.to_string()),
            command: step.command.clone(),
            exit_code: output.exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
        };

        if timed_out {
            Err(Error::step_timeout(details))
        } else {
            Err(Error::step_failed(details))
        }
    }

    fn wrap_timeout(&self, command: &str) -> String {
        match self.step_timeout_secs {
            Some(secs) => format!(
                "timeout {} sh -c {}",
                secs,
                shell::escape_command_for_shell(command)
            ),
            None => command.to_string(),
        }
    }

    /// Best-effort read of the release `current` points at; absent on a
    /// first deploy, and never a reason to halt the run.
    fn read_active_release(&self, plan: &ReleasePlan) -> Option<ReleaseId> {
        let command = format!("readlink {}", shell::quote_path(&plan.current_path));
        let output = self.executor.run(&command).ok()?;
        if !output.success {
            return None;
        }
        let basename = output.stdout.trim().rsplit('/').next()?.to_string();
        let id = ReleaseId::parse(&basename).ok()?;
        if id == plan.release_id {
            return None;
        }
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{Mode, StepKind};
    use std::cell::RefCell;

    /// Scripted executor: records every command and answers with the next
    /// queued output (defaulting to success).
    struct ScriptedExecutor {
        commands: RefCell<Vec<String>>,
        responses: RefCell<Vec<CommandOutput>>,
    }

    impl ScriptedExecutor {
        fn new() -> Self {
            Self {
                commands: RefCell::new(Vec::new()),
                responses: RefCell::new(Vec::new()),
            }
        }

        fn respond_at(self, index: usize, output: CommandOutput) -> Self {
            {
                let mut responses = self.responses.borrow_mut();
                while responses.len() <= index {
                    responses.push(ok());
                }
                responses[index] = output;
            }
            self
        }

        fn commands(&self) -> Vec<String> {
            self.commands.borrow().clone()
        }
    }

    impl RemoteExecutor for ScriptedExecutor {
        fn run(&self, command: &str) -> Result<CommandOutput> {
            let index = self.commands.borrow().len();
            self.commands.borrow_mut().push(command.to_string());
            Ok(self
                .responses
                .borrow()
                .get(index)
                .cloned()
                .unwrap_or_else(ok))
        }
    }

    fn ok() -> CommandOutput {
        CommandOutput {
            stdout: String::new(),
            stderr: String::new(),
            success: true,
            exit_code: 0,
        }
    }

    fn failed(exit_code: i32, stderr: &str) -> CommandOutput {
        CommandOutput {
            stdout: String::new(),
            stderr: stderr.to_string(),
            success: false,
            exit_code,
        }
    }

    fn five_step_plan() -> ReleasePlan {
        let steps = (1..=5)
            .map(|i| Step {
                name: format!("step_{}", i),
                command: format!("echo {}", i),
                kind: StepKind::SafeToRetry,
            })
            .collect();
        ReleasePlan {
            target: TargetName::Staging,
            release_id: ReleaseId::parse("20230110083000").unwrap(),
            mode: Mode::Restart,
            current_path: "/projects/alarms/current".to_string(),
            steps,
        }
    }

    #[test]
    fn runs_all_steps_in_order_on_success() {
        let executor = ScriptedExecutor::new();
        let orchestrator = DeploymentOrchestrator::new(&executor, None);

        let report = orchestrator.run(&five_step_plan()).unwrap();

        assert_eq!(report.steps.len(), 5);
        assert_eq!(
            executor.commands(),
            vec!["echo 1", "echo 2", "echo 3", "echo 4", "echo 5"]
        );
        // No activation step in this plan, so the record never went active.
        assert_eq!(report.record.status, ReleaseStatus::InProgress);
    }

    #[test]
    fn failing_step_halts_before_the_next_one() {
        let executor =
            ScriptedExecutor::new().respond_at(2, failed(1, "rake aborted"));
        let orchestrator = DeploymentOrchestrator::new(&executor, None);

        let err = orchestrator.run(&five_step_plan()).unwrap_err();

        assert_eq!(executor.commands().len(), 3);
        assert_eq!(err.code, crate::ErrorCode::DeployStepFailed);
        assert_eq!(err.details["step"], "step_3");
        assert_eq!(err.details["exitCode"], 1);
        assert_eq!(err.details["stderr"], "rake aborted");
        assert_eq!(err.details["releaseId"], "20230110083000");
    }

    #[test]
    fn timeout_exit_code_maps_to_step_timeout() {
        let executor = ScriptedExecutor::new().respond_at(0, failed(124, ""));
        let orchestrator = DeploymentOrchestrator::new(&executor, Some(30));

        let err = orchestrator.run(&five_step_plan()).unwrap_err();

        assert_eq!(err.code, crate::ErrorCode::DeployStepTimeout);
        assert!(executor.commands()[0].starts_with("timeout 30 sh -c "));
    }

    #[test]
    fn timeout_wrapper_is_absent_when_unconfigured() {
        let executor = ScriptedExecutor::new();
        let orchestrator = DeploymentOrchestrator::new(&executor, None);

        orchestrator.run(&five_step_plan()).unwrap();

        assert!(executor.commands().iter().all(|c| !c.contains("timeout")));
    }

    #[test]
    fn activation_reads_previous_current_and_reports_superseded() {
        let plan = ReleasePlan {
            target: TargetName::Staging,
            release_id: ReleaseId::parse("20230110083000").unwrap(),
            mode: Mode::Restart,
            current_path: "/projects/alarms/current".to_string(),
            steps: vec![Step {
                name: step_names::ACTIVATE.to_string(),
                command: "ln -sfn v current.new && mv -Tf current.new current".to_string(),
                kind: StepKind::SafeToRetry,
            }],
        };

        let executor = ScriptedExecutor::new().respond_at(
            0,
            CommandOutput {
                stdout: "/projects/alarms/versions/20230101120000\n".to_string(),
                stderr: String::new(),
                success: true,
                exit_code: 0,
            },
        );
        let orchestrator = DeploymentOrchestrator::new(&executor, None);

        let report = orchestrator.run(&plan).unwrap();

        assert_eq!(executor.commands()[0], "readlink '/projects/alarms/current'");
        assert_eq!(
            report.superseded,
            Some(ReleaseId::parse("20230101120000").unwrap())
        );
        assert_eq!(report.record.status, ReleaseStatus::Active);
    }

    #[test]
    fn standalone_step_reports_exit_code() {
        let executor = ScriptedExecutor::new();
        let orchestrator = DeploymentOrchestrator::new(&executor, None);
        let step = Step {
            name: "stop".to_string(),
            command: "kill `cat /projects/alarms/shared/unicorn.pid`".to_string(),
            kind: StepKind::SafeToRetry,
        };

        let report = orchestrator
            .run_standalone(TargetName::Production, &step)
            .unwrap();

        assert_eq!(report.exit_code, 0);
        assert_eq!(executor.commands().len(), 1);
    }
}
