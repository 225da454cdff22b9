//! Platform maintenance tasks built from shell commands.
//!
//! Each task has a fixed command plan per platform. Plans are executed through
//! a [`CommandRunner`], which is the only place a process is actually spawned.
//! Some plan steps use the platform shell so that their wildcards expand, and
//! none of them ask for confirmation: callers that want a look first should
//! print [`MaintenanceTask::plan`] instead of running it.

use serde::Serialize;
use std::fmt;
use std::process::Command;
use tracing::{debug, info, warn};

/// Operating systems with a maintenance plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
}

impl Platform {
    /// The platform this binary was built for, if it has a plan.
    pub fn current() -> Option<Self> {
        Self::from_os(std::env::consts::OS)
    }

    /// Maps a `std::env::consts::OS` value to a platform.
    pub fn from_os(os: &str) -> Option<Self> {
        match os {
            "linux" => Some(Platform::Linux),
            "macos" => Some(Platform::MacOs),
            "windows" => Some(Platform::Windows),
            _ => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Linux => "Linux",
            Platform::MacOs => "macOS",
            Platform::Windows => "Windows",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MaintenanceError {
    #[error("no maintenance plan for operating system '{0}'")]
    UnsupportedPlatform(String),
}

/// A program invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShellCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ShellCommand {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Runs `script` through the POSIX shell, optionally under `sudo`.
    fn posix_shell(script: &str, elevated: bool) -> Self {
        if elevated {
            Self::new("sudo", ["sh", "-c", script])
        } else {
            Self::new("sh", ["-c", script])
        }
    }

    /// Runs a `cmd.exe` builtin or program.
    fn windows_shell(line: &str) -> Self {
        Self::new("cmd", ["/C", line])
    }
}

impl fmt::Display for ShellCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.contains(char::is_whitespace) {
                write!(f, " '{}'", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// How a command ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CommandOutcome {
    Succeeded,
    /// The process ran and exited unsuccessfully. `code` is absent when it was
    /// killed by a signal.
    Failed { code: Option<i32> },
    /// The process could not be started at all.
    NotLaunched { reason: String },
}

impl CommandOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CommandOutcome::Succeeded)
    }
}

/// Capability to execute shell commands.
pub trait CommandRunner {
    fn run(&mut self, command: &ShellCommand) -> CommandOutcome;
}

/// Runs commands as child processes sharing this process's terminal, so
/// password prompts from `sudo` reach the user.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&mut self, command: &ShellCommand) -> CommandOutcome {
        match Command::new(&command.program).args(&command.args).status() {
            Ok(status) if status.success() => CommandOutcome::Succeeded,
            Ok(status) => CommandOutcome::Failed {
                code: status.code(),
            },
            Err(e) => CommandOutcome::NotLaunched {
                reason: e.to_string(),
            },
        }
    }
}

/// What to do after a step fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    Continue,
    Stop,
}

/// The commands for one task on one platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub steps: Vec<ShellCommand>,
    pub on_failure: FailurePolicy,
}

/// Maintenance actions offered by the control panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceTask {
    /// Empty trash, logs and package caches.
    DiskCleanup,
    /// Remove unused packages and stale update or application caches.
    PackagePrune,
}

impl fmt::Display for MaintenanceTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaintenanceTask::DiskCleanup => f.write_str("Disk cleanup"),
            MaintenanceTask::PackagePrune => f.write_str("Unnecessary files removal"),
        }
    }
}

impl MaintenanceTask {
    /// The command plan for this task on `platform`.
    pub fn plan(self, platform: Platform) -> Plan {
        match (self, platform) {
            (MaintenanceTask::DiskCleanup, Platform::Windows) => Plan {
                steps: vec![ShellCommand::windows_shell("cleanmgr")],
                on_failure: FailurePolicy::Continue,
            },
            (MaintenanceTask::DiskCleanup, Platform::MacOs) => Plan {
                steps: vec![
                    ShellCommand::posix_shell("rm -rf ~/.Trash/*", true),
                    ShellCommand::posix_shell("rm -rf /private/var/log/*", true),
                ],
                on_failure: FailurePolicy::Continue,
            },
            (MaintenanceTask::DiskCleanup, Platform::Linux) => Plan {
                steps: vec![
                    ShellCommand::new("sudo", ["apt", "clean"]),
                    ShellCommand::new("sudo", ["journalctl", "--vacuum-time=3d"]),
                ],
                on_failure: FailurePolicy::Continue,
            },
            (MaintenanceTask::PackagePrune, Platform::Windows) => Plan {
                steps: vec![
                    ShellCommand::windows_shell("net stop wuauserv"),
                    ShellCommand::windows_shell(r"rmdir /S /Q C:\Windows\SoftwareDistribution"),
                    ShellCommand::windows_shell("net start wuauserv"),
                ],
                on_failure: FailurePolicy::Continue,
            },
            (MaintenanceTask::PackagePrune, Platform::MacOs) => Plan {
                steps: vec![
                    ShellCommand::posix_shell("rm -rf ~/Library/Caches/*", false),
                    ShellCommand::posix_shell("rm -rf ~/Library/Logs/*", false),
                ],
                on_failure: FailurePolicy::Continue,
            },
            (MaintenanceTask::PackagePrune, Platform::Linux) => Plan {
                steps: vec![
                    ShellCommand::new("sudo", ["apt", "autoremove"]),
                    ShellCommand::new("sudo", ["apt", "autoclean"]),
                ],
                on_failure: FailurePolicy::Stop,
            },
        }
    }

    /// The plan for the platform this binary runs on.
    pub fn current_plan(self) -> Result<(Platform, Plan), MaintenanceError> {
        let platform = Platform::current().ok_or_else(|| {
            MaintenanceError::UnsupportedPlatform(std::env::consts::OS.to_string())
        })?;
        Ok((platform, self.plan(platform)))
    }
}

/// One executed step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    pub command: String,
    #[serde(flatten)]
    pub outcome: CommandOutcome,
}

/// Result of running a task's plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaintenanceReport {
    pub task: MaintenanceTask,
    pub platform: Platform,
    pub steps: Vec<StepRecord>,
    /// The plan stopped before its last step because of a failure.
    pub halted: bool,
}

impl MaintenanceReport {
    pub fn is_success(&self) -> bool {
        !self.halted && self.steps.iter().all(|step| step.outcome.is_success())
    }
}

/// Executes `plan` step by step through `runner`.
pub fn run_plan(
    runner: &mut dyn CommandRunner,
    task: MaintenanceTask,
    platform: Platform,
    plan: &Plan,
) -> MaintenanceReport {
    info!(%task, %platform, steps = plan.steps.len(), "running maintenance task");

    let mut report = MaintenanceReport {
        task,
        platform,
        steps: Vec::with_capacity(plan.steps.len()),
        halted: false,
    };

    for (index, command) in plan.steps.iter().enumerate() {
        debug!(%command, "running step");
        let outcome = runner.run(command);
        let failed = !outcome.is_success();
        if failed {
            warn!(%command, ?outcome, "maintenance step failed");
        }

        report.steps.push(StepRecord {
            command: command.to_string(),
            outcome,
        });

        if failed && plan.on_failure == FailurePolicy::Stop {
            report.halted = index + 1 < plan.steps.len();
            break;
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Replays scripted outcomes and remembers what it was asked to run.
    struct ScriptedRunner {
        outcomes: VecDeque<CommandOutcome>,
        ran: Vec<String>,
    }

    impl ScriptedRunner {
        fn new(outcomes: Vec<CommandOutcome>) -> Self {
            Self {
                outcomes: outcomes.into(),
                ran: Vec::new(),
            }
        }
    }

    impl CommandRunner for ScriptedRunner {
        fn run(&mut self, command: &ShellCommand) -> CommandOutcome {
            self.ran.push(command.to_string());
            self.outcomes.pop_front().unwrap_or(CommandOutcome::Succeeded)
        }
    }

    #[test]
    fn test_platform_from_os() {
        assert_eq!(Platform::from_os("linux"), Some(Platform::Linux));
        assert_eq!(Platform::from_os("macos"), Some(Platform::MacOs));
        assert_eq!(Platform::from_os("windows"), Some(Platform::Windows));
        assert_eq!(Platform::from_os("freebsd"), None);
    }

    #[test]
    fn test_linux_disk_cleanup_plan() {
        let plan = MaintenanceTask::DiskCleanup.plan(Platform::Linux);
        let rendered: Vec<_> = plan.steps.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec!["sudo apt clean", "sudo journalctl --vacuum-time=3d"]
        );
        assert_eq!(plan.on_failure, FailurePolicy::Continue);
    }

    #[test]
    fn test_macos_wildcards_go_through_shell() {
        let plan = MaintenanceTask::PackagePrune.plan(Platform::MacOs);
        assert_eq!(
            plan.steps[0],
            ShellCommand::new("sh", ["-c", "rm -rf ~/Library/Caches/*"])
        );
        assert_eq!(plan.steps[0].to_string(), "sh -c 'rm -rf ~/Library/Caches/*'");
    }

    #[test]
    fn test_windows_prune_restarts_update_service() {
        let plan = MaintenanceTask::PackagePrune.plan(Platform::Windows);
        assert_eq!(plan.steps.len(), 3);
        assert_eq!(plan.steps[0].args, vec!["/C", "net stop wuauserv"]);
        assert_eq!(plan.steps[2].args, vec!["/C", "net start wuauserv"]);
    }

    #[test]
    fn test_continue_policy_runs_every_step() {
        let plan = MaintenanceTask::DiskCleanup.plan(Platform::Linux);
        let mut runner = ScriptedRunner::new(vec![CommandOutcome::Failed { code: Some(100) }]);

        let report = run_plan(&mut runner, MaintenanceTask::DiskCleanup, Platform::Linux, &plan);

        assert_eq!(runner.ran.len(), 2);
        assert!(!report.halted);
        assert!(!report.is_success());
        assert_eq!(report.steps[1].outcome, CommandOutcome::Succeeded);
    }

    #[test]
    fn test_stop_policy_halts_after_failure() {
        let plan = MaintenanceTask::PackagePrune.plan(Platform::Linux);
        let mut runner = ScriptedRunner::new(vec![CommandOutcome::NotLaunched {
            reason: "No such file or directory".into(),
        }]);

        let report = run_plan(&mut runner, MaintenanceTask::PackagePrune, Platform::Linux, &plan);

        assert_eq!(runner.ran, vec!["sudo apt autoremove"]);
        assert!(report.halted);
        assert_eq!(report.steps.len(), 1);
    }

    #[test]
    fn test_all_steps_succeeding() {
        let plan = MaintenanceTask::PackagePrune.plan(Platform::Linux);
        let mut runner = ScriptedRunner::new(Vec::new());

        let report = run_plan(&mut runner, MaintenanceTask::PackagePrune, Platform::Linux, &plan);

        assert!(report.is_success());
        assert_eq!(report.steps.len(), 2);
    }

    #[test]
    fn test_system_runner_reports_missing_program() {
        let mut runner = SystemCommandRunner;
        let outcome = runner.run(&ShellCommand::new(
            "sysmaint-definitely-not-a-real-program",
            Vec::<String>::new(),
        ));
        assert!(matches!(outcome, CommandOutcome::NotLaunched { .. }));
    }
}
