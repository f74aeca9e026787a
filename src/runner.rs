use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use tracing::{info, warn};

use crate::config::Config;
use crate::error::{AutoCommitError, Step};
use crate::gitops::{CommandExecutor, GitFailure, GitWorker, StepOutcome};
use crate::report::{Outcome, RunReport, StepStatus};
use crate::util::{commit_message, iso, now_utc, Clock};

/// Run the pipeline against the real `git`.
pub fn run(cfg: &Config, clock: &impl Clock) -> RunReport {
    run_with(cfg, clock, |dir| GitWorker::new(dir, cfg.git.clone()))
}

/// Resolve the directory, then stage, commit and push through the worker
/// `make_worker` builds for it. Stops at the first failure.
pub fn run_with<E, F>(cfg: &Config, clock: &impl Clock, make_worker: F) -> RunReport
where
    E: CommandExecutor,
    F: FnOnce(PathBuf) -> GitWorker<E>,
{
    let mut report = RunReport::new(iso(now_utc()), cfg.dir.clone());

    let dir = match fs::metadata(&cfg.dir) {
        Ok(m) if m.is_dir() => fs::canonicalize(&cfg.dir).unwrap_or_else(|_| cfg.dir.clone()),
        _ => {
            report.error = Some(AutoCommitError::DirectoryNotFound(cfg.dir.clone()));
            return report;
        }
    };
    report.dir = dir.clone();

    report.message = commit_message(&cfg.message_prefix, clock.now());
    info!(dir = %dir.display(), message = %report.message, "auto-commit starting");

    let mut git = make_worker(dir);
    git.set_deadline(cfg.timeout.map(|t| Instant::now() + t));

    match git.stage_all() {
        StepOutcome::Failure(f) => return fail(report, Step::Stage, f),
        _ => report.stage = StepStatus::Ok,
    }
    info!("staged");

    match git.commit(&report.message) {
        StepOutcome::Success(_) => report.commit = StepStatus::Ok,
        StepOutcome::BenignNoOp(out) => {
            warn!(git = %out.stdout.trim_end(), "nothing to commit");
            report.commit = StepStatus::NoChanges;
            report.outcome = Outcome::NoChanges;
            return report;
        }
        StepOutcome::Failure(f) => return fail(report, Step::Commit, f),
    }
    info!("committed");

    if cfg.dry_run {
        warn!("dry run, push skipped");
        report.push = StepStatus::DryRun;
        report.outcome = Outcome::CommittedLocally;
        return report;
    }

    match git.push(cfg.remote.as_deref(), cfg.branch.as_deref()) {
        StepOutcome::Failure(f) => return fail(report, Step::Push, f),
        StepOutcome::Success(out) | StepOutcome::BenignNoOp(out) => {
            report.push = StepStatus::Ok;
            info!(git = %out.stderr.trim_end(), "pushed");
        }
    }

    report.outcome = Outcome::Pushed;
    report
}

fn fail(mut report: RunReport, step: Step, failure: GitFailure) -> RunReport {
    match step {
        Step::Stage => report.stage = StepStatus::Failed,
        Step::Commit => report.commit = StepStatus::Failed,
        Step::Push => report.push = StepStatus::Failed,
    }
    report.outcome = if step == Step::Push { Outcome::CommittedLocally } else { Outcome::Failed };
    report.error = Some(AutoCommitError::from_step(step, failure));
    report
}
