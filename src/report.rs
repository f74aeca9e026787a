use std::fmt::Write;
use std::path::PathBuf;

use serde::Serialize;

use crate::error::{AutoCommitError, ExitCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepStatus {
    Ok,
    NoChanges,
    Failed,
    Skipped,
    DryRun,
}

impl StepStatus {
    fn label(self) -> &'static str {
        match self {
            StepStatus::Ok => "ok",
            StepStatus::NoChanges => "no changes",
            StepStatus::Failed => "FAILED",
            StepStatus::Skipped => "skipped",
            StepStatus::DryRun => "skipped (dry run)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    Pushed,
    CommittedLocally,
    NoChanges,
    Failed,
}

#[derive(Debug, Serialize)]
pub struct RunReport {
    pub started_at: String,
    pub dir: PathBuf,
    pub message: String,
    pub stage: StepStatus,
    pub commit: StepStatus,
    pub push: StepStatus,
    pub outcome: Outcome,
    #[serde(serialize_with = "ser_error", skip_serializing_if = "Option::is_none")]
    pub error: Option<AutoCommitError>,
}

fn ser_error<S: serde::Serializer>(e: &Option<AutoCommitError>, s: S) -> Result<S::Ok, S::Error> {
    match e {
        Some(e) => s.serialize_str(&e.to_string()),
        None => s.serialize_none(),
    }
}

impl RunReport {
    pub fn new(started_at: String, dir: PathBuf) -> Self {
        Self {
            started_at,
            dir,
            message: String::new(),
            stage: StepStatus::Skipped,
            commit: StepStatus::Skipped,
            push: StepStatus::Skipped,
            outcome: Outcome::Failed,
            error: None,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        self.error.as_ref().map_or(ExitCode::Success, AutoCommitError::exit_code)
    }

    pub fn render_text(&self) -> String {
        let mut s = String::new();
        let _ = writeln!(s, "message: {}", self.message);
        let _ = writeln!(s, "stage:   {}", self.stage.label());
        let _ = writeln!(s, "commit:  {}", self.commit.label());
        let _ = writeln!(s, "push:    {}", self.push.label());
        let _ = writeln!(s, "result:  {}", match self.outcome {
            Outcome::Pushed => "committed and pushed",
            Outcome::CommittedLocally => "committed locally",
            Outcome::NoChanges => "no changes",
            Outcome::Failed => "failed",
        });
        s
    }

    pub fn render_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Step;
    use crate::gitops::GitFailure;

    fn pushed() -> RunReport {
        RunReport {
            message: "Auto commit 2024-03-07 09:05".into(),
            stage: StepStatus::Ok,
            commit: StepStatus::Ok,
            push: StepStatus::Ok,
            outcome: Outcome::Pushed,
            ..RunReport::new("2024-03-07T08:05:00Z".into(), "/notes".into())
        }
    }

    #[test]
    fn text_lists_message_and_each_step() {
        let text = pushed().render_text();
        assert_eq!(
            text,
            "message: Auto commit 2024-03-07 09:05\n\
             stage:   ok\n\
             commit:  ok\n\
             push:    ok\n\
             result:  committed and pushed\n"
        );
    }

    #[test]
    fn json_shape_without_error() {
        let v: serde_json::Value = serde_json::from_str(&pushed().render_json().unwrap()).unwrap();
        assert_eq!(v["message"], "Auto commit 2024-03-07 09:05");
        assert_eq!(v["stage"], "ok");
        assert_eq!(v["outcome"], "pushed");
        assert_eq!(v["dir"], "/notes");
        assert!(v.get("error").is_none());
    }

    #[test]
    fn json_carries_error_text_and_exit_code() {
        let mut r = pushed();
        r.push = StepStatus::Failed;
        r.outcome = Outcome::Failed;
        r.error = Some(AutoCommitError::from_step(Step::Push, GitFailure {
            command: "git push".into(),
            code: Some(128),
            timed_out: false,
            diagnostics: "fatal: could not read from remote repository\n".into(),
        }));

        assert_eq!(r.exit_code(), ExitCode::Push);
        let v: serde_json::Value = serde_json::from_str(&r.render_json().unwrap()).unwrap();
        assert_eq!(v["push"], "failed");
        assert!(v["error"].as_str().unwrap().contains("could not read from remote repository"));
    }

    #[test]
    fn no_changes_exits_zero() {
        let r = RunReport {
            commit: StepStatus::NoChanges,
            push: StepStatus::Skipped,
            outcome: Outcome::NoChanges,
            ..pushed()
        };
        assert_eq!(r.exit_code(), ExitCode::Success);
        assert!(r.render_text().contains("commit:  no changes"));
        assert!(r.render_text().contains("push:    skipped"));
    }
}
