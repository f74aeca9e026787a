mod config;
mod error;
mod gitops;
mod report;
mod runner;
mod util;

use std::path::PathBuf;

use clap::{ArgAction, Parser};
use tracing_subscriber::EnvFilter;

use crate::config::{Config, Overrides};
use crate::error::ExitCode;

#[derive(Parser)]
#[command(name="autocommit", version, about="Stage, commit and push a directory with a timestamped message")]
struct Cli {
    /// Working directory to commit (must be inside a git repository)
    #[arg(long, env="AUTOCOMMIT_DIR")]
    dir: Option<PathBuf>,
    /// Text placed before the timestamp in the commit message
    #[arg(long, env="AUTOCOMMIT_MESSAGE_PREFIX")]
    message_prefix: Option<String>,
    /// Remote to push to
    #[arg(long, env="AUTOCOMMIT_REMOTE")]
    remote: Option<String>,
    /// Branch to push
    #[arg(long, env="AUTOCOMMIT_BRANCH")]
    branch: Option<String>,
    /// Stage and commit, skip the push
    #[arg(long)]
    dry_run: bool,
    /// Overall deadline in seconds for stage, commit and push (0 = none)
    #[arg(long, env="AUTOCOMMIT_TIMEOUT")]
    timeout: Option<u64>,
    /// JSON config file
    #[arg(long, env="AUTOCOMMIT_CONFIG")]
    config: Option<PathBuf>,
    /// git executable
    #[arg(long, env="AUTOCOMMIT_GIT")]
    git: Option<String>,
    /// Print the report as JSON
    #[arg(long)]
    json: bool,
    /// More logging on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action=ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            dir: self.dir.clone(),
            message_prefix: self.message_prefix.clone(),
            remote: self.remote.clone(),
            branch: self.branch.clone(),
            dry_run: self.dry_run,
            timeout_secs: self.timeout,
            git: self.git.clone(),
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::try_parse().unwrap_or_else(|e| {
        let code = if e.use_stderr() { ExitCode::Usage.code() } else { ExitCode::Success.code() };
        let _ = e.print();
        std::process::exit(code);
    });
    init_logging(cli.verbose);

    let file = match cli.config.as_deref().map(config::load).transpose() {
        Ok(file) => file.unwrap_or_default(),
        Err(e) => {
            eprintln!("config error: {e:#}");
            std::process::exit(ExitCode::Error.code());
        }
    };
    let cfg = Config::resolve(file, cli.overrides());

    let report = runner::run(&cfg, &util::SystemClock);

    if cli.json {
        match report.render_json() {
            Ok(s) => println!("{s}"),
            Err(e) => { eprintln!("report: {e}"); std::process::exit(ExitCode::Error.code()); }
        }
    } else {
        print!("{}", report.render_text());
    }
    if let Some(e) = &report.error {
        eprintln!("error: {e}");
    }
    std::process::exit(report.exit_code().code());
}
