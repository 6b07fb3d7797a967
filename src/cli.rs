use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "artipipe")]
#[command(about = "Run artifact repository CLI pipelines from plugin settings", long_about = None)]
#[command(version)]
pub struct Opts {
    /// Verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the pipeline from the environment and execute it
    Run(RunOpts),
    /// Build the pipeline and print it without executing anything
    Validate(SettingsOpts),
}

#[derive(Args, Debug, Clone)]
pub struct SettingsOpts {
    /// YAML file with settings; environment variables override it
    #[arg(long, value_name = "FILE")]
    pub args_file: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct RunOpts {
    #[command(flatten)]
    pub settings: SettingsOpts,

    /// Log commands instead of running them
    #[arg(long)]
    pub dry_run: bool,

    /// Per-step timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Write per-step logs under DIR/runs/<id>/
    #[arg(long, value_name = "DIR")]
    pub record_dir: Option<PathBuf>,

    /// Working directory for the steps and generated spec files
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub work_dir: PathBuf,
}

impl Opts {
    pub fn settings(&self) -> &SettingsOpts {
        match &self.command {
            Commands::Run(run) => &run.settings,
            Commands::Validate(settings) => settings,
        }
    }
}

pub fn get_opts() -> Opts {
    Opts::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_flags() {
        let opts = Opts::try_parse_from([
            "artipipe",
            "-vv",
            "run",
            "--args-file",
            "settings.yml",
            "--dry-run",
            "--timeout",
            "30",
        ])
        .unwrap();
        assert_eq!(opts.verbose, 2);
        assert_eq!(opts.settings().args_file, Some(PathBuf::from("settings.yml")));
        match opts.command {
            Commands::Run(run) => {
                assert!(run.dry_run);
                assert_eq!(run.timeout, Some(30));
                assert_eq!(run.work_dir, PathBuf::from("."));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn validate_takes_no_run_flags() {
        assert!(Opts::try_parse_from(["artipipe", "validate"]).is_ok());
        assert!(Opts::try_parse_from(["artipipe", "validate", "--dry-run"]).is_err());
        assert!(Opts::try_parse_from(["artipipe"]).is_err());
    }
}
