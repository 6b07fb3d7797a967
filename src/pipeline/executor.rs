use crate::backends::{Backend, StepOutput};
use crate::error::EngineError;
use crate::pipeline::{Pipeline, ShellFlavor};
use crate::util::{create_run_dir, timestamp, write_artifact};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Always set for the wrapped CLI so it never prompts.
pub const BASE_CHILD_ENV: &[(&str, &str)] = &[("JFROG_CLI_OFFER_CONFIG", "false")];

#[derive(Debug, Clone)]
pub struct ExecOptions {
    pub cwd: PathBuf,
    pub timeout_secs: Option<u64>,
    /// When set, per-step logs land in `<dir>/runs/<uuid>/`.
    pub record_dir: Option<PathBuf>,
    /// Added on top of the inherited process environment.
    pub env: Vec<(String, String)>,
    /// Echo captured stdout/stderr of each step.
    pub echo_output: bool,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            cwd: PathBuf::from("."),
            timeout_secs: None,
            record_dir: None,
            env: Vec::new(),
            echo_output: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub index: usize,
    pub command: String,
    #[serde(flatten)]
    pub output: StepOutput,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub steps: Vec<StepRecord>,
    pub run_dir: Option<PathBuf>,
}

impl RunReport {
    pub fn executed(&self) -> usize {
        self.steps.len()
    }
}

/// Runs a pipeline's commands one after another, stopping at the first
/// non-zero exit.
pub struct PipelineExecutor {
    backend: Arc<dyn Backend>,
    flavor: ShellFlavor,
    options: ExecOptions,
}

impl PipelineExecutor {
    pub fn new(backend: Arc<dyn Backend>, flavor: ShellFlavor, options: ExecOptions) -> Self {
        Self {
            backend,
            flavor,
            options,
        }
    }

    fn child_env(&self) -> Vec<(String, String)> {
        let mut env: Vec<(String, String)> = BASE_CHILD_ENV
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        env.extend(self.options.env.iter().cloned());
        env
    }

    /// A failing step surfaces as [`EngineError::PipelineStepFailure`] inside
    /// the returned error; earlier steps are not undone.
    pub async fn run(&self, pipeline: &Pipeline) -> anyhow::Result<RunReport> {
        info!("Starting {} ({} steps)", pipeline.operation(), pipeline.len());

        let run_dir = match &self.options.record_dir {
            Some(base) => Some(create_run_dir(base)?),
            None => None,
        };
        let env = self.child_env();
        let mut report = RunReport {
            steps: Vec::with_capacity(pipeline.len()),
            run_dir: run_dir.clone(),
        };

        for (i, command) in pipeline.commands().iter().enumerate() {
            let index = i + 1;
            let line = command.render_with(self.flavor.cli_binary());
            info!("+ {}", line);

            let output = self
                .backend
                .run(&line, &self.options.cwd, &env, self.options.timeout_secs)
                .await
                .map_err(|e| e.context(format!("step {} could not be run", index)))?;

            if self.options.echo_output {
                if !output.stdout.trim().is_empty() {
                    println!("{}", output.stdout.trim_end());
                }
                if !output.stderr.trim().is_empty() {
                    eprintln!("{}", output.stderr.trim_end());
                }
            }

            if let Some(dir) = &run_dir {
                record_step(dir, index, &line, &output)?;
            }

            let success = output.success();
            let exit_status = output.exit_code;
            report.steps.push(StepRecord {
                index,
                command: line.clone(),
                output,
            });

            if !success {
                warn!("step {} failed, skipping {} remaining", index, pipeline.len() - index);
                return Err(EngineError::PipelineStepFailure {
                    command: line,
                    exit_status,
                }
                .into());
            }
        }

        info!("Pipeline finished");
        Ok(report)
    }
}

fn record_step(
    dir: &std::path::Path,
    index: usize,
    line: &str,
    output: &StepOutput,
) -> anyhow::Result<()> {
    let summary = format!(
        "Cmd: {}\nExit: {:?}\nStdout:\n{}\nStderr:\n{}\n",
        line, output.exit_code, output.stdout, output.stderr
    );
    write_artifact(dir, &format!("step-{:02}.log", index), &summary)?;

    let meta = json!({
        "step": index,
        "command": line,
        "exit_code": output.exit_code,
        "timestamp": timestamp(),
    });
    write_artifact(dir, &format!("step-{:02}.json", index), &meta.to_string())?;
    Ok(())
}
