mod cli;

use anyhow::Context;
use artipipe::backends::{Backend, DryRunBackend, LocalBackend};
use artipipe::pipeline::executor::{ExecOptions, PipelineExecutor};
use artipipe::pipeline::ShellFlavor;
use artipipe::{prepare, FieldResolver, PipelineBuilder, PluginArgs};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opts = cli::get_opts();

    let resolver = FieldResolver::new();
    let args = PluginArgs::load(&resolver, opts.settings().args_file.as_deref())
        .context("failed to load plugin settings")?;

    init_logging(&args.level, opts.verbose);

    match opts.command {
        cli::Commands::Run(run_opts) => run(&resolver, args, run_opts).await,
        cli::Commands::Validate(_) => validate(&resolver, args),
    }
}

/// Message-only output at info; level-annotated once debug or trace is on.
fn init_logging(plugin_level: &str, verbose: u8) {
    let level = match verbose {
        0 => match plugin_level.trim().to_ascii_lowercase().as_str() {
            "debug" => "debug",
            "trace" => "trace",
            _ => "info",
        },
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if level == "info" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().without_time().with_target(false).with_level(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false))
            .init();
    }
}

async fn run(resolver: &FieldResolver, mut args: PluginArgs, opts: cli::RunOpts) -> anyhow::Result<()> {
    let hooks = prepare::default_hooks(&opts.work_dir);
    let child_env = prepare::prepare(&mut args, &hooks)?;

    let flavor = ShellFlavor::host();
    let pipeline = PipelineBuilder::new(resolver, flavor)
        .build(&args)
        .context("failed to build pipeline")?;

    let mut env: Vec<(String, String)> = child_env.into_iter().collect();
    env.extend(args.secret_env(resolver));

    let backend: Arc<dyn Backend> = if opts.dry_run {
        Arc::new(DryRunBackend::new())
    } else {
        Arc::new(LocalBackend::new(flavor))
    };
    let executor = PipelineExecutor::new(
        backend,
        flavor,
        ExecOptions {
            cwd: opts.work_dir.clone(),
            timeout_secs: opts.timeout,
            record_dir: opts.record_dir.clone(),
            env,
            echo_output: true,
        },
    );

    let report = executor.run(&pipeline).await.context("pipeline run failed")?;
    if let Some(dir) = &report.run_dir {
        info!("Step logs written to {}", dir.display());
    }
    Ok(())
}

fn validate(resolver: &FieldResolver, mut args: PluginArgs) -> anyhow::Result<()> {
    prepare::normalize(&mut args);

    let flavor = ShellFlavor::host();
    let pipeline = PipelineBuilder::new(resolver, flavor)
        .build(&args)
        .context("failed to build pipeline")?;

    println!("{}:", pipeline.operation());
    for command in pipeline.commands() {
        println!("  {}", command.render_with(flavor.cli_binary()));
    }
    println!("Pipeline validated");
    Ok(())
}
