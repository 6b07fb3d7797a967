//! Operation registry and pipeline composition.
//!
//! Every supported operation maps to a fixed list of steps. A step expands to
//! zero or more commands; gated steps drop out when their trigger fields are
//! empty. Any step error discards the whole pipeline.

use crate::args::{tags, PluginArgs};
use crate::error::EngineError;
use crate::pipeline::assembler::CommandAssembler;
use crate::pipeline::auth::{CredentialSelector, ShellFlavor};
use crate::pipeline::endpoint::sanitize_url;
use crate::pipeline::operation::{BuildTool, Operation, Verb};
use crate::pipeline::rules::{self, ArgumentRule, DISCARD_TRIGGERS};
use crate::pipeline::{Command, Pipeline};
use crate::resolver::FieldResolver;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Alias used when the operation's alias field is empty.
pub const DEFAULT_SERVER_ID: &str = "tmpServerId";

/// Appended to the alias registered for the discard sub-step.
pub const DISCARD_ALIAS_SUFFIX: &str = "-discard";

type RunFn = fn(&StepContext<'_>) -> Result<Command, EngineError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Gate {
    Always,
    /// Only when the record asks for it.
    OnRequest,
}

#[derive(Clone, Copy)]
enum Step {
    ConfigureAuth,
    ToolConfig(&'static str, &'static [ArgumentRule]),
    Run(RunFn),
    PublishBuildInfo(Gate),
    DiscardOldBuilds(Gate),
}

const MAVEN_BUILD: &[Step] = &[
    Step::ConfigureAuth,
    Step::ToolConfig("mvn-config", rules::MAVEN_CONFIG),
    Step::Run(maven_build),
    Step::PublishBuildInfo(Gate::OnRequest),
    Step::DiscardOldBuilds(Gate::OnRequest),
];

const MAVEN_PUBLISH: &[Step] = &[
    Step::ConfigureAuth,
    Step::ToolConfig("mvn-config", rules::MAVEN_CONFIG),
    Step::Run(maven_publish),
    Step::PublishBuildInfo(Gate::Always),
    Step::DiscardOldBuilds(Gate::OnRequest),
];

const GRADLE_BUILD: &[Step] = &[
    Step::ConfigureAuth,
    Step::ToolConfig("gradle-config", rules::GRADLE_CONFIG),
    Step::Run(gradle_build),
    Step::PublishBuildInfo(Gate::OnRequest),
    Step::DiscardOldBuilds(Gate::OnRequest),
];

const GRADLE_PUBLISH: &[Step] = &[
    Step::ConfigureAuth,
    Step::ToolConfig("gradle-config", rules::GRADLE_CONFIG),
    Step::Run(gradle_publish),
    Step::PublishBuildInfo(Gate::Always),
    Step::DiscardOldBuilds(Gate::OnRequest),
];

const UPLOAD: &[Step] = &[
    Step::ConfigureAuth,
    Step::Run(upload),
    Step::PublishBuildInfo(Gate::OnRequest),
];

const DOWNLOAD: &[Step] = &[
    Step::ConfigureAuth,
    Step::Run(download),
    Step::PublishBuildInfo(Gate::OnRequest),
];

const CLEANUP: &[Step] = &[Step::ConfigureAuth, Step::Run(cleanup)];

const SCAN: &[Step] = &[Step::Run(scan)];

const PROMOTE: &[Step] = &[Step::Run(promote)];

const DISCARD: &[Step] = &[Step::DiscardOldBuilds(Gate::Always)];

const CREATE_BUILD_INFO: &[Step] = &[Step::Run(collect_env)];

const PUBLISH_BUILD_INFO: &[Step] = &[Step::ConfigureAuth, Step::PublishBuildInfo(Gate::Always)];

const ADD_DEPENDENCIES: &[Step] = &[
    Step::ConfigureAuth,
    Step::Run(add_dependencies),
    Step::PublishBuildInfo(Gate::Always),
];

static REGISTRY: Lazy<HashMap<Operation, &'static [Step]>> = Lazy::new(|| {
    use BuildTool::{Gradle, Maven, None as NoTool};
    HashMap::from([
        (Operation::new(Maven, Verb::Build), MAVEN_BUILD),
        (Operation::new(Maven, Verb::Publish), MAVEN_PUBLISH),
        (Operation::new(Gradle, Verb::Build), GRADLE_BUILD),
        (Operation::new(Gradle, Verb::Publish), GRADLE_PUBLISH),
        (Operation::new(NoTool, Verb::Upload), UPLOAD),
        (Operation::new(NoTool, Verb::Download), DOWNLOAD),
        (Operation::new(NoTool, Verb::Cleanup), CLEANUP),
        (Operation::new(NoTool, Verb::Scan), SCAN),
        (Operation::new(NoTool, Verb::Promote), PROMOTE),
        (Operation::new(NoTool, Verb::Discard), DISCARD),
        (Operation::new(NoTool, Verb::CreateBuildInfo), CREATE_BUILD_INFO),
        (Operation::new(NoTool, Verb::PublishBuildInfo), PUBLISH_BUILD_INFO),
        (Operation::new(NoTool, Verb::AddDependencies), ADD_DEPENDENCIES),
    ])
});

/// Everything a step needs to render its commands.
pub struct StepContext<'a> {
    pub args: &'a PluginArgs,
    pub operation: Operation,
    pub alias: String,
    pub assembler: CommandAssembler<'a>,
    pub credentials: CredentialSelector<'a>,
}

impl StepContext<'_> {
    fn required(&self, tag: &str) -> Result<String, EngineError> {
        self.assembler.required(self.args, tag)
    }

    fn optional(&self, tag: &str) -> Result<Option<String>, EngineError> {
        self.assembler.optional(self.args, tag)
    }

    fn flags(&self, rules: &[ArgumentRule]) -> Result<Vec<String>, EngineError> {
        self.assembler.assemble(rules, self.args)
    }

    fn url(&self) -> Result<String, EngineError> {
        sanitize_url(&self.required(tags::URL)?)
    }

    fn server_id_flag(&self) -> String {
        format!("--server-id={}", self.alias)
    }
}

/// Builds a [`Pipeline`] for the operation a record asks for.
pub struct PipelineBuilder<'a> {
    resolver: &'a FieldResolver,
    flavor: ShellFlavor,
}

impl<'a> PipelineBuilder<'a> {
    pub fn new(resolver: &'a FieldResolver, flavor: ShellFlavor) -> Self {
        Self { resolver, flavor }
    }

    pub fn flavor(&self) -> ShellFlavor {
        self.flavor
    }

    /// Operations the registry knows about.
    pub fn supported() -> Vec<Operation> {
        REGISTRY.keys().copied().collect()
    }

    pub fn build(&self, args: &PluginArgs) -> Result<Pipeline, EngineError> {
        let operation = Operation::from_args(args)?;
        self.build_operation(operation, args)
    }

    pub fn build_operation(
        &self,
        operation: Operation,
        args: &PluginArgs,
    ) -> Result<Pipeline, EngineError> {
        let key = operation.normalized();
        let steps = REGISTRY
            .get(&key)
            .ok_or_else(|| EngineError::UnsupportedOperation {
                tool: operation.tool.as_str().to_string(),
                command: operation.verb.as_str().to_string(),
            })?;

        let assembler = CommandAssembler::new(self.resolver);
        let alias = assembler
            .optional(args, key.verb.alias_tag())?
            .unwrap_or_else(|| DEFAULT_SERVER_ID.to_string());
        let ctx = StepContext {
            args,
            operation: key,
            alias,
            assembler,
            credentials: CredentialSelector::new(self.resolver, self.flavor),
        };

        let mut commands = Vec::new();
        for step in steps.iter() {
            match *step {
                Step::ConfigureAuth => commands.push(configure_auth(&ctx, &ctx.alias)?),
                Step::ToolConfig(head, rules) => commands.push(tool_config(&ctx, head, rules)?),
                Step::Run(run) => commands.push(run(&ctx)?),
                Step::PublishBuildInfo(gate) => {
                    if let Some(cmd) = publish_build_info(&ctx, gate)? {
                        commands.push(cmd);
                    }
                }
                Step::DiscardOldBuilds(gate) => commands.extend(discard_old_builds(&ctx, gate)?),
            }
        }

        debug!("{}: {} command(s)", key, commands.len());
        Ok(Pipeline::new(key, commands))
    }
}

fn configure_auth(ctx: &StepContext<'_>, alias: &str) -> Result<Command, EngineError> {
    let mut cmd = Command::new(["config", "add", alias]);
    cmd.push(format!("--url={}", ctx.url()?));
    cmd.extend(ctx.credentials.tokens(ctx.args)?);
    cmd.push("--interactive=false");
    Ok(cmd)
}

fn tool_config(
    ctx: &StepContext<'_>,
    head: &'static str,
    rules: &[ArgumentRule],
) -> Result<Command, EngineError> {
    let mut cmd = Command::new([head]);
    cmd.extend(ctx.flags(rules)?);
    if ctx.operation.verb == Verb::Publish {
        cmd.push(format!("--server-id-deploy={}", ctx.alias));
    }
    cmd.push(format!("--server-id-resolve={}", ctx.alias));
    Ok(cmd)
}

fn push_file_arg(
    ctx: &StepContext<'_>,
    cmd: &mut Command,
    switch: &str,
    tag: &str,
) -> Result<(), EngineError> {
    if let Some(path) = ctx.optional(tag)? {
        cmd.extend([switch.to_string(), path]);
    }
    Ok(())
}

/// Run flags, then the project key fallback, the file switch and any
/// pass-through arguments, in that order.
fn tool_run(
    ctx: &StepContext<'_>,
    mut cmd: Command,
    table: &[ArgumentRule],
    switch: &str,
    file_tag: &str,
) -> Result<Command, EngineError> {
    cmd.extend(ctx.flags(table)?);
    if !cmd.tokens().iter().any(|t| t.starts_with("--project=")) {
        if let Some(key) = ctx.optional(tags::PROJECT_KEY)? {
            cmd.push(format!("--project={}", key));
        }
    }
    push_file_arg(ctx, &mut cmd, switch, file_tag)?;
    if let Some(extra) = ctx.optional(tags::OPTIONAL_ARGS)? {
        cmd.push(extra);
    }
    Ok(cmd)
}

fn maven_build(ctx: &StepContext<'_>) -> Result<Command, EngineError> {
    let cmd = Command::new(["mvn".to_string(), ctx.required(tags::GOALS)?]);
    tool_run(ctx, cmd, rules::MAVEN_RUN, "-f", tags::POM_FILE)
}

fn maven_publish(ctx: &StepContext<'_>) -> Result<Command, EngineError> {
    let goals = ctx.optional(tags::GOALS)?.unwrap_or_else(|| "deploy".to_string());
    let cmd = Command::new(["mvn".to_string(), goals]);
    tool_run(ctx, cmd, rules::MAVEN_RUN, "-f", tags::POM_FILE)
}

fn gradle_build(ctx: &StepContext<'_>) -> Result<Command, EngineError> {
    let cmd = Command::new(["gradle".to_string(), ctx.required(tags::TASKS)?]);
    tool_run(ctx, cmd, rules::GRADLE_RUN, "-b", tags::BUILD_FILE)
}

fn gradle_publish(ctx: &StepContext<'_>) -> Result<Command, EngineError> {
    let tasks = ctx.optional(tags::TASKS)?.unwrap_or_else(|| "publish".to_string());
    let mut cmd = Command::new(["gradle".to_string(), tasks]);
    cmd.extend(ctx.credentials.gradle_properties(ctx.args)?);
    tool_run(ctx, cmd, rules::GRADLE_RUN, "-b", tags::BUILD_FILE)
}

/// `rt upload` / `rt download`: a file spec, or a source and target pair.
fn transfer(
    ctx: &StepContext<'_>,
    verb: &str,
    table: &[ArgumentRule],
) -> Result<Command, EngineError> {
    let mut cmd = Command::new(["rt", verb]);
    let has_spec = ctx.optional(tags::SPEC_PATH)?.is_some() || ctx.optional(tags::SPEC)?.is_some();
    if !has_spec {
        let source = ctx.required(tags::SOURCE)?;
        let target = ctx.required(tags::TARGET)?;
        cmd.extend([source, target]);
    }
    cmd.extend(ctx.flags(table)?);
    cmd.push(ctx.server_id_flag());
    Ok(cmd)
}

fn upload(ctx: &StepContext<'_>) -> Result<Command, EngineError> {
    transfer(ctx, "upload", rules::UPLOAD)
}

fn download(ctx: &StepContext<'_>) -> Result<Command, EngineError> {
    transfer(ctx, "download", rules::DOWNLOAD)
}

fn cleanup(ctx: &StepContext<'_>) -> Result<Command, EngineError> {
    Ok(Command::new([
        "rt".to_string(),
        "build-clean".to_string(),
        ctx.required(tags::BUILD_NAME)?,
        ctx.required(tags::BUILD_NUMBER)?,
    ]))
}

fn scan(ctx: &StepContext<'_>) -> Result<Command, EngineError> {
    let mut cmd = Command::new([
        "build-scan".to_string(),
        ctx.required(tags::BUILD_NAME)?,
        ctx.required(tags::BUILD_NUMBER)?,
    ]);
    cmd.extend(ctx.flags(rules::BUILD_SCAN)?);
    cmd.push(format!("--url={}", ctx.url()?));
    cmd.extend(ctx.credentials.tokens(ctx.args)?);
    Ok(cmd)
}

fn promote(ctx: &StepContext<'_>) -> Result<Command, EngineError> {
    let mut cmd = Command::new(["rt", "build-promote"]);
    cmd.extend(ctx.flags(rules::BUILD_PROMOTE)?);
    cmd.push(format!("--url={}", ctx.url()?));
    cmd.extend([
        ctx.required(tags::BUILD_NAME)?,
        ctx.required(tags::BUILD_NUMBER)?,
        ctx.required(tags::TARGET)?,
    ]);
    cmd.extend(ctx.credentials.tokens(ctx.args)?);
    Ok(cmd)
}

fn collect_env(ctx: &StepContext<'_>) -> Result<Command, EngineError> {
    let mut cmd = Command::new([
        "rt".to_string(),
        "build-collect-env".to_string(),
        ctx.required(tags::BUILD_NAME)?,
        ctx.required(tags::BUILD_NUMBER)?,
    ]);
    cmd.extend(ctx.flags(rules::BUILD_COLLECT_ENV)?);
    Ok(cmd)
}

fn add_dependencies(ctx: &StepContext<'_>) -> Result<Command, EngineError> {
    let mut cmd = Command::new(["rt", "build-add-dependencies"]);
    cmd.extend(ctx.flags(rules::ADD_DEPENDENCIES)?);
    cmd.push(ctx.server_id_flag());
    cmd.extend([
        ctx.required(tags::BUILD_NAME)?,
        ctx.required(tags::BUILD_NUMBER)?,
    ]);
    if let Some(pattern) = ctx.optional(tags::DEPENDENCY_PATTERN)? {
        cmd.push(pattern);
    }
    Ok(cmd)
}

fn publish_build_info(ctx: &StepContext<'_>, gate: Gate) -> Result<Option<Command>, EngineError> {
    if gate == Gate::OnRequest {
        if !ctx.args.publish_build_info {
            return Ok(None);
        }
        if ctx.args.build_name.is_empty() || ctx.args.build_number.is_empty() {
            warn!("publish build info requested but build name or number is empty, skipping");
            return Ok(None);
        }
    }

    let mut cmd = Command::new([
        "rt".to_string(),
        "build-publish".to_string(),
        ctx.required(tags::BUILD_NAME)?,
        ctx.required(tags::BUILD_NUMBER)?,
    ]);
    cmd.extend(ctx.flags(rules::BUILD_PUBLISH)?);
    cmd.push(ctx.server_id_flag());
    Ok(Some(cmd))
}

/// Whether any retention field is set.
pub fn discard_requested(resolver: &FieldResolver, args: &PluginArgs) -> Result<bool, EngineError> {
    for tag in DISCARD_TRIGGERS {
        if !resolver.render(args, tag)?.is_empty() {
            return Ok(true);
        }
    }
    Ok(false)
}

fn discard_old_builds(ctx: &StepContext<'_>, gate: Gate) -> Result<Vec<Command>, EngineError> {
    if gate == Gate::OnRequest && !discard_requested(ctx.assembler.resolver(), ctx.args)? {
        return Ok(Vec::new());
    }

    let alias = format!("{}{}", ctx.alias, DISCARD_ALIAS_SUFFIX);
    let auth = configure_auth(ctx, &alias)?;

    let mut discard = Command::new(["rt", "build-discard"]);
    discard.extend(ctx.flags(rules::BUILD_DISCARD)?);
    discard.push(ctx.required(tags::BUILD_NAME)?);
    Ok(vec![auth, discard])
}
