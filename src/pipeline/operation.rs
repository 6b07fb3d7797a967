use crate::args::{tags, PluginArgs};
use crate::error::EngineError;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildTool {
    None,
    Maven,
    Gradle,
}

impl BuildTool {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildTool::None => "",
            BuildTool::Maven => "mvn",
            BuildTool::Gradle => "gradle",
        }
    }
}

impl FromStr for BuildTool {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" => Ok(BuildTool::None),
            "mvn" | "maven" => Ok(BuildTool::Maven),
            "gradle" => Ok(BuildTool::Gradle),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Build,
    Publish,
    Upload,
    Download,
    Cleanup,
    Scan,
    Promote,
    Discard,
    CreateBuildInfo,
    PublishBuildInfo,
    AddDependencies,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Build => "build",
            Verb::Publish => "publish",
            Verb::Upload => "upload",
            Verb::Download => "download",
            Verb::Cleanup => "cleanup",
            Verb::Scan => "scan",
            Verb::Promote => "promote",
            Verb::Discard => "build-discard",
            Verb::CreateBuildInfo => "create-build-info",
            Verb::PublishBuildInfo => "publish-build-info",
            Verb::AddDependencies => "add-dependencies",
        }
    }

    /// Field holding the server alias this verb registers and uses.
    pub fn alias_tag(&self) -> &'static str {
        match self {
            Verb::Build => tags::RESOLVER_ID,
            Verb::Publish => tags::DEPLOYER_ID,
            _ => tags::SERVER_ID,
        }
    }
}

impl FromStr for Verb {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let verb = match s.trim().to_ascii_lowercase().as_str() {
            "build" => Verb::Build,
            "publish" => Verb::Publish,
            "upload" => Verb::Upload,
            "download" => Verb::Download,
            "cleanup" => Verb::Cleanup,
            "scan" => Verb::Scan,
            "promote" => Verb::Promote,
            "build-discard" | "discard" => Verb::Discard,
            "create-build-info" => Verb::CreateBuildInfo,
            "publish-build-info" => Verb::PublishBuildInfo,
            "add-dependencies" => Verb::AddDependencies,
            _ => return Err(()),
        };
        Ok(verb)
    }
}

/// Build tool crossed with verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Operation {
    pub tool: BuildTool,
    pub verb: Verb,
}

impl Operation {
    pub const fn new(tool: BuildTool, verb: Verb) -> Self {
        Self { tool, verb }
    }

    /// Read `PLUGIN_BUILD_TOOL` and `PLUGIN_COMMAND`.
    ///
    /// No command defaults to `build` for a build tool and to `upload` without one.
    pub fn from_args(args: &PluginArgs) -> Result<Self, EngineError> {
        let unsupported = || EngineError::UnsupportedOperation {
            tool: args.build_tool.clone(),
            command: args.command.clone(),
        };

        let tool: BuildTool = args.build_tool.parse().map_err(|_| unsupported())?;
        let verb = if args.command.trim().is_empty() {
            match tool {
                BuildTool::None => Verb::Upload,
                _ => Verb::Build,
            }
        } else {
            args.command.parse::<Verb>().map_err(|_| unsupported())?
        };

        if tool == BuildTool::None && matches!(verb, Verb::Build | Verb::Publish) {
            return Err(unsupported());
        }
        Ok(Self { tool, verb })
    }

    /// Tools only shape the build and publish verbs.
    pub fn normalized(self) -> Self {
        match self.verb {
            Verb::Build | Verb::Publish => self,
            verb => Self::new(BuildTool::None, verb),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tool {
            BuildTool::None => write!(f, "{}", self.verb.as_str()),
            tool => write!(f, "{} {}", tool.as_str(), self.verb.as_str()),
        }
    }
}
