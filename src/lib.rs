//! Turns `PLUGIN_*` build settings into ordered invocations of the artifact
//! repository CLI and runs them.

pub mod args;
pub mod backends;
pub mod error;
pub mod pipeline;
pub mod prepare;
pub mod resolver;
pub mod util;

pub use args::PluginArgs;
pub use error::EngineError;
pub use pipeline::{Command, Pipeline, PipelineBuilder};
pub use resolver::FieldResolver;
