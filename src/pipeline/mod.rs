pub mod assembler;
pub mod auth;
pub mod builder;
pub mod endpoint;
pub mod executor;
pub mod operation;
pub mod rules;

pub use assembler::CommandAssembler;
pub use auth::{CredentialSelector, ShellFlavor};
pub use builder::PipelineBuilder;
pub use endpoint::sanitize_url;
pub use operation::{BuildTool, Operation, Verb};
pub use rules::ArgumentRule;

use std::fmt;

/// One invocation of the repository CLI, as ordered tokens (without the
/// binary itself).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Command {
    tokens: Vec<String>,
}

impl Command {
    pub fn new<I, S>(head: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: head.into_iter().map(Into::into).collect(),
        }
    }

    pub fn push(&mut self, token: impl Into<String>) {
        self.tokens.push(token.into());
    }

    pub fn extend<I, S>(&mut self, tokens: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tokens.extend(tokens.into_iter().map(Into::into));
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t == token)
    }

    /// Tokens joined by single spaces.
    pub fn render(&self) -> String {
        self.tokens.join(" ")
    }

    /// Full shell line with the CLI binary in front.
    pub fn render_with(&self, binary: &str) -> String {
        if self.tokens.is_empty() {
            binary.to_string()
        } else {
            format!("{} {}", binary, self.render())
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Ordered commands for one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    operation: Operation,
    commands: Vec<Command>,
}

impl Pipeline {
    pub fn new(operation: Operation, commands: Vec<Command>) -> Self {
        Self {
            operation,
            commands,
        }
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn rendered(&self) -> Vec<String> {
        self.commands.iter().map(Command::render).collect()
    }
}
