use crate::args::{tags, PluginArgs};
use crate::error::EngineError;
use crate::resolver::FieldResolver;

/// Shell the rendered commands are handed to. Decides placeholder syntax too.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellFlavor {
    Posix,
    PowerShell,
}

impl ShellFlavor {
    pub fn host() -> Self {
        if cfg!(windows) {
            ShellFlavor::PowerShell
        } else {
            ShellFlavor::Posix
        }
    }

    pub fn env_prefix(&self) -> &'static str {
        match self {
            ShellFlavor::Posix => "$",
            ShellFlavor::PowerShell => "$Env:",
        }
    }

    /// Reference to the environment variable `name`, expanded by the shell.
    pub fn placeholder(&self, name: &str) -> String {
        format!("{}{}", self.env_prefix(), name)
    }

    pub fn program(&self) -> &'static str {
        match self {
            ShellFlavor::Posix => "sh",
            ShellFlavor::PowerShell => "powershell.exe",
        }
    }

    /// Arguments placed before the command string.
    pub fn program_args(&self) -> &'static [&'static str] {
        match self {
            ShellFlavor::Posix => &["-c"],
            ShellFlavor::PowerShell => &["-NoLogo", "-NoProfile", "-Command"],
        }
    }

    pub fn cli_binary(&self) -> &'static str {
        match self {
            ShellFlavor::Posix => "jfrog",
            ShellFlavor::PowerShell => "C:/bin/jfrog.exe",
        }
    }
}

/// One way of authenticating against the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential {
    UserPassword,
    ApiKey,
    AccessToken,
}

struct Strategy {
    credential: Credential,
    /// `(flag, tag)`; every tag must be non-empty for the strategy to apply.
    flags: &'static [(&'static str, &'static str)],
}

/// Highest precedence first.
const STRATEGIES: &[Strategy] = &[
    Strategy {
        credential: Credential::UserPassword,
        flags: &[("--user", tags::USERNAME), ("--password", tags::PASSWORD)],
    },
    Strategy {
        credential: Credential::ApiKey,
        flags: &[("--apikey", tags::API_KEY)],
    },
    Strategy {
        credential: Credential::AccessToken,
        flags: &[("--access-token", tags::ACCESS_TOKEN)],
    },
];

/// Picks one credential strategy and renders it as placeholders.
pub struct CredentialSelector<'a> {
    resolver: &'a FieldResolver,
    flavor: ShellFlavor,
}

impl<'a> CredentialSelector<'a> {
    pub fn new(resolver: &'a FieldResolver, flavor: ShellFlavor) -> Self {
        Self { resolver, flavor }
    }

    fn first_complete(&self, args: &PluginArgs) -> Result<&'static Strategy, EngineError> {
        for strategy in STRATEGIES {
            let mut complete = true;
            for (_, tag) in strategy.flags {
                if self.resolver.text(args, tag)?.is_empty() {
                    complete = false;
                    break;
                }
            }
            if complete {
                return Ok(strategy);
            }
        }
        Err(EngineError::AuthSelection(
            "set username and password, an API key, or an access token".to_string(),
        ))
    }

    pub fn select(&self, args: &PluginArgs) -> Result<Credential, EngineError> {
        Ok(self.first_complete(args)?.credential)
    }

    /// `--user $PLUGIN_USERNAME --password $PLUGIN_PASSWORD` and friends.
    pub fn tokens(&self, args: &PluginArgs) -> Result<Vec<String>, EngineError> {
        let strategy = self.first_complete(args)?;
        let mut tokens = Vec::with_capacity(strategy.flags.len() * 2);
        for (flag, tag) in strategy.flags {
            tokens.push(flag.to_string());
            tokens.push(self.flavor.placeholder(tag));
        }
        Ok(tokens)
    }

    /// Gradle's publish task only takes a username/password pair as `-P` properties.
    pub fn gradle_properties(&self, args: &PluginArgs) -> Result<Vec<String>, EngineError> {
        match self.select(args)? {
            Credential::UserPassword => Ok(vec![
                format!("-Pusername={}", self.flavor.placeholder(tags::USERNAME)),
                format!("-Ppassword={}", self.flavor.placeholder(tags::PASSWORD)),
            ]),
            other => Err(EngineError::AuthSelection(format!(
                "{:?} is not supported for gradle publish, use username and password",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn creds(user: &str, pass: &str, key: &str, token: &str) -> PluginArgs {
        PluginArgs {
            username: user.into(),
            password: pass.into(),
            api_key: key.into(),
            access_token: token.into(),
            ..PluginArgs::default()
        }
    }

    #[test]
    fn posix_placeholders() {
        let resolver = FieldResolver::new();
        let selector = CredentialSelector::new(&resolver, ShellFlavor::Posix);
        assert_eq!(
            selector.tokens(&creds("ab", "cd", "", "")).unwrap().join(" "),
            "--user $PLUGIN_USERNAME --password $PLUGIN_PASSWORD"
        );
        assert_eq!(
            selector.tokens(&creds("", "", "", "tok")).unwrap().join(" "),
            "--access-token $PLUGIN_ACCESS_TOKEN"
        );
    }

    #[test]
    fn powershell_placeholders() {
        let resolver = FieldResolver::new();
        let selector = CredentialSelector::new(&resolver, ShellFlavor::PowerShell);
        assert_eq!(
            selector.tokens(&creds("", "", "key", "")).unwrap(),
            vec!["--apikey", "$Env:PLUGIN_API_KEY"]
        );
    }

    #[test]
    fn username_without_password_falls_through() {
        let resolver = FieldResolver::new();
        let selector = CredentialSelector::new(&resolver, ShellFlavor::Posix);
        assert_eq!(
            selector.select(&creds("ab", "", "", "tok")).unwrap(),
            Credential::AccessToken
        );
        assert!(matches!(
            selector.select(&creds("ab", "", "", "")),
            Err(EngineError::AuthSelection(_))
        ));
    }

    #[test]
    fn gradle_rejects_token_auth() {
        let resolver = FieldResolver::new();
        let selector = CredentialSelector::new(&resolver, ShellFlavor::Posix);
        assert_eq!(
            selector.gradle_properties(&creds("ab", "cd", "", "")).unwrap(),
            vec!["-Pusername=$PLUGIN_USERNAME", "-Ppassword=$PLUGIN_PASSWORD"]
        );
        assert!(matches!(
            selector.gradle_properties(&creds("", "", "", "tok")),
            Err(EngineError::AuthSelection(_))
        ));
    }

    proptest! {
        #[test]
        fn exactly_one_strategy_by_precedence(
            user in "[a-z]{0,3}",
            pass in "[a-z]{0,3}",
            key in "[a-z]{0,3}",
            token in "[a-z]{0,3}",
        ) {
            let resolver = FieldResolver::new();
            let selector = CredentialSelector::new(&resolver, ShellFlavor::Posix);
            let args = creds(&user, &pass, &key, &token);

            let expected = if !user.is_empty() && !pass.is_empty() {
                Some(Credential::UserPassword)
            } else if !key.is_empty() {
                Some(Credential::ApiKey)
            } else if !token.is_empty() {
                Some(Credential::AccessToken)
            } else {
                None
            };

            match expected {
                Some(credential) => {
                    prop_assert_eq!(selector.select(&args).unwrap(), credential);
                    let tokens = selector.tokens(&args).unwrap();
                    let flags: Vec<&String> = tokens.iter().filter(|t| t.starts_with("--")).collect();
                    let families = [
                        flags.iter().any(|f| *f == "--user" || *f == "--password"),
                        flags.iter().any(|f| *f == "--apikey"),
                        flags.iter().any(|f| *f == "--access-token"),
                    ];
                    prop_assert_eq!(families.iter().filter(|b| **b).count(), 1);
                    for secret in [&user, &pass, &key, &token] {
                        if !secret.is_empty() {
                            prop_assert!(!tokens.contains(secret));
                        }
                    }
                }
                None => prop_assert!(selector.select(&args).is_err()),
            }
        }
    }
}
