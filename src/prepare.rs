//! Side effects that have to happen before a pipeline is built: normalising
//! fields, writing files the CLI reads, and setting up the child environment.

use crate::args::PluginArgs;
use crate::util::spec_file_name;
use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Extra variables for the child processes, on top of the inherited ones.
pub type ChildEnv = BTreeMap<String, String>;

/// A preparation step. Hooks run in order and may rewrite the record.
pub trait PreRunHook: Send + Sync {
    fn name(&self) -> &str;
    fn apply(&self, args: &mut PluginArgs, env: &mut ChildEnv) -> anyhow::Result<()>;
}

static PROP_PAIR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([^=]*?)\s*=\s*(.*?)\s*$").expect("Valid regex pattern"));

/// Drop `key=value` pairs whose value is empty or `null` (quotes ignored).
/// Items that are not pairs are dropped too.
pub fn filter_target_props(raw: &str) -> String {
    raw.split(',')
        .filter_map(|pair| {
            let caps = PROP_PAIR.captures(pair)?;
            let key = caps.get(1)?.as_str();
            let value = caps.get(2)?.as_str();
            let bare = value.trim_matches(|c| c == '"' || c == '\'');
            if bare.is_empty() || bare.eq_ignore_ascii_case("null") {
                None
            } else {
                Some(format!("{}={}", key, value))
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

pub struct TargetPropsHook;

impl PreRunHook for TargetPropsHook {
    fn name(&self) -> &str {
        "target-props"
    }

    fn apply(&self, args: &mut PluginArgs, _env: &mut ChildEnv) -> anyhow::Result<()> {
        normalize(args);
        Ok(())
    }
}

/// Writes an inline file spec to disk and points `PLUGIN_SPEC_PATH` at it.
pub struct SpecFileHook {
    dir: PathBuf,
}

impl SpecFileHook {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl PreRunHook for SpecFileHook {
    fn name(&self) -> &str {
        "spec-file"
    }

    fn apply(&self, args: &mut PluginArgs, _env: &mut ChildEnv) -> anyhow::Result<()> {
        if args.spec.is_empty() {
            return Ok(());
        }
        let path = self.dir.join(spec_file_name());
        fs::write(&path, &args.spec).with_context(|| format!("failed to write spec file {:?}", path))?;
        info!("Wrote file spec to {}", path.display());
        args.spec_path = path.to_string_lossy().to_string();
        args.spec.clear();
        Ok(())
    }
}

pub fn default_pem_path() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from("C:/users/ContainerAdministrator/.jfrog/security/certs/cert.pem")
    } else {
        PathBuf::from("/root/.jfrog/security/certs/cert.pem")
    }
}

/// Writes `PLUGIN_PEM_FILE_CONTENTS` where the CLI looks for trusted certs.
pub struct PemFileHook {
    default_path: PathBuf,
}

impl PemFileHook {
    pub fn new(default_path: impl Into<PathBuf>) -> Self {
        Self {
            default_path: default_path.into(),
        }
    }
}

impl Default for PemFileHook {
    fn default() -> Self {
        Self::new(default_pem_path())
    }
}

impl PreRunHook for PemFileHook {
    fn name(&self) -> &str {
        "pem-file"
    }

    fn apply(&self, args: &mut PluginArgs, _env: &mut ChildEnv) -> anyhow::Result<()> {
        if args.pem_file_contents.is_empty() {
            return Ok(());
        }
        if args.insecure {
            debug!("insecure mode, not writing pem file");
            return Ok(());
        }

        let path = if args.pem_file_path.is_empty() {
            self.default_path.clone()
        } else {
            PathBuf::from(&args.pem_file_path)
        };
        info!("Creating pem file at {}", path.display());
        write_private(&path, &args.pem_file_contents)
    }
}

fn write_private(path: &Path, contents: &str) -> anyhow::Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("failed to create pem folder {:?}", dir))?;
    }
    fs::write(path, contents).with_context(|| format!("failed to create pem file {:?}", path))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .with_context(|| format!("failed to restrict {:?}", path))?;
    }
    Ok(())
}

/// Harness proxy variables and the names the CLI reads.
pub const PROXY_VARS: &[(&str, &str)] = &[
    ("HARNESS_HTTP_PROXY", "HTTP_PROXY"),
    ("HARNESS_HTTPS_PROXY", "HTTPS_PROXY"),
    ("HARNESS_NO_PROXY", "NO_PROXY"),
];

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Copies harness proxy settings into the child environment when
/// `PLUGIN_ENABLE_PROXY` is on.
pub struct ProxyEnvHook {
    lookup: EnvLookup,
}

impl ProxyEnvHook {
    pub fn from_process_env() -> Self {
        Self::with_lookup(|name| std::env::var(name).ok())
    }

    pub fn with_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            lookup: Box::new(lookup),
        }
    }
}

impl PreRunHook for ProxyEnvHook {
    fn name(&self) -> &str {
        "proxy-env"
    }

    fn apply(&self, args: &mut PluginArgs, env: &mut ChildEnv) -> anyhow::Result<()> {
        if !args.enable_proxy {
            return Ok(());
        }
        for &(src, dest) in PROXY_VARS {
            if let Some(value) = (self.lookup)(src).filter(|v| !v.is_empty()) {
                debug!("copying {} to {}", src, dest);
                env.insert(dest.to_string(), value);
            }
        }
        Ok(())
    }
}

/// Hooks for `run`, in order.
pub fn default_hooks(work_dir: &Path) -> Vec<Box<dyn PreRunHook>> {
    vec![
        Box::new(TargetPropsHook),
        Box::new(SpecFileHook::new(work_dir)),
        Box::new(PemFileHook::default()),
        Box::new(ProxyEnvHook::from_process_env()),
    ]
}

pub fn prepare(args: &mut PluginArgs, hooks: &[Box<dyn PreRunHook>]) -> anyhow::Result<ChildEnv> {
    let mut env = ChildEnv::new();
    for hook in hooks {
        hook.apply(args, &mut env)
            .with_context(|| format!("preparation step '{}' failed", hook.name()))?;
    }
    Ok(env)
}

/// Side-effect free part of preparation, for rendering without running.
pub fn normalize(args: &mut PluginArgs) {
    if !args.target_props.is_empty() {
        args.target_props = filter_target_props(&args.target_props);
    }
}
