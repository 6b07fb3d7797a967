//! The plugin's configuration record.
//!
//! Each field is bound to one `PLUGIN_*` tag, which is also the environment
//! variable the CI system sets for it. Rule tables, the credential selector
//! and the loader only ever address fields through these tags.

use crate::error::EngineError;
use crate::resolver::{FieldAccessor, FieldMut, FieldRef, FieldResolver, Record};
use anyhow::Context;
use std::collections::BTreeMap;
use std::path::Path;

macro_rules! plugin_args {
    ($( $(#[$meta:meta])* $field:ident : $ty:ty => $konst:ident = $tag:literal, )*) => {
        /// Plugin settings, one field per `PLUGIN_*` tag.
        #[derive(Debug, Clone, Default, PartialEq, Eq)]
        pub struct PluginArgs {
            $( $(#[$meta])* pub $field: $ty, )*
        }

        /// Symbolic tags of [`PluginArgs`] fields.
        pub mod tags {
            $( pub const $konst: &str = $tag; )*

            /// Every tag, in declaration order.
            pub const ALL: &[&str] = &[ $( $konst, )* ];
        }

        impl Record for PluginArgs {
            const NAME: &'static str = "PluginArgs";

            fn accessors() -> Vec<FieldAccessor<Self>> {
                vec![ $(
                    FieldAccessor {
                        tag: tags::$konst,
                        get: |r| FieldRef::from(&r.$field),
                        get_mut: |r| FieldMut::from(&mut r.$field),
                    },
                )* ]
            }
        }
    };
}

plugin_args! {
    /// `debug` or `trace` switch on level-annotated logs.
    level: String => LOG_LEVEL = "PLUGIN_LOG_LEVEL",
    command: String => COMMAND = "PLUGIN_COMMAND",
    build_tool: String => BUILD_TOOL = "PLUGIN_BUILD_TOOL",

    // connection and credentials
    url: String => URL = "PLUGIN_URL",
    username: String => USERNAME = "PLUGIN_USERNAME",
    password: String => PASSWORD = "PLUGIN_PASSWORD",
    api_key: String => API_KEY = "PLUGIN_API_KEY",
    access_token: String => ACCESS_TOKEN = "PLUGIN_ACCESS_TOKEN",
    /// Alias for operations without a resolver/deployer of their own.
    server_id: String => SERVER_ID = "PLUGIN_SERVER_ID",
    resolver_id: String => RESOLVER_ID = "PLUGIN_RESOLVER_ID",
    deployer_id: String => DEPLOYER_ID = "PLUGIN_DEPLOYER_ID",
    /// Skip TLS verification; also suppresses writing the PEM file.
    insecure: bool => INSECURE = "PLUGIN_INSECURE",
    pem_file_contents: String => PEM_FILE_CONTENTS = "PLUGIN_PEM_FILE_CONTENTS",
    pem_file_path: String => PEM_FILE_PATH = "PLUGIN_PEM_FILE_PATH",
    enable_proxy: bool => ENABLE_PROXY = "PLUGIN_ENABLE_PROXY",
    client_cert_path: String => CLIENT_CERT_PATH = "PLUGIN_CLIENT_CERT_PATH",
    client_cert_key_path: String => CLIENT_CERT_KEY_PATH = "PLUGIN_CLIENT_CERT_KEY_PATH",
    ssh_key_path: String => SSH_KEY_PATH = "PLUGIN_SSH_KEY_PATH",

    // build info
    build_name: String => BUILD_NAME = "PLUGIN_BUILD_NAME",
    build_number: String => BUILD_NUMBER = "PLUGIN_BUILD_NUMBER",
    publish_build_info: bool => PUBLISH_BUILD_INFO = "PLUGIN_PUBLISH_BUILD_INFO",
    project: String => PROJECT = "PLUGIN_PROJECT",
    /// Used for `--project=` on build tool runs when `project` is empty.
    project_key: String => PROJECT_KEY = "PLUGIN_PROJECT_KEY",
    module: String => MODULE = "PLUGIN_MODULE",

    // transfer
    source: String => SOURCE = "PLUGIN_SOURCE",
    target: String => TARGET = "PLUGIN_TARGET",
    /// Inline file spec; written to disk before the pipeline is built.
    spec: String => SPEC = "PLUGIN_SPEC",
    spec_path: String => SPEC_PATH = "PLUGIN_SPEC_PATH",
    spec_vars: String => SPEC_VARS = "PLUGIN_SPEC_VARS",
    target_props: String => TARGET_PROPS = "PLUGIN_TARGET_PROPS",
    flat: String => FLAT = "PLUGIN_FLAT",
    retries: Option<u32> => RETRIES = "PLUGIN_RETRIES",
    threads: Option<u32> => THREADS = "PLUGIN_THREADS",
    ant: String => ANT = "PLUGIN_ANT",
    archive: String => ARCHIVE = "PLUGIN_ARCHIVE",
    chunk_size: String => CHUNK_SIZE = "PLUGIN_CHUNK_SIZE",
    deb: String => DEB = "PLUGIN_DEB",
    detailed_summary: String => DETAILED_SUMMARY = "PLUGIN_DETAILED_SUMMARY",
    dry_run: String => DRY_RUN = "PLUGIN_DRY_RUN",
    exclusions: String => EXCLUSIONS = "PLUGIN_EXCLUSIONS",
    explode: String => EXPLODE = "PLUGIN_EXPLODE",
    fail_no_op: String => FAIL_NO_OP = "PLUGIN_FAIL_NO_OP",
    include_dirs: String => INCLUDE_DIRS = "PLUGIN_INCLUDE_DIRS",
    min_split: String => MIN_SPLIT = "PLUGIN_MIN_SPLIT",
    quiet: String => QUIET = "PLUGIN_QUIET",
    recursive: String => RECURSIVE = "PLUGIN_RECURSIVE",
    regexp: String => REGEXP = "PLUGIN_REGEXP",
    retry_wait_time: String => RETRY_WAIT_TIME = "PLUGIN_RETRY_WAIT_TIME",
    split_count: String => SPLIT_COUNT = "PLUGIN_SPLIT_COUNT",
    symlinks: String => SYMLINKS = "PLUGIN_SYMLINKS",
    sync_deletes: String => SYNC_DELETES = "PLUGIN_SYNC_DELETES",
    archive_entries: String => ARCHIVE_ENTRIES = "PLUGIN_ARCHIVE_ENTRIES",
    build: String => BUILD = "PLUGIN_BUILD",
    bundle: String => BUNDLE = "PLUGIN_BUNDLE",
    bypass_archive_inspection: String => BYPASS_ARCHIVE_INSPECTION = "PLUGIN_BYPASS_ARCHIVE_INSPECTION",
    exclude_artifacts: String => EXCLUDE_ARTIFACTS = "PLUGIN_EXCLUDE_ARTIFACTS",
    exclude_props: String => EXCLUDE_PROPS = "PLUGIN_EXCLUDE_PROPS",
    gpg_key: String => GPG_KEY = "PLUGIN_GPG_KEY",
    include_deps: String => INCLUDE_DEPS = "PLUGIN_INCLUDE_DEPS",
    limit: String => LIMIT = "PLUGIN_LIMIT",
    offset: String => OFFSET = "PLUGIN_OFFSET",
    props: String => PROPS = "PLUGIN_PROPS",
    skip_checksum: String => SKIP_CHECKSUM = "PLUGIN_SKIP_CHECKSUM",
    sort_by: String => SORT_BY = "PLUGIN_SORT_BY",
    sort_order: String => SORT_ORDER = "PLUGIN_SORT_ORDER",
    validate_symlinks: String => VALIDATE_SYMLINKS = "PLUGIN_VALIDATE_SYMLINKS",

    // maven
    goals: String => GOALS = "PLUGIN_GOALS",
    pom_file: String => POM_FILE = "PLUGIN_POM_FILE",
    repo_resolve_releases: String => REPO_RESOLVE_RELEASES = "PLUGIN_REPO_RESOLVE_RELEASES",
    repo_resolve_snapshots: String => REPO_RESOLVE_SNAPSHOTS = "PLUGIN_REPO_RESOLVE_SNAPSHOTS",
    repo_deploy_releases: String => REPO_DEPLOY_RELEASES = "PLUGIN_REPO_DEPLOY_RELEASES",
    repo_deploy_snapshots: String => REPO_DEPLOY_SNAPSHOTS = "PLUGIN_REPO_DEPLOY_SNAPSHOTS",
    exclude_patterns: String => EXCLUDE_PATTERNS = "PLUGIN_EXCLUDE_PATTERNS",
    include_patterns: String => INCLUDE_PATTERNS = "PLUGIN_INCLUDE_PATTERNS",
    global: String => GLOBAL = "PLUGIN_GLOBAL",
    use_wrapper: String => USE_WRAPPER = "PLUGIN_USE_WRAPPER",
    format: String => FORMAT = "PLUGIN_FORMAT",
    scan: String => SCAN = "PLUGIN_SCAN",

    /// Passed through verbatim after every other argument of `mvn`/`gradle`.
    optional_args: String => OPTIONAL_ARGS = "PLUGIN_OPTIONAL_ARGS",

    // gradle
    tasks: String => TASKS = "PLUGIN_TASKS",
    build_file: String => BUILD_FILE = "PLUGIN_BUILD_FILE",
    repo_resolve: String => REPO_RESOLVE = "PLUGIN_REPO_RESOLVE",
    repo_deploy: String => REPO_DEPLOY = "PLUGIN_REPO_DEPLOY",
    deploy_ivy_desc: String => DEPLOY_IVY_DESC = "PLUGIN_DEPLOY_IVY_DESC",
    deploy_maven_desc: String => DEPLOY_MAVEN_DESC = "PLUGIN_DEPLOY_MAVEN_DESC",
    ivy_artifacts_pattern: String => IVY_ARTIFACTS_PATTERN = "PLUGIN_IVY_ARTIFACTS_PATTERN",
    ivy_desc_pattern: String => IVY_DESC_PATTERN = "PLUGIN_IVY_DESC_PATTERN",
    uses_plugin: String => USES_PLUGIN = "PLUGIN_USES_PLUGIN",

    // promote
    copy: String => COPY = "PLUGIN_COPY",
    status: String => STATUS = "PLUGIN_STATUS",
    comment: String => COMMENT = "PLUGIN_COMMENT",
    include_dependencies: String => INCLUDE_DEPENDENCIES = "PLUGIN_INCLUDE_DEPENDENCIES",

    // scan
    fail: String => FAIL = "PLUGIN_FAIL",
    vuln: String => VULN = "PLUGIN_VULN",

    // build-discard
    discard_async: String => ASYNC = "PLUGIN_ASYNC",
    delete_artifacts: String => DELETE_ARTIFACTS = "PLUGIN_DELETE_ARTIFACTS",
    exclude_builds: String => EXCLUDE_BUILDS = "PLUGIN_EXCLUDE_BUILDS",
    max_builds: String => MAX_BUILDS = "PLUGIN_MAX_BUILDS",
    max_days: String => MAX_DAYS = "PLUGIN_MAX_DAYS",

    // build-add-dependencies
    from_rt: String => FROM_RT = "PLUGIN_FROM_RT",
    dependency_pattern: String => DEPENDENCY_PATTERN = "PLUGIN_DEPENDENCY_PATTERN",
}

/// Tags whose values are secrets: never rendered into commands, only exported
/// to the child environment so placeholders can expand.
pub const SECRET_TAGS: &[&str] = &[
    tags::USERNAME,
    tags::PASSWORD,
    tags::API_KEY,
    tags::ACCESS_TOKEN,
];

const TAG_PREFIX: &str = "PLUGIN_";

impl PluginArgs {
    /// Load from the process environment.
    pub fn from_env(resolver: &FieldResolver) -> Result<Self, EngineError> {
        Self::default().overlay(resolver, |tag| std::env::var(tag).ok())
    }

    /// Load an optional YAML settings file, then let the environment override it.
    pub fn load(resolver: &FieldResolver, args_file: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = args_file else {
            return Ok(Self::from_env(resolver)?);
        };
        let content =
            std::fs::read_to_string(path).with_context(|| format!("failed to read {:?}", path))?;
        let base = Self::from_yaml_str(resolver, &content)
            .with_context(|| format!("failed to load settings from {:?}", path))?;
        Ok(base.overlay(resolver, |tag| std::env::var(tag).ok())?)
    }

    /// Apply every non-empty value `lookup` yields for a known tag.
    pub fn overlay<F>(mut self, resolver: &FieldResolver, lookup: F) -> Result<Self, EngineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        for &tag in tags::ALL {
            if let Some(value) = lookup(tag).filter(|v| !v.is_empty()) {
                resolver.assign(&mut self, tag, &value)?;
            }
        }
        Ok(self)
    }

    /// Parse a YAML mapping of settings. Keys are tags; the `PLUGIN_` prefix
    /// and upper case are optional (`username` is `PLUGIN_USERNAME`).
    pub fn from_yaml_str(resolver: &FieldResolver, content: &str) -> anyhow::Result<Self> {
        let raw: BTreeMap<String, serde_yaml::Value> =
            serde_yaml::from_str(content).context("settings file is not a YAML mapping")?;

        let mut args = Self::default();
        for (key, value) in raw {
            let tag = normalize_key(&key);
            let text = match value {
                serde_yaml::Value::Null => continue,
                serde_yaml::Value::String(s) => s,
                serde_yaml::Value::Bool(b) => b.to_string(),
                serde_yaml::Value::Number(n) => n.to_string(),
                other => anyhow::bail!("setting '{}' must be a scalar, got {:?}", key, other),
            };
            resolver.assign(&mut args, &tag, &text)?;
        }
        Ok(args)
    }

    /// Credential values keyed by tag, for the child process environment.
    pub fn secret_env(&self, resolver: &FieldResolver) -> Vec<(String, String)> {
        SECRET_TAGS
            .iter()
            .filter_map(|tag| {
                let value = resolver.text(self, tag).ok()?;
                (!value.is_empty()).then(|| (tag.to_string(), value.to_string()))
            })
            .collect()
    }
}

fn normalize_key(key: &str) -> String {
    let upper = key.trim().replace('-', "_").to_ascii_uppercase();
    if upper.starts_with(TAG_PREFIX) {
        upper
    } else {
        format!("{}{}", TAG_PREFIX, upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    #[test]
    fn every_tag_is_unique_and_prefixed() {
        let mut seen = HashSet::new();
        for tag in tags::ALL {
            assert!(tag.starts_with(TAG_PREFIX), "{tag}");
            assert!(seen.insert(*tag), "duplicate tag {tag}");
        }
        assert_eq!(PluginArgs::accessors().len(), tags::ALL.len());
    }

    #[test]
    fn overlay_parses_typed_fields() {
        let resolver = FieldResolver::new();
        let env: HashMap<&str, &str> = [
            (tags::USERNAME, "ab"),
            (tags::THREADS, "4"),
            (tags::PUBLISH_BUILD_INFO, "true"),
            (tags::RETRIES, ""),
        ]
        .into_iter()
        .collect();

        let args = PluginArgs::default()
            .overlay(&resolver, |tag| env.get(tag).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(args.username, "ab");
        assert_eq!(args.threads, Some(4));
        assert!(args.publish_build_info);
        assert_eq!(args.retries, None);
    }

    #[test]
    fn overlay_rejects_bad_integer() {
        let resolver = FieldResolver::new();
        let err = PluginArgs::default()
            .overlay(&resolver, |tag| (tag == tags::THREADS).then(|| "lots".to_string()))
            .unwrap_err();
        assert!(matches!(err, EngineError::FieldResolution { ref tag, .. } if tag == tags::THREADS));
    }

    #[test]
    fn yaml_keys_accept_short_names() {
        let resolver = FieldResolver::new();
        let yaml = "username: ab\nPLUGIN_PASSWORD: cd\nbuild-number: 12\npublish_build_info: true\nmodule: ~\n";
        let args = PluginArgs::from_yaml_str(&resolver, yaml).unwrap();
        assert_eq!(args.username, "ab");
        assert_eq!(args.password, "cd");
        assert_eq!(args.build_number, "12");
        assert!(args.publish_build_info);
        assert!(args.module.is_empty());
    }

    #[test]
    fn yaml_unknown_key_fails() {
        let resolver = FieldResolver::new();
        assert!(PluginArgs::from_yaml_str(&resolver, "no_such_setting: 1\n").is_err());
        assert!(PluginArgs::from_yaml_str(&resolver, "goals: [a, b]\n").is_err());
    }

    #[test]
    fn load_reads_file_then_environment() {
        let resolver = FieldResolver::new();
        std::env::set_var(tags::VALIDATE_SYMLINKS, "true");

        let from_env = PluginArgs::load(&resolver, None).unwrap();
        assert_eq!(from_env.validate_symlinks, "true");
        assert_eq!(from_env, PluginArgs::from_env(&resolver).unwrap());

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("settings.yml");
        std::fs::write(&file, "validate_symlinks: false\nsort_by: name\n").unwrap();
        let merged = PluginArgs::load(&resolver, Some(&file)).unwrap();
        assert_eq!(merged.sort_by, "name");
        assert_eq!(merged.validate_symlinks, "true");

        std::env::remove_var(tags::VALIDATE_SYMLINKS);
        assert!(PluginArgs::load(&resolver, Some(&dir.path().join("missing.yml"))).is_err());
    }

    #[test]
    fn secret_env_lists_only_populated_credentials() {
        let resolver = FieldResolver::new();
        let args = PluginArgs {
            access_token: "tok".into(),
            url: "https://host/artifactory/".into(),
            ..PluginArgs::default()
        };
        assert_eq!(
            args.secret_env(&resolver),
            vec![(tags::ACCESS_TOKEN.to_string(), "tok".to_string())]
        );
    }
}
