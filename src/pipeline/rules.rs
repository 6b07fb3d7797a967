//! Static flag tables, one per sub-command.
//!
//! Order within a table is the order flags appear on the generated command.
//! Server alias flags are not table driven: the builder emits them from the
//! alias it registered with `config add`.

use crate::args::tags;

/// Maps one `PluginArgs` field to one `--flag=` token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgumentRule {
    /// Ends in `=`; the value is appended directly.
    pub flag: &'static str,
    pub tag: &'static str,
    pub mandatory: bool,
    pub stop_on_error: bool,
}

impl ArgumentRule {
    pub const fn optional(flag: &'static str, tag: &'static str) -> Self {
        Self {
            flag,
            tag,
            mandatory: false,
            stop_on_error: false,
        }
    }

    pub const fn required(flag: &'static str, tag: &'static str) -> Self {
        Self {
            flag,
            tag,
            mandatory: true,
            stop_on_error: false,
        }
    }

    /// Whether an empty or unresolvable value aborts assembly.
    pub fn is_fatal(&self) -> bool {
        self.mandatory || self.stop_on_error
    }
}

const fn opt(flag: &'static str, tag: &'static str) -> ArgumentRule {
    ArgumentRule::optional(flag, tag)
}

pub const MAVEN_CONFIG: &[ArgumentRule] = &[
    opt("--exclude-patterns=", tags::EXCLUDE_PATTERNS),
    opt("--global=", tags::GLOBAL),
    opt("--include-patterns=", tags::INCLUDE_PATTERNS),
    opt("--repo-deploy-releases=", tags::REPO_DEPLOY_RELEASES),
    opt("--repo-deploy-snapshots=", tags::REPO_DEPLOY_SNAPSHOTS),
    opt("--repo-resolve-releases=", tags::REPO_RESOLVE_RELEASES),
    opt("--repo-resolve-snapshots=", tags::REPO_RESOLVE_SNAPSHOTS),
    opt("--use-wrapper=", tags::USE_WRAPPER),
];

pub const MAVEN_RUN: &[ArgumentRule] = &[
    opt("--build-name=", tags::BUILD_NAME),
    opt("--build-number=", tags::BUILD_NUMBER),
    opt("--detailed-summary=", tags::DETAILED_SUMMARY),
    opt("--format=", tags::FORMAT),
    opt("--insecure-tls=", tags::INSECURE),
    opt("--project=", tags::PROJECT),
    opt("--scan=", tags::SCAN),
    opt("--threads=", tags::THREADS),
];

pub const GRADLE_CONFIG: &[ArgumentRule] = &[
    opt("--deploy-ivy-desc=", tags::DEPLOY_IVY_DESC),
    opt("--deploy-maven-desc=", tags::DEPLOY_MAVEN_DESC),
    opt("--global=", tags::GLOBAL),
    opt("--ivy-artifacts-pattern=", tags::IVY_ARTIFACTS_PATTERN),
    opt("--ivy-desc-pattern=", tags::IVY_DESC_PATTERN),
    opt("--repo-deploy=", tags::REPO_DEPLOY),
    opt("--repo-resolve=", tags::REPO_RESOLVE),
    opt("--use-wrapper=", tags::USE_WRAPPER),
    opt("--uses-plugin=", tags::USES_PLUGIN),
];

pub const GRADLE_RUN: &[ArgumentRule] = &[
    opt("--build-name=", tags::BUILD_NAME),
    opt("--build-number=", tags::BUILD_NUMBER),
    opt("--detailed-summary=", tags::DETAILED_SUMMARY),
    opt("--format=", tags::FORMAT),
    opt("--project=", tags::PROJECT),
    opt("--scan=", tags::SCAN),
    opt("--threads=", tags::THREADS),
];

pub const BUILD_DISCARD: &[ArgumentRule] = &[
    opt("--async=", tags::ASYNC),
    opt("--delete-artifacts=", tags::DELETE_ARTIFACTS),
    opt("--exclude-builds=", tags::EXCLUDE_BUILDS),
    opt("--max-builds=", tags::MAX_BUILDS),
    opt("--max-days=", tags::MAX_DAYS),
];

pub const BUILD_PUBLISH: &[ArgumentRule] = &[opt("--project=", tags::PROJECT)];

pub const BUILD_COLLECT_ENV: &[ArgumentRule] = &[opt("--project=", tags::PROJECT)];

pub const ADD_DEPENDENCIES: &[ArgumentRule] = &[
    opt("--exclusions=", tags::EXCLUSIONS),
    opt("--from-rt=", tags::FROM_RT),
    opt("--module=", tags::MODULE),
    opt("--project=", tags::PROJECT),
    opt("--recursive=", tags::RECURSIVE),
    opt("--regexp=", tags::REGEXP),
    opt("--spec=", tags::SPEC_PATH),
    opt("--spec-vars=", tags::SPEC_VARS),
];

pub const UPLOAD: &[ArgumentRule] = &[
    opt("--ant=", tags::ANT),
    opt("--archive=", tags::ARCHIVE),
    opt("--build-name=", tags::BUILD_NAME),
    opt("--build-number=", tags::BUILD_NUMBER),
    opt("--chunk-size=", tags::CHUNK_SIZE),
    opt("--client-cert-key-path=", tags::CLIENT_CERT_KEY_PATH),
    opt("--client-cert-path=", tags::CLIENT_CERT_PATH),
    opt("--deb=", tags::DEB),
    opt("--detailed-summary=", tags::DETAILED_SUMMARY),
    opt("--dry-run=", tags::DRY_RUN),
    opt("--exclusions=", tags::EXCLUSIONS),
    opt("--explode=", tags::EXPLODE),
    opt("--fail-no-op=", tags::FAIL_NO_OP),
    opt("--flat=", tags::FLAT),
    opt("--include-dirs=", tags::INCLUDE_DIRS),
    opt("--insecure-tls=", tags::INSECURE),
    opt("--min-split=", tags::MIN_SPLIT),
    opt("--module=", tags::MODULE),
    opt("--project=", tags::PROJECT),
    opt("--quiet=", tags::QUIET),
    opt("--recursive=", tags::RECURSIVE),
    opt("--regexp=", tags::REGEXP),
    opt("--retries=", tags::RETRIES),
    opt("--retry-wait-time=", tags::RETRY_WAIT_TIME),
    opt("--spec=", tags::SPEC_PATH),
    opt("--spec-vars=", tags::SPEC_VARS),
    opt("--split-count=", tags::SPLIT_COUNT),
    opt("--ssh-key-path=", tags::SSH_KEY_PATH),
    opt("--symlinks=", tags::SYMLINKS),
    opt("--sync-deletes=", tags::SYNC_DELETES),
    opt("--target-props=", tags::TARGET_PROPS),
    opt("--threads=", tags::THREADS),
];

pub const DOWNLOAD: &[ArgumentRule] = &[
    opt("--archive-entries=", tags::ARCHIVE_ENTRIES),
    opt("--build=", tags::BUILD),
    opt("--build-name=", tags::BUILD_NAME),
    opt("--build-number=", tags::BUILD_NUMBER),
    opt("--bundle=", tags::BUNDLE),
    opt("--bypass-archive-inspection=", tags::BYPASS_ARCHIVE_INSPECTION),
    opt("--client-cert-key-path=", tags::CLIENT_CERT_KEY_PATH),
    opt("--client-cert-path=", tags::CLIENT_CERT_PATH),
    opt("--detailed-summary=", tags::DETAILED_SUMMARY),
    opt("--dry-run=", tags::DRY_RUN),
    opt("--exclude-artifacts=", tags::EXCLUDE_ARTIFACTS),
    opt("--exclude-props=", tags::EXCLUDE_PROPS),
    opt("--exclusions=", tags::EXCLUSIONS),
    opt("--explode=", tags::EXPLODE),
    opt("--fail-no-op=", tags::FAIL_NO_OP),
    opt("--flat=", tags::FLAT),
    opt("--gpg-key=", tags::GPG_KEY),
    opt("--include-deps=", tags::INCLUDE_DEPS),
    opt("--include-dirs=", tags::INCLUDE_DIRS),
    opt("--insecure-tls=", tags::INSECURE),
    opt("--limit=", tags::LIMIT),
    opt("--min-split=", tags::MIN_SPLIT),
    opt("--module=", tags::MODULE),
    opt("--offset=", tags::OFFSET),
    opt("--project=", tags::PROJECT),
    opt("--props=", tags::PROPS),
    opt("--quiet=", tags::QUIET),
    opt("--recursive=", tags::RECURSIVE),
    opt("--retries=", tags::RETRIES),
    opt("--retry-wait-time=", tags::RETRY_WAIT_TIME),
    opt("--skip-checksum=", tags::SKIP_CHECKSUM),
    opt("--sort-by=", tags::SORT_BY),
    opt("--sort-order=", tags::SORT_ORDER),
    opt("--spec=", tags::SPEC_PATH),
    opt("--spec-vars=", tags::SPEC_VARS),
    opt("--split-count=", tags::SPLIT_COUNT),
    opt("--ssh-key-path=", tags::SSH_KEY_PATH),
    opt("--sync-deletes=", tags::SYNC_DELETES),
    opt("--threads=", tags::THREADS),
    opt("--validate-symlinks=", tags::VALIDATE_SYMLINKS),
];

pub const BUILD_PROMOTE: &[ArgumentRule] = &[
    opt("--copy=", tags::COPY),
    opt("--comment=", tags::COMMENT),
    opt("--status=", tags::STATUS),
    opt("--include-dependencies=", tags::INCLUDE_DEPENDENCIES),
    opt("--project=", tags::PROJECT),
];

pub const BUILD_SCAN: &[ArgumentRule] = &[
    opt("--project=", tags::PROJECT),
    opt("--format=", tags::FORMAT),
    opt("--fail=", tags::FAIL),
    opt("--vuln=", tags::VULN),
];

/// Every table, for table-wide checks.
pub const ALL_TABLES: &[(&str, &[ArgumentRule])] = &[
    ("mvn-config", MAVEN_CONFIG),
    ("mvn", MAVEN_RUN),
    ("gradle-config", GRADLE_CONFIG),
    ("gradle", GRADLE_RUN),
    ("rt build-discard", BUILD_DISCARD),
    ("rt build-publish", BUILD_PUBLISH),
    ("rt build-collect-env", BUILD_COLLECT_ENV),
    ("rt build-add-dependencies", ADD_DEPENDENCIES),
    ("rt upload", UPLOAD),
    ("rt download", DOWNLOAD),
    ("rt build-promote", BUILD_PROMOTE),
    ("build-scan", BUILD_SCAN),
];

/// Discard fields; any of them being set turns on the discard step.
pub const DISCARD_TRIGGERS: &[&str] = &[
    tags::ASYNC,
    tags::DELETE_ARTIFACTS,
    tags::EXCLUDE_BUILDS,
    tags::MAX_BUILDS,
    tags::MAX_DAYS,
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::{PluginArgs, SECRET_TAGS};
    use crate::resolver::FieldResolver;
    use std::collections::HashSet;

    #[test]
    fn flags_end_with_delimiter() {
        for (name, table) in ALL_TABLES {
            for rule in table.iter() {
                assert!(rule.flag.starts_with("--"), "{name}: {}", rule.flag);
                assert!(rule.flag.ends_with('='), "{name}: {}", rule.flag);
            }
        }
    }

    #[test]
    fn every_tag_resolves_on_plugin_args() {
        let resolver = FieldResolver::new();
        let args = PluginArgs::default();
        for (name, table) in ALL_TABLES {
            for rule in table.iter() {
                assert!(
                    resolver.render(&args, rule.tag).is_ok(),
                    "{name}: {} has no field",
                    rule.tag
                );
            }
        }
    }

    #[test]
    fn no_table_renders_secrets() {
        for (name, table) in ALL_TABLES {
            for rule in table.iter() {
                assert!(!SECRET_TAGS.contains(&rule.tag), "{name}: {}", rule.tag);
            }
        }
    }

    #[test]
    fn flags_are_unique_within_a_table() {
        for (name, table) in ALL_TABLES {
            let mut seen = HashSet::new();
            for rule in table.iter() {
                assert!(seen.insert(rule.flag), "{name}: duplicate {}", rule.flag);
            }
        }
    }
}
