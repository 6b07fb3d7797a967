use crate::error::EngineError;
use crate::pipeline::rules::ArgumentRule;
use crate::resolver::{FieldResolver, Record};
use tracing::debug;

/// Turns rule tables into `--flag=value` tokens.
#[derive(Clone, Copy)]
pub struct CommandAssembler<'a> {
    resolver: &'a FieldResolver,
}

impl<'a> CommandAssembler<'a> {
    pub fn new(resolver: &'a FieldResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &'a FieldResolver {
        self.resolver
    }

    /// One token per non-empty field, in table order.
    ///
    /// A fatal rule with an empty value fails the whole call; so does a fatal
    /// rule whose tag does not resolve. Non-fatal rules are skipped.
    pub fn assemble<R: Record>(
        &self,
        rules: &[ArgumentRule],
        record: &R,
    ) -> Result<Vec<String>, EngineError> {
        let mut tokens = Vec::with_capacity(rules.len());
        for rule in rules {
            let value = match self.resolver.render(record, rule.tag) {
                Ok(value) => value,
                Err(err) if rule.is_fatal() => return Err(err),
                Err(err) => {
                    debug!("skipping {}: {}", rule.flag, err);
                    continue;
                }
            };

            if value.is_empty() {
                if rule.is_fatal() {
                    return Err(EngineError::missing(rule.tag));
                }
                debug!("skipping {}: {} is empty", rule.flag, rule.tag);
                continue;
            }

            tokens.push(format!("{}{}", rule.flag, value));
        }
        Ok(tokens)
    }

    /// Value of a positional argument that must be present.
    pub fn required<R: Record>(&self, record: &R, tag: &str) -> Result<String, EngineError> {
        let value = self.resolver.render(record, tag)?;
        if value.is_empty() {
            return Err(EngineError::missing(tag));
        }
        Ok(value)
    }

    /// Value of an optional positional argument; `None` when empty.
    pub fn optional<R: Record>(&self, record: &R, tag: &str) -> Result<Option<String>, EngineError> {
        let value = self.resolver.render(record, tag)?;
        Ok((!value.is_empty()).then_some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::{tags, PluginArgs};
    use proptest::prelude::*;

    const SAMPLE_TABLE: &[ArgumentRule] = &[
        ArgumentRule::optional("--build-name=", tags::BUILD_NAME),
        ArgumentRule::optional("--threads=", tags::THREADS),
        ArgumentRule::optional("--project=", tags::PROJECT),
        ArgumentRule::optional("--module=", tags::MODULE),
    ];

    #[test]
    fn optional_empty_values_are_omitted() {
        let resolver = FieldResolver::new();
        let assembler = CommandAssembler::new(&resolver);
        let args = PluginArgs {
            project: "p1".into(),
            threads: Some(3),
            ..PluginArgs::default()
        };
        let tokens = assembler.assemble(SAMPLE_TABLE, &args).unwrap();
        assert_eq!(tokens, vec!["--threads=3", "--project=p1"]);
    }

    #[test]
    fn mandatory_empty_value_fails_with_tag() {
        let resolver = FieldResolver::new();
        let assembler = CommandAssembler::new(&resolver);
        let table = [
            ArgumentRule::optional("--project=", tags::PROJECT),
            ArgumentRule::required("--build-name=", tags::BUILD_NAME),
        ];
        let args = PluginArgs {
            project: "p1".into(),
            ..PluginArgs::default()
        };
        let err = assembler.assemble(&table, &args).unwrap_err();
        assert_eq!(err, EngineError::missing(tags::BUILD_NAME));
    }

    #[test]
    fn stop_on_error_behaves_like_mandatory() {
        let resolver = FieldResolver::new();
        let assembler = CommandAssembler::new(&resolver);
        let table = [ArgumentRule {
            flag: "--module=",
            tag: tags::MODULE,
            mandatory: false,
            stop_on_error: true,
        }];
        assert!(matches!(
            assembler.assemble(&table, &PluginArgs::default()),
            Err(EngineError::MissingMandatoryField { .. })
        ));
    }

    #[test]
    fn unknown_tag_is_skipped_unless_fatal() {
        let resolver = FieldResolver::new();
        let assembler = CommandAssembler::new(&resolver);
        let args = PluginArgs {
            project: "p1".into(),
            ..PluginArgs::default()
        };

        let lenient = [
            ArgumentRule::optional("--nope=", "PLUGIN_DOES_NOT_EXIST"),
            ArgumentRule::optional("--project=", tags::PROJECT),
        ];
        assert_eq!(assembler.assemble(&lenient, &args).unwrap(), vec!["--project=p1"]);

        let strict = [ArgumentRule::required("--nope=", "PLUGIN_DOES_NOT_EXIST")];
        assert!(matches!(
            assembler.assemble(&strict, &args),
            Err(EngineError::FieldResolution { .. })
        ));
    }

    #[test]
    fn positional_helpers() {
        let resolver = FieldResolver::new();
        let assembler = CommandAssembler::new(&resolver);
        let args = PluginArgs {
            build_name: "t2".into(),
            ..PluginArgs::default()
        };
        assert_eq!(assembler.required(&args, tags::BUILD_NAME).unwrap(), "t2");
        assert_eq!(
            assembler.required(&args, tags::BUILD_NUMBER).unwrap_err(),
            EngineError::missing(tags::BUILD_NUMBER)
        );
        assert_eq!(assembler.optional(&args, tags::POM_FILE).unwrap(), None);
    }

    fn text_field(args: &mut PluginArgs, idx: usize) -> &mut String {
        match idx {
            0 => &mut args.build_name,
            1 => &mut args.project,
            _ => &mut args.module,
        }
    }

    proptest! {
        #[test]
        fn output_follows_table_order(
            values in proptest::collection::vec(proptest::option::of("[a-z0-9]{1,8}"), 3),
            order in Just(vec![0usize, 1, 2]).prop_shuffle(),
        ) {
            let resolver = FieldResolver::new();
            let assembler = CommandAssembler::new(&resolver);
            let all = [
                ArgumentRule::optional("--build-name=", tags::BUILD_NAME),
                ArgumentRule::optional("--project=", tags::PROJECT),
                ArgumentRule::optional("--module=", tags::MODULE),
            ];

            let mut args = PluginArgs::default();
            for (idx, value) in values.iter().enumerate() {
                if let Some(v) = value {
                    *text_field(&mut args, idx) = v.clone();
                }
            }

            let table: Vec<ArgumentRule> = order.iter().map(|&i| all[i]).collect();
            let expected: Vec<String> = order
                .iter()
                .filter_map(|&i| values[i].as_ref().map(|v| format!("{}{}", all[i].flag, v)))
                .collect();

            prop_assert_eq!(assembler.assemble(&table, &args).unwrap(), expected);
        }

        #[test]
        fn any_empty_mandatory_rule_aborts(
            present in proptest::collection::vec(any::<bool>(), 3),
        ) {
            let resolver = FieldResolver::new();
            let assembler = CommandAssembler::new(&resolver);
            let table = [
                ArgumentRule::required("--build-name=", tags::BUILD_NAME),
                ArgumentRule::required("--project=", tags::PROJECT),
                ArgumentRule::required("--module=", tags::MODULE),
            ];

            let mut args = PluginArgs::default();
            for (idx, set) in present.iter().enumerate() {
                if *set {
                    *text_field(&mut args, idx) = "x".to_string();
                }
            }

            let result = assembler.assemble(&table, &args);
            match present.iter().position(|p| !p) {
                Some(first_missing) => {
                    prop_assert_eq!(result.unwrap_err(), EngineError::missing(table[first_missing].tag));
                }
                None => prop_assert_eq!(result.unwrap().len(), 3),
            }
        }
    }
}
