//! Ruleset bundling and compilation.
//!
//! [`BundledRuleset`] accumulates rule sources: inherited rulesets are merged
//! with [`BundledRuleset::extend`], then the ruleset's own entries are applied
//! with [`BundledRuleset::apply`]. [`BundledRuleset::compile`] turns the
//! enabled rules into an executable [`Ruleset`].

use std::collections::BTreeMap;

use crate::definition::{ExtendsMode, RuleDefinition, RuleEntry, RulesetDefinition, SeverityValue};
use crate::document::DocumentFormat;
use crate::error::EngineError;
use crate::functions::Function;
use crate::path::JsonPath;
use crate::severity::DiagnosticSeverity;

/// Maximum depth of alias-to-alias references.
const MAX_ALIAS_DEPTH: usize = 8;
/// Maximum alias expansion steps per rule.
const MAX_ALIAS_EXPANSIONS: usize = 1024;

/// A rule before compilation, with its resolved state.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSource {
    pub name: String,
    pub definition: RuleDefinition,
    pub severity: DiagnosticSeverity,
    pub enabled: bool,
}

impl RuleSource {
    fn new(name: String, definition: RuleDefinition) -> Self {
        let (severity, enabled) = match definition.severity {
            Some(SeverityValue::Off) => (DiagnosticSeverity::default(), false),
            Some(SeverityValue::Level(level)) => (level, definition.recommended),
            None => (DiagnosticSeverity::default(), definition.recommended),
        };
        Self {
            name,
            definition,
            severity,
            enabled,
        }
    }
}

/// Rules and aliases merged from a ruleset and everything it extends.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BundledRuleset {
    rules: Vec<RuleSource>,
    aliases: BTreeMap<String, Vec<String>>,
}

impl BundledRuleset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bundle a definition that has no `extends`.
    pub fn from_definition(definition: RulesetDefinition) -> Result<Self, EngineError> {
        let mut bundle = Self::new();
        bundle.apply(definition)?;
        Ok(bundle)
    }

    pub fn rules(&self) -> &[RuleSource] {
        &self.rules
    }

    pub fn rule(&self, name: &str) -> Option<&RuleSource> {
        self.rules.iter().find(|r| r.name == name)
    }

    /// Merge an inherited ruleset according to its extends mode.
    pub fn extend(&mut self, parent: BundledRuleset, mode: ExtendsMode) {
        for mut rule in parent.rules {
            rule.enabled = match mode {
                ExtendsMode::All => true,
                ExtendsMode::Recommended => rule.enabled && rule.definition.recommended,
                ExtendsMode::Off => false,
            };
            self.upsert(rule);
        }
        self.aliases.extend(parent.aliases);
    }

    /// Apply a ruleset's own aliases and rule entries on top of what it inherits.
    pub fn apply(&mut self, definition: RulesetDefinition) -> Result<(), EngineError> {
        self.aliases.extend(definition.aliases);

        for (name, entry) in definition.rules {
            match entry {
                RuleEntry::Definition(mut rule) => {
                    if rule.formats.is_none() {
                        rule.formats = definition.formats.clone();
                    }
                    self.upsert(RuleSource::new(name, *rule));
                }
                RuleEntry::Toggle(enabled) => {
                    self.inherited_mut(&name)?.enabled = enabled;
                }
                RuleEntry::Severity(SeverityValue::Off) => {
                    self.inherited_mut(&name)?.enabled = false;
                }
                RuleEntry::Severity(SeverityValue::Level(level)) => {
                    let rule = self.inherited_mut(&name)?;
                    rule.severity = level;
                    rule.enabled = true;
                }
            }
        }
        Ok(())
    }

    /// Compile every enabled rule.
    pub fn compile(&self) -> Result<Ruleset, EngineError> {
        let rules = self
            .rules
            .iter()
            .filter(|r| r.enabled)
            .map(|r| self.compile_rule(r))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Ruleset { rules })
    }

    fn upsert(&mut self, rule: RuleSource) {
        match self.rules.iter_mut().find(|r| r.name == rule.name) {
            Some(existing) => *existing = rule,
            None => self.rules.push(rule),
        }
    }

    fn inherited_mut(&mut self, name: &str) -> Result<&mut RuleSource, EngineError> {
        self.rules
            .iter_mut()
            .find(|r| r.name == name)
            .ok_or_else(|| EngineError::rule(name, "cannot override a rule that is not defined"))
    }

    fn compile_rule(&self, source: &RuleSource) -> Result<Rule, EngineError> {
        let name = source.name.as_str();
        let definition = &source.definition;

        let mut expressions = Vec::new();
        let mut budget = MAX_ALIAS_EXPANSIONS;
        for expression in definition.given.to_slice() {
            self.expand_alias(name, expression, 0, &mut budget, &mut expressions)?;
        }
        let given = expressions
            .iter()
            .map(|expression| JsonPath::parse(expression))
            .collect::<Result<Vec<_>, _>>()?;

        let then = definition
            .then
            .to_slice()
            .iter()
            .map(|then| {
                let field = then.field.as_deref().map(Field::parse).transpose()?;
                let function = Function::compile(&then.function, then.function_options.as_ref())
                    .map_err(|reason| EngineError::rule(name, reason))?;
                Ok(Then { field, function })
            })
            .collect::<Result<Vec<_>, EngineError>>()?;

        let formats = definition
            .formats
            .iter()
            .flatten()
            .map(|f| {
                DocumentFormat::parse(f)
                    .ok_or_else(|| EngineError::rule(name, format!("unknown format '{}'", f)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Rule {
            name: source.name.clone(),
            description: definition.description.clone(),
            message: definition.message.clone(),
            severity: source.severity,
            documentation_url: definition.documentation_url.clone(),
            given,
            then,
            formats,
        })
    }

    /// Expand `#Alias.rest` into the alias targets with `.rest` appended.
    ///
    /// Every expression visited consumes one unit of `budget`.
    fn expand_alias(
        &self,
        rule: &str,
        expression: &str,
        depth: usize,
        budget: &mut usize,
        out: &mut Vec<String>,
    ) -> Result<(), EngineError> {
        if *budget == 0 {
            return Err(EngineError::rule(
                rule,
                format!(
                    "aliases expand to more than {} expressions",
                    MAX_ALIAS_EXPANSIONS
                ),
            ));
        }
        *budget -= 1;

        let Some(reference) = expression.strip_prefix('#') else {
            out.push(expression.to_string());
            return Ok(());
        };
        if depth >= MAX_ALIAS_DEPTH {
            return Err(EngineError::rule(
                rule,
                format!("alias '{}' is nested too deeply", expression),
            ));
        }

        let split = reference.find(['.', '[']).unwrap_or(reference.len());
        let (alias, rest) = reference.split_at(split);
        let targets = self.aliases.get(alias).ok_or_else(|| {
            EngineError::rule(rule, format!("alias '{}' is not defined", alias))
        })?;

        for target in targets {
            let joined = format!("{}{}", target, rest);
            self.expand_alias(rule, &joined, depth + 1, budget, out)?;
        }
        Ok(())
    }
}

/// A `then.field` selector.
#[derive(Debug, Clone)]
pub enum Field {
    /// `@key`: the keys of an object.
    Key,
    /// `$...`: a JSONPath relative to the matched node.
    Path(JsonPath),
    /// A property path such as `info.contact` or `tags[0]`.
    Property(Vec<String>),
}

impl Field {
    pub fn parse(field: &str) -> Result<Self, EngineError> {
        if field == "@key" {
            return Ok(Self::Key);
        }
        if field.starts_with('$') {
            return JsonPath::parse(field).map(Self::Path);
        }

        let mut segments = Vec::new();
        for part in field.split('.') {
            let mut rest = part;
            // Bracketed segments: `tags[0]`, `responses['200']`.
            if let Some(open) = rest.find('[') {
                if open > 0 {
                    segments.push(rest[..open].to_string());
                }
                rest = &rest[open..];
                while let Some(inner) = rest.strip_prefix('[') {
                    let close = inner.find(']').ok_or_else(|| EngineError::InvalidPath {
                        expression: field.to_string(),
                        reason: "unterminated '['".into(),
                    })?;
                    let key = inner[..close].trim_matches(|c| c == '\'' || c == '"');
                    segments.push(key.to_string());
                    rest = &inner[close + 1..];
                }
                if !rest.is_empty() {
                    return Err(EngineError::InvalidPath {
                        expression: field.to_string(),
                        reason: format!("unexpected '{}'", rest),
                    });
                }
            } else if !rest.is_empty() {
                segments.push(rest.to_string());
            }
        }
        if segments.is_empty() {
            return Err(EngineError::InvalidPath {
                expression: field.to_string(),
                reason: "empty field".into(),
            });
        }
        Ok(Self::Property(segments))
    }
}

/// One `then` clause.
#[derive(Debug)]
pub struct Then {
    pub field: Option<Field>,
    pub function: Function,
}

/// A compiled rule.
#[derive(Debug)]
pub struct Rule {
    pub name: String,
    pub description: Option<String>,
    pub message: Option<String>,
    pub severity: DiagnosticSeverity,
    pub documentation_url: Option<String>,
    pub given: Vec<JsonPath>,
    pub then: Vec<Then>,
    /// Empty when the rule applies to every document.
    pub formats: Vec<DocumentFormat>,
}

/// A compiled, executable ruleset.
#[derive(Debug, Default)]
pub struct Ruleset {
    pub(crate) rules: Vec<Rule>,
}

impl Ruleset {
    /// Parse and compile ruleset text that does not use `extends`.
    pub fn from_text(text: &str) -> Result<Self, EngineError> {
        let definition = RulesetDefinition::parse(text)?;
        if !definition.extends.is_empty() {
            return Err(EngineError::InvalidRuleset(
                "'extends' requires the ruleset loader".into(),
            ));
        }
        BundledRuleset::from_definition(definition)?.compile()
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(text: &str) -> RulesetDefinition {
        RulesetDefinition::parse(text).unwrap()
    }

    const PARENT: &str = r##"
aliases:
  Info: ["$.info"]
rules:
  info-contact:
    given: "#Info"
    then: { field: contact, function: truthy }
  info-license:
    recommended: false
    given: "$.info"
    then: { field: license, function: truthy }
  no-tags:
    severity: error
    given: "$"
    then: { field: tags, function: undefined }
"##;

    fn parent() -> BundledRuleset {
        BundledRuleset::from_definition(definition(PARENT)).unwrap()
    }

    #[test]
    fn own_rules_follow_recommended() {
        let bundle = parent();
        assert!(bundle.rule("info-contact").unwrap().enabled);
        assert!(!bundle.rule("info-license").unwrap().enabled);
        assert_eq!(
            bundle.rule("no-tags").unwrap().severity,
            DiagnosticSeverity::Error
        );
    }

    #[test]
    fn extends_modes() {
        let mut all = BundledRuleset::new();
        all.extend(parent(), ExtendsMode::All);
        assert!(all.rules().iter().all(|r| r.enabled));

        let mut recommended = BundledRuleset::new();
        recommended.extend(parent(), ExtendsMode::Recommended);
        assert!(recommended.rule("info-contact").unwrap().enabled);
        assert!(!recommended.rule("info-license").unwrap().enabled);

        let mut off = BundledRuleset::new();
        off.extend(parent(), ExtendsMode::Off);
        assert!(off.rules().iter().all(|r| !r.enabled));
        assert_eq!(off.compile().unwrap().rules().len(), 0);
    }

    #[test]
    fn overrides_toggle_and_severity() {
        let mut bundle = BundledRuleset::new();
        bundle.extend(parent(), ExtendsMode::Recommended);
        bundle
            .apply(definition(
                "rules:\n  info-license: true\n  info-contact: off\n  no-tags: hint\n",
            ))
            .unwrap();

        assert!(bundle.rule("info-license").unwrap().enabled);
        assert!(!bundle.rule("info-contact").unwrap().enabled);
        let no_tags = bundle.rule("no-tags").unwrap();
        assert!(no_tags.enabled);
        assert_eq!(no_tags.severity, DiagnosticSeverity::Hint);
    }

    #[test]
    fn overriding_unknown_rule_fails() {
        let mut bundle = parent();
        let err = bundle
            .apply(definition("rules:\n  missing-rule: false\n"))
            .unwrap_err();
        assert!(err.to_string().contains("missing-rule"));
    }

    #[test]
    fn redefinition_replaces_in_place() {
        let mut bundle = BundledRuleset::new();
        bundle.extend(parent(), ExtendsMode::Recommended);
        bundle
            .apply(definition(
                "rules:\n  info-contact:\n    given: $\n    then: { function: truthy }\n",
            ))
            .unwrap();
        assert_eq!(bundle.rules()[0].name, "info-contact");
        assert_eq!(bundle.rules()[0].definition.given.to_slice(), ["$"]);
    }

    #[test]
    fn aliases_expand_with_remainder() {
        let text = r##"
aliases:
  PathItem: ["$.paths[*]"]
  Operation: ["#PathItem['get','put']", "#PathItem.post"]
rules:
  op-summary:
    given: "#Operation"
    then: { field: summary, function: truthy }
"##;
        let ruleset = Ruleset::from_text(text).unwrap();
        let given: Vec<&str> = ruleset.rules()[0].given.iter().map(|p| p.as_str()).collect();
        assert_eq!(given, ["$.paths[*]['get','put']", "$.paths[*].post"]);
    }

    #[test]
    fn unknown_alias_fails() {
        let text = "rules:\n  r:\n    given: '#Nope'\n    then: { function: truthy }\n";
        let err = Ruleset::from_text(text).unwrap_err();
        assert!(err.to_string().contains("alias 'Nope' is not defined"));
    }

    #[test]
    fn recursive_alias_fails() {
        let text = "aliases:\n  A: ['#A']\nrules:\n  r:\n    given: '#A'\n    then: { function: truthy }\n";
        assert!(Ruleset::from_text(text).is_err());
    }

    fn fan_out_aliases(levels: usize, leaf: &str) -> String {
        let mut text = String::from("aliases:\n");
        for i in 0..levels {
            let targets = vec![format!("'#A{}'", i + 1); 10].join(", ");
            text.push_str(&format!("  A{}: [{}]\n", i, targets));
        }
        text.push_str(&format!("  A{}: [{}]\n", levels, leaf));
        text.push_str("rules:\n  r:\n    given: '#A0'\n    then: { function: truthy }\n");
        text
    }

    #[test]
    fn alias_fan_out_is_bounded() {
        for leaf in ["'$.info'", ""] {
            let err = Ruleset::from_text(&fan_out_aliases(7, leaf)).unwrap_err();
            assert!(
                matches!(&err, EngineError::InvalidRule { reason, .. } if reason.contains("expand to more than")),
                "got {:?}",
                err
            );
        }

        let ruleset = Ruleset::from_text(&fan_out_aliases(2, "'$.info'")).unwrap();
        assert_eq!(ruleset.rules()[0].given.len(), 100);
    }

    #[test]
    fn ruleset_formats_are_inherited_by_rules() {
        let text = "formats: [oas3]\nrules:\n  r:\n    given: $\n    then: { function: truthy }\n";
        let ruleset = Ruleset::from_text(text).unwrap();
        assert_eq!(ruleset.rules()[0].formats, [DocumentFormat::Oas3]);
    }

    #[test]
    fn unknown_format_and_function_fail() {
        let bad_format =
            "rules:\n  r:\n    formats: [raml]\n    given: $\n    then: { function: truthy }\n";
        assert!(Ruleset::from_text(bad_format).is_err());
        let bad_function = "rules:\n  r:\n    given: $\n    then: { function: customFn }\n";
        let err = Ruleset::from_text(bad_function).unwrap_err();
        assert!(matches!(err, EngineError::InvalidRule { .. }));
    }

    #[test]
    fn extends_needs_loader() {
        let text = "extends: ./base.yaml\nrules: {}\n";
        assert!(Ruleset::from_text(text).is_err());
    }

    #[test]
    fn field_parsing() {
        assert!(matches!(Field::parse("@key").unwrap(), Field::Key));
        assert!(matches!(Field::parse("$.a[*]").unwrap(), Field::Path(_)));
        match Field::parse("responses['200'].content").unwrap() {
            Field::Property(segments) => assert_eq!(segments, ["responses", "200", "content"]),
            other => panic!("unexpected field {:?}", other),
        }
        match Field::parse("tags[0]").unwrap() {
            Field::Property(segments) => assert_eq!(segments, ["tags", "0"]),
            other => panic!("unexpected field {:?}", other),
        }
        assert!(Field::parse("a[0").is_err());
        assert!(Field::parse("").is_err());
    }
}
