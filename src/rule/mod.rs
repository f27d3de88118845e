//! Transformation rules and the templates generating them.

use crate::{types::Token, Error};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

mod feature;
pub mod presets;
pub mod record;
mod template;

pub use feature::{concrete, Extract, Feature, Property};
pub use template::{Template, TemplateId, TemplateRegistry};

/// A feature and the value it must observe at one of its positions.
/// `None` observes the sentence boundary.
pub type Condition = (Feature, Option<String>);

/// How rules are printed in logs and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleFormat {
    /// `NN->VB if Pos:TO@[-1]`
    Str,
    /// `Rule('000', 'NN', 'VB', [(Pos([-1]),'TO')])`
    Repr,
    /// `NN -> VB if the Pos of the preceding word is "TO"`
    Verbose,
}

impl Default for RuleFormat {
    fn default() -> Self {
        RuleFormat::Str
    }
}

impl FromStr for RuleFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "str" => Ok(RuleFormat::Str),
            "repr" => Ok(RuleFormat::Repr),
            "verbose" => Ok(RuleFormat::Verbose),
            _ => Err(Error::InvalidOption {
                name: "rule_format",
                reason: format!("expected one of `str`, `repr` or `verbose`, found `{}`", s),
            }),
        }
    }
}

/// Changes the tag of a token from `original_tag` to `replacement_tag` if all conditions hold.
///
/// Rules are ordered by their template id, tags and conditions in this order.
/// This order breaks ties between equally scored rules during deterministic training.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Rule {
    template_id: TemplateId,
    original_tag: String,
    replacement_tag: String,
    conditions: Vec<Condition>,
}

impl Rule {
    pub fn new<O: Into<String>, R: Into<String>>(
        template_id: TemplateId,
        original_tag: O,
        replacement_tag: R,
        conditions: Vec<Condition>,
    ) -> Self {
        Rule {
            template_id,
            original_tag: original_tag.into(),
            replacement_tag: replacement_tag.into(),
            conditions,
        }
    }

    pub fn template_id(&self) -> TemplateId {
        self.template_id
    }

    pub fn original_tag(&self) -> &str {
        &self.original_tag
    }

    pub fn replacement_tag(&self) -> &str {
        &self.replacement_tag
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Whether this rule would change the tag at `index`: the token must have the original tag
    /// and each feature must observe its value at one or more of its positions.
    pub fn applies(&self, tokens: &[Token], index: usize) -> bool {
        tokens[index].tag() == self.original_tag
            && self
                .conditions
                .iter()
                .all(|(feature, value)| feature.observe(tokens, index).any(|x| x == value.as_deref()))
    }

    /// Applies this rule everywhere in `tokens`. Returns the changed indices.
    pub fn apply(&self, tokens: &mut [Token]) -> Vec<usize> {
        let len = tokens.len();
        self.apply_at(tokens, 0..len)
    }

    /// Applies this rule at the given indices only. Returns the changed indices.
    ///
    /// All applicable indices are determined before any tag is rewritten,
    /// so the rule never sees its own changes.
    pub fn apply_at<I: IntoIterator<Item = usize>>(
        &self,
        tokens: &mut [Token],
        positions: I,
    ) -> Vec<usize> {
        let changed: Vec<usize> = positions
            .into_iter()
            .filter(|i| self.applies(tokens, *i))
            .collect();

        for i in &changed {
            tokens[*i].set_tag(self.replacement_tag.as_str());
        }

        changed
    }

    pub fn format(&self, format: RuleFormat) -> String {
        match format {
            RuleFormat::Str => self.to_string(),
            RuleFormat::Repr => format!(
                "Rule('{}', '{}', '{}', [{}])",
                self.template_id,
                self.original_tag,
                self.replacement_tag,
                self.conditions
                    .iter()
                    .map(|(feature, value)| match value {
                        Some(value) => format!("({},'{}')", feature, value),
                        None => format!("({},None)", feature),
                    })
                    .join(", ")
            ),
            RuleFormat::Verbose => {
                let mut out = format!("{} -> {}", self.original_tag, self.replacement_tag);

                if !self.conditions.is_empty() {
                    out.push_str(" if ");
                    out.push_str(
                        &self
                            .conditions
                            .iter()
                            .map(|(feature, value)| {
                                format!(
                                    "the {} of {} is {}",
                                    feature.property().name(),
                                    describe_positions(feature.positions()),
                                    value
                                        .as_ref()
                                        .map_or("outside the sentence".to_string(), |x| format!(
                                            "\"{}\"",
                                            x
                                        ))
                                )
                            })
                            .join(", and "),
                    );
                }

                out
            }
        }
    }
}

fn describe_positions(positions: &[isize]) -> String {
    match positions {
        [0] => "this word".to_string(),
        [-1] => "the preceding word".to_string(),
        [1] => "the following word".to_string(),
        [x] => format!("word i{:+}", x),
        [first, .., last] if (last - first) as usize == positions.len() - 1 => {
            format!("words i{:+}...i{:+}", first, last)
        }
        _ => format!(
            "words {{{}}}",
            positions.iter().map(|x| format!("i{:+}", x)).join(",")
        ),
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.original_tag, self.replacement_tag)?;

        for (i, (feature, value)) in self.conditions.iter().enumerate() {
            write!(
                f,
                "{}{}:{}@[{}]",
                if i == 0 { " if " } else { " & " },
                feature.property().name(),
                value.as_deref().unwrap_or("None"),
                feature.positions().iter().join(",")
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::sentence;

    fn to_rule() -> Rule {
        Rule::new(
            TemplateId::new(1),
            "NN",
            "VB",
            vec![
                (
                    Feature::new(Property::pos(), vec![-1]).unwrap(),
                    Some("TO".into()),
                ),
                (
                    Feature::new(Property::word(), vec![-3, -2]).unwrap(),
                    Some("want".into()),
                ),
            ],
        )
    }

    #[test]
    fn applies_checks_tag_and_conditions() {
        let rule = to_rule();
        let tokens = sentence(&[
            ("I", "PRP"),
            ("want", "VBP"),
            ("to", "TO"),
            ("run", "NN"),
            ("run", "NN"),
        ]);

        assert!(rule.applies(&tokens, 3));
        // the preceding tag is NN
        assert!(!rule.applies(&tokens, 4));
        // wrong original tag
        assert!(!rule.applies(&tokens, 2));
    }

    #[test]
    fn apply_is_simultaneous() {
        let rule = Rule::new(
            TemplateId::new(0),
            "NN",
            "VB",
            vec![(
                Feature::new(Property::pos(), vec![-1]).unwrap(),
                Some("NN".into()),
            )],
        );
        let mut tokens = sentence(&[("a", "NN"), ("b", "NN"), ("c", "NN")]);

        assert_eq!(rule.apply(&mut tokens), vec![1, 2]);
        assert_eq!(
            tokens.iter().map(|x| x.tag()).collect::<Vec<_>>(),
            vec!["NN", "VB", "VB"]
        );
    }

    #[test]
    fn boundary_conditions() {
        let rule = Rule::new(
            TemplateId::new(0),
            "NN",
            "DT",
            vec![(Feature::new(Property::pos(), vec![-1]).unwrap(), None)],
        );
        let mut tokens = sentence(&[("the", "NN"), ("dog", "NN")]);

        assert_eq!(rule.apply_at(&mut tokens, vec![0, 1]), vec![0]);
        assert_eq!(tokens[0].tag(), "DT");
    }

    #[test]
    fn formats() {
        let rule = to_rule();

        assert_eq!(rule.to_string(), "NN->VB if Pos:TO@[-1] & Word:want@[-3,-2]");
        assert_eq!(
            rule.format(RuleFormat::Repr),
            "Rule('001', 'NN', 'VB', [(Pos([-1]),'TO'), (Word([-3, -2]),'want')])"
        );
        assert_eq!(
            rule.format(RuleFormat::Verbose),
            "NN -> VB if the Pos of the preceding word is \"TO\", and the Word of words i-3...i-2 is \"want\""
        );
        assert_eq!(describe_positions(&[-3, -1]), "words {i-3,i-1}");
        assert_eq!(describe_positions(&[2]), "word i+2");
        assert_eq!("verbose".parse::<RuleFormat>().unwrap(), RuleFormat::Verbose);
    }
}
