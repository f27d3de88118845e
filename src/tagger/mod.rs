//! Tagging with learned rules.

use crate::{
    rule::{Rule, TemplateRegistry},
    types::{count_tokens, Sentence, Token},
};
use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

mod initial;
mod stats;

pub use initial::{DefaultTagger, LookupTagger};
pub use stats::{Stats, TemplateRow, TemplateStatistics};

/// Assigns a first tag to every word of a sequence.
/// Must return exactly one token per word, in order.
pub trait InitialTagger {
    fn tag(&self, words: &[&str]) -> Vec<Token>;
}

impl<'a, T: InitialTagger + ?Sized> InitialTagger for &'a T {
    fn tag(&self, words: &[&str]) -> Vec<Token> {
        (*self).tag(words)
    }
}

impl<T: InitialTagger + ?Sized> InitialTagger for Box<T> {
    fn tag(&self, words: &[&str]) -> Vec<Token> {
        self.as_ref().tag(words)
    }
}

/// An initial tagger followed by an ordered list of transformation rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrillTagger<T> {
    initial_tagger: T,
    rules: Vec<Rule>,
    train_stats: Option<Stats>,
}

impl<T: InitialTagger> BrillTagger<T> {
    pub fn new(initial_tagger: T, rules: Vec<Rule>) -> Self {
        BrillTagger {
            initial_tagger,
            rules,
            train_stats: None,
        }
    }

    pub(crate) fn with_stats(initial_tagger: T, rules: Vec<Rule>, train_stats: Stats) -> Self {
        BrillTagger {
            initial_tagger,
            rules,
            train_stats: Some(train_stats),
        }
    }

    pub fn initial_tagger(&self) -> &T {
        &self.initial_tagger
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Statistics of the training run this tagger was learned in, if any.
    pub fn train_stats(&self) -> Option<&Stats> {
        self.train_stats.as_ref()
    }

    /// Tags `words`: first with the initial tagger, then by applying every rule in order.
    ///
    /// Each rule is only tried at the positions currently bearing its original tag.
    pub fn tag(&self, words: &[&str]) -> Vec<Token> {
        let mut tokens = self.initial_tagger.tag(words);

        let mut tag_positions: FnvHashMap<String, BTreeSet<usize>> = FnvHashMap::default();
        for (i, token) in tokens.iter().enumerate() {
            tag_positions
                .entry(token.tag().to_string())
                .or_default()
                .insert(i);
        }

        for rule in &self.rules {
            let positions: Vec<usize> = match tag_positions.get(rule.original_tag()) {
                Some(positions) if !positions.is_empty() => positions.iter().copied().collect(),
                _ => continue,
            };

            for i in rule.apply_at(&mut tokens, positions) {
                if let Some(positions) = tag_positions.get_mut(rule.original_tag()) {
                    positions.remove(&i);
                }
                tag_positions
                    .entry(rule.replacement_tag().to_string())
                    .or_default()
                    .insert(i);
            }
        }

        tokens
    }

    pub fn tag_sents<'w, S: AsRef<[&'w str]>>(&self, sentences: &[S]) -> Vec<Sentence> {
        sentences.iter().map(|x| self.tag(x.as_ref())).collect()
    }

    /// The fraction of tokens in `gold` this tagger tags correctly.
    pub fn evaluate(&self, gold: &[Sentence]) -> f64 {
        let tokens = count_tokens(gold);
        if tokens == 0 {
            return 1.0;
        }

        let correct = gold
            .iter()
            .map(|sentence| {
                let words: Vec<&str> = sentence.iter().map(|x| x.word()).collect();
                self.tag(&words)
                    .iter()
                    .zip(sentence)
                    .filter(|(a, b)| a.tag() == b.tag())
                    .count()
            })
            .sum::<usize>();

        correct as f64 / tokens as f64
    }

    /// Tags `sequences` applying each rule to the whole corpus in turn,
    /// recording how many errors with respect to `gold` each rule removes.
    ///
    /// This is much slower than [tag][BrillTagger::tag], it is meant for inspecting
    /// how learned rules generalize.
    pub fn batch_tag_incremental(
        &self,
        sequences: &[Vec<&str>],
        gold: &[Sentence],
    ) -> (Vec<Sentence>, Stats) {
        let mut tagged: Vec<Sentence> = sequences
            .iter()
            .map(|x| self.initial_tagger.tag(x))
            .collect();

        let initial_errors = crate::types::count_errors(&tagged, gold);
        let mut errors = initial_errors as i64;
        let mut rule_scores = Vec::with_capacity(self.rules.len());

        for rule in &self.rules {
            let mut score = 0;

            for (sentence, gold_sentence) in tagged.iter_mut().zip(gold) {
                for i in rule.apply(sentence) {
                    if let Some(correct) = gold_sentence.get(i).map(|x| x.tag()) {
                        if correct == rule.original_tag() {
                            score -= 1;
                        }
                        if correct == rule.replacement_tag() {
                            score += 1;
                        }
                    }
                }
            }

            errors -= score;
            rule_scores.push(score);
        }

        let stats = Stats {
            token_count: sequences.iter().map(|x| x.len()).sum(),
            sequence_count: sequences.len(),
            template_count: None,
            initial_errors,
            final_errors: errors as usize,
            rule_scores,
            min_score: None,
            min_acc: None,
        };

        (tagged, stats)
    }

    /// Aggregates the training statistics (and optionally statistics on test data as computed
    /// by [batch_tag_incremental][BrillTagger::batch_tag_incremental]) per template.
    /// `None` if this tagger has no training statistics.
    pub fn template_statistics(
        &self,
        templates: &TemplateRegistry,
        test_stats: Option<&Stats>,
    ) -> Option<TemplateStatistics> {
        let train_stats = self.train_stats.as_ref()?;

        Some(TemplateStatistics::new(
            &self.rules,
            templates,
            train_stats.clone(),
            test_stats.cloned(),
        ))
    }
}

impl<T: InitialTagger> InitialTagger for BrillTagger<T> {
    fn tag(&self, words: &[&str]) -> Vec<Token> {
        BrillTagger::tag(self, words)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{Feature, Property, TemplateId};
    use crate::types::sentence;

    fn tagger() -> BrillTagger<DefaultTagger> {
        let previous = |value: Option<&str>| {
            vec![(
                Feature::new(Property::pos(), vec![-1]).unwrap(),
                value.map(|x| x.to_string()),
            )]
        };

        BrillTagger::new(
            DefaultTagger::new("NN"),
            vec![
                Rule::new(TemplateId::new(0), "NN", "DT", previous(None)),
                Rule::new(TemplateId::new(0), "NN", "VBD", previous(Some("NN"))),
            ],
        )
    }

    #[test]
    fn rules_apply_in_order() {
        let tagger = tagger();
        let tags: Vec<_> = tagger
            .tag(&["the", "dog", "barked"])
            .iter()
            .map(|x| x.tag().to_string())
            .collect();

        assert_eq!(tags, vec!["DT", "NN", "VBD"]);
        assert!(tagger.tag(&[]).is_empty());
    }

    #[test]
    fn no_rules_keeps_initial_tags() {
        let tagger = BrillTagger::new(DefaultTagger::new("NN"), vec![]);

        assert_eq!(
            tagger.tag(&["a", "b"]),
            sentence(&[("a", "NN"), ("b", "NN")])
        );
    }

    #[test]
    fn incremental_tagging_scores_rules() {
        let tagger = tagger();
        let gold = vec![
            sentence(&[("the", "DT"), ("dog", "NN"), ("barked", "VBD")]),
            sentence(&[("a", "DT"), ("cat", "NN"), ("food", "NN")]),
        ];
        let sequences = vec![vec!["the", "dog", "barked"], vec!["a", "cat", "food"]];

        let (tagged, stats) = tagger.batch_tag_incremental(&sequences, &gold);

        assert_eq!(tagged[0], gold[0]);
        assert_eq!(stats.initial_errors, 3);
        assert_eq!(stats.rule_scores, vec![2, 0]);
        assert_eq!(stats.final_errors, 1);
        assert_eq!(stats.token_count, 6);
        assert!((tagger.evaluate(&gold) - 5.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn taggers_stack() {
        let inner = tagger();
        let outer = BrillTagger::new(
            &inner,
            vec![Rule::new(
                TemplateId::new(0),
                "VBD",
                "VBN",
                vec![(
                    Feature::new(Property::word(), vec![0]).unwrap(),
                    Some("barked".into()),
                )],
            )],
        );

        assert_eq!(outer.tag(&["the", "dog", "barked"])[2].tag(), "VBN");
    }
}
