//! Learning rules from gold data.
//!
//! [Trainer] is the fast, incremental trainer: it keeps a [scored rule index][index] up to date
//! and only re-examines the neighborhood of changed tags after each learned rule.
//! [ExhaustiveTrainer] rescans the whole corpus for every rule. It is much slower
//! but simple, and learns the same rules when training is deterministic.

use crate::{
    rule::{Rule, RuleFormat, TemplateRegistry},
    tagger::{BrillTagger, InitialTagger, Stats},
    types::{count_errors, count_tokens, untag, Position, Sentence},
    Error,
};
use log::{debug, info, log_enabled, trace, warn, Level};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeSet,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

mod exhaustive;
mod index;

pub use exhaustive::ExhaustiveTrainer;

use index::{Criteria, EffectCounts, ScoredRuleIndex};

/// Options for training.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TrainerOptions {
    /// Stop after learning this many rules.
    pub max_rules: usize,
    /// Only learn rules which fix at least this many more errors than they introduce.
    pub min_score: i64,
    /// Only learn rules for which `fixed / (fixed + broken)` is at least this value.
    pub min_acc: Option<f64>,
    /// Break ties between equally scored rules by their ordering. Makes training reproducible.
    pub deterministic: bool,
    /// How learned rules are printed in logs.
    pub rule_format: RuleFormat,
}

impl Default for TrainerOptions {
    fn default() -> Self {
        TrainerOptions {
            max_rules: 200,
            min_score: 2,
            min_acc: None,
            deterministic: false,
            rule_format: RuleFormat::default(),
        }
    }
}

impl TrainerOptions {
    pub fn validate(&self) -> Result<(), Error> {
        if self.min_score < 1 {
            return Err(Error::InvalidOption {
                name: "min_score",
                reason: format!("must be at least 1, found {}", self.min_score),
            });
        }

        if let Some(min_acc) = self.min_acc {
            if !(0.0..=1.0).contains(&min_acc) {
                return Err(Error::InvalidOption {
                    name: "min_acc",
                    reason: format!("must be between 0 and 1, found {}", min_acc),
                });
            }
        }

        Ok(())
    }

    fn criteria(&self) -> Criteria {
        Criteria {
            min_score: self.min_score,
            min_acc: self.min_acc,
            deterministic: self.deterministic,
        }
    }
}

/// Stops a running training from another thread. Training returns the rules learned so far.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Tags the words of `gold` with the initial tagger.
fn initial_tagging<T: InitialTagger>(tagger: &T, gold: &[Sentence]) -> Result<Vec<Sentence>, Error> {
    gold.iter()
        .map(|sentence| {
            let tagged = tagger.tag(&untag(sentence));

            if tagged.len() != sentence.len() {
                return Err(Error::LengthMismatch {
                    expected: sentence.len(),
                    found: tagged.len(),
                });
            }
            Ok(tagged)
        })
        .collect()
}

fn initial_stats(
    gold: &[Sentence],
    working: &[Sentence],
    templates: &TemplateRegistry,
    options: &TrainerOptions,
) -> Stats {
    let errors = count_errors(working, gold);

    Stats {
        token_count: count_tokens(gold),
        sequence_count: gold.len(),
        template_count: Some(templates.len()),
        initial_errors: errors,
        final_errors: errors,
        rule_scores: Vec::new(),
        min_score: Some(options.min_score),
        min_acc: options.min_acc,
    }
}

fn log_start(kind: &str, stats: &Stats) {
    info!(
        "TBL train ({}) (seqs: {}; tokens: {}; tpls: {}; min score: {}; min acc: {})",
        kind,
        stats.sequence_count,
        stats.token_count,
        stats.template_count.unwrap_or(0),
        stats.min_score.unwrap_or(0),
        stats
            .min_acc
            .map_or_else(|| "None".to_string(), |x| x.to_string())
    );
}

fn log_header() {
    if log_enabled!(Level::Debug) {
        debug!(
            "\n   B      |\n   S   F   r   O  |        Score = Fixed - Broken\n   c   i   o   t  |  R     Fixed = num tags changed incorrect -> correct\n   o   x   k   h  |  u     Broken = num tags changed correct -> incorrect\n   r   e   e   e  |  l     Other = num tags changed incorrect -> incorrect\n   e   d   n   r  |  e\n------------------+-------------------------------------------------------"
        );
    }
}

fn log_rule(rule: &Rule, score: i64, counts: EffectCounts, format: RuleFormat) {
    debug!(
        "{:4}{:4}{:4}{:4}  | {}",
        score,
        counts.fixed,
        counts.broken,
        counts.neutral,
        rule.format(format)
    );
}

fn log_finish(stats: &Stats) {
    info!(
        "finished training {} rules: initial errors {} ({:.4}), final errors {} ({:.4})",
        stats.rule_scores.len(),
        stats.initial_errors,
        stats.initial_accuracy(),
        stats.final_errors,
        stats.final_accuracy()
    );
}

/// Learns rules incrementally.
pub struct Trainer<'a, T> {
    initial_tagger: T,
    templates: &'a TemplateRegistry,
    options: TrainerOptions,
}

impl<'a, T: InitialTagger + Clone> Trainer<'a, T> {
    /// Creates a trainer proposing rules from `templates` to correct the output of `initial_tagger`.
    ///
    /// # Errors
    /// - If the options are invalid.
    pub fn new(
        initial_tagger: T,
        templates: &'a TemplateRegistry,
        options: TrainerOptions,
    ) -> Result<Self, Error> {
        options.validate()?;

        Ok(Trainer {
            initial_tagger,
            templates,
            options,
        })
    }

    pub fn options(&self) -> &TrainerOptions {
        &self.options
    }

    /// Learns rules on `gold` until `max_rules` are found or no rule reaches `min_score`.
    ///
    /// # Errors
    /// - If the initial tagger does not return one token per word.
    pub fn train(&self, gold: &[Sentence]) -> Result<BrillTagger<T>, Error> {
        self.train_with_cancellation(gold, &CancellationToken::new())
    }

    /// Like [train][Trainer::train], but stops early once `token` is cancelled.
    pub fn train_with_cancellation(
        &self,
        gold: &[Sentence],
        token: &CancellationToken,
    ) -> Result<BrillTagger<T>, Error> {
        let working = initial_tagging(&self.initial_tagger, gold)?;
        let mut stats = initial_stats(gold, &working, self.templates, &self.options);
        log_start("fast", &stats);

        info!("finding initial useful rules...");
        let mut run = TrainingRun::new(gold, working, self.templates);
        info!("found {} useful rules", run.index.rule_count());
        log_header();

        let criteria = self.options.criteria();
        let mut rules = Vec::new();

        while rules.len() < self.options.max_rules {
            if token.is_cancelled() {
                warn!("training stopped manually -- {} rules found", rules.len());
                break;
            }

            let id = match run.index.best_rule(&run.working, gold, criteria) {
                Some(id) => id,
                None => {
                    debug!("no rule reaches the minimum score, stopping");
                    break;
                }
            };

            let rule = run.index.rule(id).clone();
            let score = run.index.score(id);
            log_rule(&rule, score, run.index.effect_counts(id), self.options.rule_format);

            let positions: Vec<Position> = run.index.positions(id).collect();
            run.apply_rule(&rule, &positions);
            run.update_tag_positions(&rule, &positions);
            let counts = run.update_rules(&positions);
            trace!(
                "applied to {} positions; updated {} obsolete, {} new ({} unseen) rule positions",
                positions.len(),
                counts.obsolete,
                counts.new,
                counts.unseen
            );

            rules.push(rule);
            stats.rule_scores.push(score);
        }

        let fixed: i64 = stats.rule_scores.iter().sum();
        stats.final_errors = (stats.initial_errors as i64 - fixed) as usize;
        debug_assert_eq!(stats.final_errors, count_errors(&run.working, gold));
        log_finish(&stats);

        Ok(BrillTagger::with_stats(
            self.initial_tagger.clone(),
            rules,
            stats,
        ))
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct UpdateCounts {
    obsolete: usize,
    new: usize,
    unseen: usize,
}

/// The state of one training run: the corpus as currently tagged and the index describing it.
struct TrainingRun<'t> {
    gold: &'t [Sentence],
    working: Vec<Sentence>,
    templates: &'t TemplateRegistry,
    index: ScoredRuleIndex,
}

impl<'t> TrainingRun<'t> {
    fn new(gold: &'t [Sentence], working: Vec<Sentence>, templates: &'t TemplateRegistry) -> Self {
        let mut run = TrainingRun {
            gold,
            working,
            templates,
            index: ScoredRuleIndex::new(),
        };
        run.init_mappings();
        run
    }

    /// Records the position of every tag and every rule which would fix an error.
    fn init_mappings(&mut self) {
        let TrainingRun {
            gold,
            working,
            templates,
            index,
        } = self;

        for (s, sentence) in working.iter().enumerate() {
            for (w, token) in sentence.iter().enumerate() {
                index.push_tag_position(token.tag(), (s, w));

                let correct = gold[s][w].tag();
                if token.tag() == correct {
                    continue;
                }

                for template in templates.iter() {
                    for rule in template.applicable_rules(sentence, w, correct) {
                        let (id, _) = index.intern(rule);
                        index.update_rule_applies(id, (s, w), correct);
                    }
                }
            }
        }
    }

    fn apply_rule(&mut self, rule: &Rule, positions: &[Position]) {
        for &(s, w) in positions {
            self.working[s][w].set_tag(rule.replacement_tag());
        }
    }

    fn update_tag_positions(&mut self, rule: &Rule, positions: &[Position]) {
        for &position in positions {
            self.index
                .move_tag_position(position, rule.original_tag(), rule.replacement_tag());
        }
    }

    /// Updates the index in the neighborhood of `positions`, which just changed their tag.
    fn update_rules(&mut self, positions: &[Position]) -> UpdateCounts {
        let TrainingRun {
            gold,
            working,
            templates,
            index,
        } = self;

        let mut neighbors = BTreeSet::new();
        for &(s, w) in positions {
            for template in templates.iter() {
                neighbors.extend(
                    template
                        .get_neighborhood(&working[s], w)
                        .into_iter()
                        .map(|i| (s, i)),
                );
            }
        }

        let mut counts = UpdateCounts::default();

        for (s, w) in neighbors {
            let sentence = &working[s];
            let correct = gold[s][w].tag();
            let mut known = index.rules_at((s, w));

            for &id in &known {
                if !index.rule(id).applies(sentence, w) {
                    counts.obsolete += 1;
                    index.update_rule_not_applies(id, (s, w));
                }
            }

            for template in templates.iter() {
                for rule in template.applicable_rules(sentence, w, correct) {
                    let (id, unseen) = index.intern(rule);

                    if known.insert(id) {
                        counts.new += 1;
                        if unseen {
                            counts.unseen += 1;
                        }
                        index.update_rule_applies(id, (s, w), correct);
                    }
                }
            }

            // rules which are not proposed here (e.g. because they break the tag)
            // must still be recorded if they were already scanned past this position
            for id in index.rules_unknown_at((s, w)) {
                if !known.contains(&id) && index.rule(id).applies(sentence, w) {
                    counts.new += 1;
                    index.update_rule_applies(id, (s, w), correct);
                }
            }
        }

        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        rule::{presets, Feature, Property},
        tagger::DefaultTagger,
        types::{sentence, Token},
    };
    use quickcheck::{Arbitrary, Gen};
    use quickcheck_macros::quickcheck;

    fn walk_corpus() -> Vec<Sentence> {
        vec![
            sentence(&[("I", "PRP"), ("want", "VBP"), ("to", "TO"), ("walk", "VB")]),
            sentence(&[("a", "DT"), ("walk", "NN"), ("is", "VBZ"), ("nice", "JJ")]),
            sentence(&[("to", "TO"), ("run", "VB"), ("is", "VBZ"), ("to", "TO"), ("walk", "VB")]),
            sentence(&[("the", "DT"), ("run", "NN"), ("ended", "VBD")]),
            sentence(&[("I", "PRP"), ("run", "VBP"), ("to", "TO"), ("the", "DT"), ("walk", "NN")]),
        ]
    }

    fn initial() -> DefaultTagger {
        DefaultTagger::new("NN")
    }

    /// Runs the training loop by hand, checking the index against a full rescan after every step.
    fn train_checked(
        gold: &[Sentence],
        templates: &TemplateRegistry,
        max_rules: usize,
    ) -> Result<Vec<Rule>, String> {
        let working = initial_tagging(&initial(), gold).map_err(|x| x.to_string())?;
        let mut run = TrainingRun::new(gold, working, templates);
        let criteria = Criteria {
            min_score: 1,
            min_acc: None,
            deterministic: true,
        };
        let mut rules = Vec::new();

        for _ in 0..max_rules {
            run.index.check(&run.working, gold)?;

            // every rule fixing an error must be known at that position
            for (s, sentence) in run.working.iter().enumerate() {
                for w in 0..sentence.len() {
                    for template in templates.iter() {
                        for rule in template.applicable_rules(sentence, w, gold[s][w].tag()) {
                            let printed = rule.to_string();
                            let (id, unseen) = run.index.intern(rule);
                            if unseen || !run.index.positions(id).any(|x| x == (s, w)) {
                                return Err(format!("{} is not recorded at {:?}", printed, (s, w)));
                            }
                        }
                    }
                }
            }

            let id = match run.index.best_rule(&run.working, gold, criteria) {
                Some(id) => id,
                None => break,
            };
            let rule = run.index.rule(id).clone();
            let positions: Vec<Position> = run.index.positions(id).collect();

            run.apply_rule(&rule, &positions);
            run.update_tag_positions(&rule, &positions);
            run.update_rules(&positions);
            rules.push(rule);
        }

        run.index.check(&run.working, gold)?;
        Ok(rules)
    }

    /// A small corpus over few words and tags together with templates looking far to both sides.
    #[derive(Debug, Clone)]
    struct WideSetup {
        gold: Vec<Sentence>,
        features: Vec<Vec<(bool, Vec<isize>)>>,
    }

    impl WideSetup {
        fn templates(&self) -> TemplateRegistry {
            let mut templates = TemplateRegistry::new();
            for features in &self.features {
                let features = features
                    .iter()
                    .map(|(is_word, positions)| {
                        let property = if *is_word {
                            Property::word()
                        } else {
                            Property::pos()
                        };
                        Feature::new(property, positions.clone()).unwrap()
                    })
                    .collect();
                templates.push(features).unwrap();
            }
            templates
        }
    }

    impl Arbitrary for WideSetup {
        fn arbitrary(g: &mut Gen) -> Self {
            let words = ["a", "b", "c"];
            let tags = ["NN", "X", "Y"];
            let offset = |g: &mut Gen| (usize::arbitrary(g) % 9) as isize - 4;

            let gold = (0..1 + usize::arbitrary(g) % 4)
                .map(|_| {
                    (0..1 + usize::arbitrary(g) % 7)
                        .map(|_| {
                            Token::new(*g.choose(&words).unwrap(), *g.choose(&tags).unwrap())
                        })
                        .collect()
                })
                .collect();
            let features = (0..1 + usize::arbitrary(g) % 4)
                .map(|_| {
                    (0..1 + usize::arbitrary(g) % 2)
                        .map(|_| {
                            let positions = (0..1 + usize::arbitrary(g) % 3)
                                .map(|_| offset(g))
                                .collect();
                            (bool::arbitrary(g), positions)
                        })
                        .collect()
                })
                .collect();

            WideSetup { gold, features }
        }
    }

    #[test]
    fn index_matches_rescan() {
        let gold = walk_corpus();
        let templates = presets::brill24().unwrap();

        let rules = train_checked(&gold, &templates, 10).unwrap();
        assert!(!rules.is_empty());
    }

    #[quickcheck]
    fn index_matches_rescan_with_wide_templates(setup: WideSetup) -> bool {
        train_checked(&setup.gold, &setup.templates(), 30).is_ok()
    }

    #[test]
    fn learns_the_minimal_example() {
        let gold = vec![sentence(&[("the", "DT"), ("dog", "NN"), ("barked", "VBD")])];
        let mut templates = TemplateRegistry::new();
        templates
            .push(vec![Feature::new(Property::pos(), vec![-1]).unwrap()])
            .unwrap();
        let options = TrainerOptions {
            max_rules: 5,
            min_score: 1,
            deterministic: true,
            ..TrainerOptions::default()
        };

        let tagger = Trainer::new(initial(), &templates, options)
            .unwrap()
            .train(&gold)
            .unwrap();
        let printed: Vec<_> = tagger.rules().iter().map(|x| x.to_string()).collect();

        assert_eq!(
            printed,
            vec!["NN->DT if Pos:None@[-1]", "NN->VBD if Pos:NN@[-1]"]
        );

        let stats = tagger.train_stats().unwrap();
        assert_eq!(stats.initial_errors, 2);
        assert_eq!(stats.final_errors, 0);
        assert_eq!(stats.rule_scores, vec![1, 1]);
        assert_eq!(stats.template_count, Some(1));
    }

    #[test]
    fn respects_limits() {
        let gold = walk_corpus();
        let templates = presets::brill24().unwrap();
        let options = TrainerOptions {
            max_rules: 1,
            min_score: 1,
            deterministic: true,
            ..TrainerOptions::default()
        };

        let tagger = Trainer::new(initial(), &templates, options.clone())
            .unwrap()
            .train(&gold)
            .unwrap();
        assert_eq!(tagger.rules().len(), 1);

        let options = TrainerOptions {
            max_rules: 100,
            min_score: 100,
            ..options
        };
        let tagger = Trainer::new(initial(), &templates, options)
            .unwrap()
            .train(&gold)
            .unwrap();
        assert!(tagger.rules().is_empty());
        assert_eq!(
            tagger.train_stats().unwrap().final_errors,
            tagger.train_stats().unwrap().initial_errors
        );
    }

    #[test]
    fn min_acc_rejects_harmful_rules() {
        let gold = walk_corpus();
        let templates = presets::brill24().unwrap();
        let options = TrainerOptions {
            max_rules: 50,
            min_score: 1,
            min_acc: Some(1.0),
            deterministic: true,
            ..TrainerOptions::default()
        };

        let tagger = Trainer::new(initial(), &templates, options)
            .unwrap()
            .train(&gold)
            .unwrap();
        let (_, stats) = tagger.batch_tag_incremental(
            &gold.iter().map(|x| untag(x)).collect::<Vec<_>>(),
            &gold,
        );

        // a rule with perfect accuracy never breaks a tag on its training data
        assert_eq!(stats.rule_scores, tagger.train_stats().unwrap().rule_scores);
        assert!(stats.rule_scores.iter().all(|x| *x > 0));
    }

    #[test]
    fn cancelled_training_returns_partial_result() {
        let gold = walk_corpus();
        let templates = presets::brill24().unwrap();
        let token = CancellationToken::new();
        token.cancel();

        let tagger = Trainer::new(initial(), &templates, TrainerOptions::default())
            .unwrap()
            .train_with_cancellation(&gold, &token)
            .unwrap();

        assert!(tagger.rules().is_empty());
    }

    #[test]
    fn invalid_options_are_rejected() {
        let templates = TemplateRegistry::new();

        for options in vec![
            TrainerOptions {
                min_score: 0,
                ..TrainerOptions::default()
            },
            TrainerOptions {
                min_acc: Some(1.5),
                ..TrainerOptions::default()
            },
        ] {
            assert!(matches!(
                Trainer::new(initial(), &templates, options),
                Err(Error::InvalidOption { .. })
            ));
        }

        let options: TrainerOptions = serde_json::from_str(r#"{"max_rules": 10}"#).unwrap();
        assert_eq!(options.max_rules, 10);
        assert_eq!(options.min_score, 2);
    }

    #[derive(Clone)]
    struct Truncating;

    impl InitialTagger for Truncating {
        fn tag(&self, words: &[&str]) -> Vec<crate::types::Token> {
            DefaultTagger::new("NN").tag(&words[1..])
        }
    }

    #[test]
    fn initial_tagger_must_tag_every_word() {
        let templates = TemplateRegistry::new();
        let trainer = Trainer::new(Truncating, &templates, TrainerOptions::default()).unwrap();

        assert!(matches!(
            trainer.train(&walk_corpus()),
            Err(Error::LengthMismatch {
                expected: 4,
                found: 3
            })
        ));
    }
}
