use super::{
    index::EffectCounts, initial_stats, initial_tagging, log_finish, log_header, log_rule,
    log_start, CancellationToken, TrainerOptions,
};
use crate::{
    rule::{Rule, TemplateRegistry},
    tagger::{BrillTagger, InitialTagger},
    types::{Position, Sentence},
    Error,
};
use fnv::{FnvHashMap, FnvHashSet};
use log::{debug, warn};

struct Candidate {
    rule: Rule,
    score: i64,
    fixed: i64,
}

/// Learns rules by rescanning the whole corpus for every rule.
///
/// Takes the same options as [Trainer][super::Trainer]. With `deterministic` set,
/// both learn identical rules, this one just takes much longer.
pub struct ExhaustiveTrainer<'a, T> {
    initial_tagger: T,
    templates: &'a TemplateRegistry,
    options: TrainerOptions,
}

impl<'a, T: InitialTagger + Clone> ExhaustiveTrainer<'a, T> {
    pub fn new(
        initial_tagger: T,
        templates: &'a TemplateRegistry,
        options: TrainerOptions,
    ) -> Result<Self, Error> {
        options.validate()?;

        Ok(ExhaustiveTrainer {
            initial_tagger,
            templates,
            options,
        })
    }

    pub fn train(&self, gold: &[Sentence]) -> Result<BrillTagger<T>, Error> {
        self.train_with_cancellation(gold, &CancellationToken::new())
    }

    pub fn train_with_cancellation(
        &self,
        gold: &[Sentence],
        token: &CancellationToken,
    ) -> Result<BrillTagger<T>, Error> {
        let mut working = initial_tagging(&self.initial_tagger, gold)?;
        let mut stats = initial_stats(gold, &working, self.templates, &self.options);
        log_start("exhaustive", &stats);
        log_header();

        let mut rules = Vec::new();

        while rules.len() < self.options.max_rules {
            if token.is_cancelled() {
                warn!("training stopped manually -- {} rules found", rules.len());
                break;
            }

            let candidate = match self.best_rule(&working, gold) {
                Some(candidate) if candidate.score >= self.options.min_score => candidate,
                _ => {
                    debug!("no rule reaches the minimum score, stopping");
                    break;
                }
            };

            let changed: usize = working
                .iter_mut()
                .map(|sentence| candidate.rule.apply(sentence).len())
                .sum();
            let broken = candidate.fixed - candidate.score;
            log_rule(
                &candidate.rule,
                candidate.score,
                EffectCounts {
                    fixed: candidate.fixed as usize,
                    broken: broken as usize,
                    neutral: changed - (candidate.fixed + broken) as usize,
                },
                self.options.rule_format,
            );

            rules.push(candidate.rule);
            stats.rule_scores.push(candidate.score);
        }

        let fixed: i64 = stats.rule_scores.iter().sum();
        stats.final_errors = (stats.initial_errors as i64 - fixed) as usize;
        log_finish(&stats);

        Ok(BrillTagger::with_stats(
            self.initial_tagger.clone(),
            rules,
            stats,
        ))
    }

    /// Every rule fixing one or more errors, with the number of errors it fixes.
    /// Sorted by that number, highest first.
    fn find_rules(&self, working: &[Sentence], gold: &[Sentence]) -> Vec<(Rule, i64)> {
        let mut fix_scores: FnvHashMap<Rule, i64> = FnvHashMap::default();

        for (sentence, gold_sentence) in working.iter().zip(gold) {
            for (i, correct) in gold_sentence.iter().enumerate() {
                let rules: FnvHashSet<Rule> = self
                    .templates
                    .iter()
                    .flat_map(|template| template.applicable_rules(sentence, i, correct.tag()))
                    .collect();

                for rule in rules {
                    *fix_scores.entry(rule).or_default() += 1;
                }
            }
        }

        let mut rules: Vec<_> = fix_scores.into_iter().collect();
        if self.options.deterministic {
            rules.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        } else {
            rules.sort_by_key(|x| -x.1);
        }
        rules
    }

    fn best_rule(&self, working: &[Sentence], gold: &[Sentence]) -> Option<Candidate> {
        let mut correct_positions: FnvHashMap<&str, Vec<Position>> = FnvHashMap::default();
        for (s, (sentence, gold_sentence)) in working.iter().zip(gold).enumerate() {
            for (w, (token, correct)) in sentence.iter().zip(gold_sentence).enumerate() {
                if token.tag() == correct.tag() {
                    correct_positions.entry(token.tag()).or_default().push((s, w));
                }
            }
        }

        let deterministic = self.options.deterministic;
        let min_acc = self.options.min_acc;
        let mut best: Option<Candidate> = None;
        let mut best_score = 0;

        for (rule, fixed) in self.find_rules(working, gold) {
            // no rule further down can fix more errors than this one
            if best_score > fixed || (best_score == fixed && !deterministic) {
                break;
            }

            let accurate = |score: i64| {
                min_acc.map_or(true, |min_acc| {
                    fixed as f64 / (2 * fixed - score) as f64 >= min_acc
                })
            };

            let mut score = fixed;
            let positions = correct_positions
                .get(rule.original_tag())
                .map_or(&[][..], |x| x.as_slice());

            for &(s, w) in positions {
                if rule.applies(&working[s], w) {
                    score -= 1;

                    if !accurate(score)
                        || score < best_score
                        || (score == best_score && !deterministic)
                    {
                        break;
                    }
                }
            }

            let better = score > best_score
                || (score == best_score
                    && deterministic
                    && best.as_ref().map_or(true, |best| rule < best.rule));

            if accurate(score) && better {
                best_score = score;
                best = Some(Candidate { rule, score, fixed });
            }
        }

        best
    }
}
