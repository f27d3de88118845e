//! The incremental bookkeeping of the fast trainer.
//!
//! Rules are interned into dense [RuleId]s. For every rule the index knows the positions
//! it has been verified to apply at (together with the effect on the error count there),
//! the resulting score and how far the corpus has been scanned for it.

use crate::{
    rule::Rule,
    types::{Position, Sentence},
};
use fnv::{FnvHashMap, FnvHashSet};
use indexmap::IndexSet;
use std::collections::{BTreeMap, BTreeSet};

pub(crate) type RuleId = usize;

/// What applying a rule at a position does to the error count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Effect {
    /// The position was correct and becomes wrong.
    Breaks,
    /// The position is wrong before and after.
    Neutral,
    /// The position was wrong and becomes correct.
    Fixes,
}

impl Effect {
    pub fn of(rule: &Rule, correct_tag: &str) -> Self {
        if rule.replacement_tag() == correct_tag {
            Effect::Fixes
        } else if rule.original_tag() == correct_tag {
            Effect::Breaks
        } else {
            Effect::Neutral
        }
    }

    pub fn score(self) -> i64 {
        match self {
            Effect::Breaks => -1,
            Effect::Neutral => 0,
            Effect::Fixes => 1,
        }
    }
}

/// Fixed, broken and unchanged error counts of a rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct EffectCounts {
    pub fixed: usize,
    pub broken: usize,
    pub neutral: usize,
}

impl EffectCounts {
    pub fn accuracy(&self) -> f64 {
        if self.fixed + self.broken == 0 {
            return 0.0;
        }

        self.fixed as f64 / (self.fixed + self.broken) as f64
    }
}

#[derive(Debug, Default)]
struct Interner {
    rules: Vec<Rule>,
    ids: FnvHashMap<Rule, RuleId>,
}

/// Rule scores and the positions they are derived from.
#[derive(Debug, Default)]
struct ScoreTable {
    rules_by_position: FnvHashMap<Position, BTreeSet<RuleId>>,
    positions_by_rule: Vec<BTreeMap<Position, Effect>>,
    rules_by_score: BTreeMap<i64, IndexSet<RuleId>>,
    rule_scores: Vec<i64>,
}

impl ScoreTable {
    fn grow(&mut self) {
        self.positions_by_rule.push(BTreeMap::new());
        self.rule_scores.push(0);
    }

    fn record(&mut self, id: RuleId, position: Position, effect: Effect) {
        if self.positions_by_rule[id].contains_key(&position) {
            return;
        }

        self.positions_by_rule[id].insert(position, effect);
        self.rules_by_position
            .entry(position)
            .or_default()
            .insert(id);

        let old_score = self.rule_scores[id];
        self.rule_scores[id] += effect.score();
        self.refile(id, old_score);
    }

    fn forget(&mut self, id: RuleId, position: Position) {
        let effect = match self.positions_by_rule[id].remove(&position) {
            Some(effect) => effect,
            None => return,
        };

        if let Some(rules) = self.rules_by_position.get_mut(&position) {
            rules.remove(&id);
            if rules.is_empty() {
                self.rules_by_position.remove(&position);
            }
        }

        let old_score = self.rule_scores[id];
        self.rule_scores[id] -= effect.score();
        self.refile(id, old_score);
    }

    /// Moves a rule to the bucket of its current score.
    fn refile(&mut self, id: RuleId, old_score: i64) {
        let score = self.rule_scores[id];

        if old_score != score {
            if let Some(bucket) = self.rules_by_score.get_mut(&old_score) {
                bucket.shift_remove(&id);
                if bucket.is_empty() {
                    self.rules_by_score.remove(&old_score);
                }
            }
        }
        self.rules_by_score.entry(score).or_default().insert(id);

        debug_assert_eq!(
            score,
            self.positions_by_rule[id]
                .values()
                .map(|x| x.score())
                .sum::<i64>(),
            "score of rule {} diverged from its recorded positions",
            id
        );
    }
}

/// Selection criteria of [ScoredRuleIndex::best_rule].
#[derive(Debug, Clone, Copy)]
pub(crate) struct Criteria {
    pub min_score: i64,
    pub min_acc: Option<f64>,
    pub deterministic: bool,
}

#[derive(Debug, Default)]
pub(crate) struct ScoredRuleIndex {
    rules: Interner,
    tag_positions: FnvHashMap<String, Vec<Position>>,
    scores: ScoreTable,
    first_unknown_position: BTreeMap<RuleId, Position>,
}

impl ScoredRuleIndex {
    pub fn new() -> Self {
        ScoredRuleIndex::default()
    }

    /// Returns the id of `rule` and whether the rule was seen for the first time.
    pub fn intern(&mut self, rule: Rule) -> (RuleId, bool) {
        if let Some(id) = self.rules.ids.get(&rule) {
            return (*id, false);
        }

        let id = self.rules.rules.len();
        self.rules.ids.insert(rule.clone(), id);
        self.rules.rules.push(rule);
        self.scores.grow();
        (id, true)
    }

    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules.rules[id]
    }

    pub fn score(&self, id: RuleId) -> i64 {
        self.scores.rule_scores[id]
    }

    pub fn rule_count(&self) -> usize {
        self.rules.rules.len()
    }

    /// The positions `id` is known to apply at, in order.
    pub fn positions(&self, id: RuleId) -> impl Iterator<Item = Position> + '_ {
        self.scores.positions_by_rule[id].keys().copied()
    }

    pub fn effect_counts(&self, id: RuleId) -> EffectCounts {
        let mut counts = EffectCounts::default();

        for effect in self.scores.positions_by_rule[id].values() {
            match effect {
                Effect::Fixes => counts.fixed += 1,
                Effect::Breaks => counts.broken += 1,
                Effect::Neutral => counts.neutral += 1,
            }
        }

        counts
    }

    /// The rules known to apply at `position`.
    pub fn rules_at(&self, position: Position) -> FnvHashSet<RuleId> {
        self.scores
            .rules_by_position
            .get(&position)
            .map(|x| x.iter().copied().collect())
            .unwrap_or_default()
    }

    /// The rules which have not been scanned up to `position` yet.
    pub fn rules_unknown_at(&self, position: Position) -> Vec<RuleId> {
        self.first_unknown_position
            .iter()
            .filter(|(_, unknown)| **unknown > position)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn tag_positions(&self, tag: &str) -> &[Position] {
        self.tag_positions
            .get(tag)
            .map(|x| x.as_slice())
            .unwrap_or(&[])
    }

    /// Appends a position to the list of `tag`. Positions must be pushed in order.
    pub fn push_tag_position(&mut self, tag: &str, position: Position) {
        let positions = self.tag_positions.entry(tag.to_string()).or_default();

        debug_assert!(positions.last().map_or(true, |x| *x < position));
        positions.push(position);
    }

    /// Moves `position` from the list of `from` to the list of `to`, keeping both sorted.
    pub fn move_tag_position(&mut self, position: Position, from: &str, to: &str) {
        if let Some(positions) = self.tag_positions.get_mut(from) {
            if let Ok(i) = positions.binary_search(&position) {
                positions.remove(i);
            }
        }

        let positions = self.tag_positions.entry(to.to_string()).or_default();
        if let Err(i) = positions.binary_search(&position) {
            positions.insert(i, position);
        }
    }

    /// Records that the rule `id` applies at `position`, where the gold tag is `correct_tag`.
    /// Does nothing if this is already known.
    pub fn update_rule_applies(&mut self, id: RuleId, position: Position, correct_tag: &str) {
        let effect = Effect::of(self.rule(id), correct_tag);
        self.scores.record(id, position, effect);
    }

    /// Records that the rule `id` no longer applies at `position`.
    pub fn update_rule_not_applies(&mut self, id: RuleId, position: Position) {
        self.scores.forget(id, position);
    }

    /// Finds the rule with the highest score satisfying `criteria`.
    ///
    /// Scores in the index are upper bounds: a rule may apply at positions which were never
    /// checked for it. Candidates are therefore scanned lazily from their first unknown position,
    /// and moved to a lower bucket as soon as a breaking position makes them fall behind.
    pub fn best_rule(
        &mut self,
        working: &[Sentence],
        gold: &[Sentence],
        criteria: Criteria,
    ) -> Option<RuleId> {
        let mut rejected = FnvHashSet::default();
        let mut max_score = *self.scores.rules_by_score.keys().next_back()?;

        while max_score >= criteria.min_score {
            let mut candidates: Vec<RuleId> = self
                .scores
                .rules_by_score
                .get(&max_score)
                .map(|bucket| {
                    bucket
                        .iter()
                        .copied()
                        .filter(|id| !rejected.contains(id))
                        .collect()
                })
                .unwrap_or_default();

            if criteria.deterministic {
                let rules = &self.rules.rules;
                candidates.sort_by(|a, b| rules[*a].cmp(&rules[*b]));
            }

            for id in candidates {
                self.scan(id, max_score, working, gold);

                if self.score(id) >= max_score {
                    let accurate = criteria
                        .min_acc
                        .map_or(true, |min_acc| self.effect_counts(id).accuracy() >= min_acc);

                    if accurate {
                        return Some(id);
                    }
                    rejected.insert(id);
                }
            }

            max_score = match self.scores.rules_by_score.range(..max_score).next_back() {
                Some((score, _)) => *score,
                None => return None,
            };
        }

        None
    }

    /// Verifies `id` at all positions from its first unknown position on,
    /// stopping early once its score drops below `max_score`.
    fn scan(&mut self, id: RuleId, max_score: i64, working: &[Sentence], gold: &[Sentence]) {
        let rule = &self.rules.rules[id];
        let unknown = self
            .first_unknown_position
            .get(&id)
            .copied()
            .unwrap_or((0, 0));
        let positions = self
            .tag_positions
            .get(rule.original_tag())
            .map(|x| x.as_slice())
            .unwrap_or(&[]);
        let start = positions.partition_point(|x| *x < unknown);

        for &(sentence, index) in &positions[start..] {
            if !rule.applies(&working[sentence], index) {
                continue;
            }

            let effect = Effect::of(rule, gold[sentence][index].tag());
            self.scores.record(id, (sentence, index), effect);

            if self.scores.rule_scores[id] < max_score {
                self.first_unknown_position
                    .insert(id, (sentence, index + 1));
                return;
            }
        }

        self.first_unknown_position
            .insert(id, (working.len() + 1, 0));
    }

    /// Checks the index against a full rescan of the corpus. Only rules with a recorded
    /// position are checked, rules which were never proposed are not required to be known.
    #[cfg(test)]
    pub fn check(&self, working: &[Sentence], gold: &[Sentence]) -> Result<(), String> {
        for (tag, positions) in &self.tag_positions {
            for &(s, w) in positions {
                if working[s][w].tag() != tag {
                    return Err(format!("{:?} is not tagged {}", (s, w), tag));
                }
            }
            if positions.windows(2).any(|x| x[0] >= x[1]) {
                return Err(format!("positions of {} are not sorted", tag));
            }
        }

        for (id, positions) in self.scores.positions_by_rule.iter().enumerate() {
            let rule = self.rule(id);

            for (&(s, w), effect) in positions {
                if !rule.applies(&working[s], w) {
                    return Err(format!("{} recorded at {:?} but does not apply", rule, (s, w)));
                }
                if *effect != Effect::of(rule, gold[s][w].tag()) {
                    return Err(format!("{} has a stale effect at {:?}", rule, (s, w)));
                }
                if !self.scores.rules_by_position[&(s, w)].contains(&id) {
                    return Err(format!("{} is missing from position {:?}", rule, (s, w)));
                }
            }

            let score: i64 = positions.values().map(|x| x.score()).sum();
            if score != self.score(id) || !self.scores.rules_by_score[&score].contains(&id) {
                return Err(format!("{} is filed with a wrong score", rule));
            }

            // below the first unknown position, every application must be recorded
            let unknown = self
                .first_unknown_position
                .get(&id)
                .copied()
                .unwrap_or((0, 0));
            for (s, sentence) in working.iter().enumerate() {
                for w in 0..sentence.len() {
                    if (s, w) < unknown && rule.applies(sentence, w) && !positions.contains_key(&(s, w)) {
                        return Err(format!("{} misses position {:?}", rule, (s, w)));
                    }
                }
            }
        }

        Ok(())
    }
}
