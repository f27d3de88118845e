//! Templates generate candidate rules from the context of a mistagged token.

use super::{Condition, Feature, Rule};
use crate::{types::Token, Error};
use fnv::FnvHashSet;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, convert::TryFrom, fmt, str::FromStr};

/// Identifies a template within its [TemplateRegistry].
/// Printed zero-padded to three digits, e.g. `007`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TemplateId(u16);

impl TemplateId {
    pub fn new(id: u16) -> Self {
        TemplateId(id)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.0)
    }
}

impl FromStr for TemplateId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u16>()
            .map(TemplateId)
            .map_err(|_| Error::UnknownTemplate(s.to_string()))
    }
}

/// A rule generator: an ordered list of features.
/// Every rule generated by a template has one condition per feature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Template {
    id: TemplateId,
    features: Vec<Feature>,
    min_position: isize,
    max_position: isize,
}

impl Template {
    pub fn id(&self) -> TemplateId {
        self.id
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// All rules generated by this template which would change the tag at `index` to `correct_tag`.
    /// Empty if the token is already tagged correctly.
    pub fn applicable_rules(&self, tokens: &[Token], index: usize, correct_tag: &str) -> Vec<Rule> {
        let original_tag = tokens[index].tag();

        if original_tag == correct_tag {
            return Vec::new();
        }

        self.features
            .iter()
            .map(|feature| {
                feature
                    .observe(tokens, index)
                    .unique()
                    .map(|value| (feature.clone(), value.map(|x| x.to_string())))
                    .collect::<Vec<Condition>>()
            })
            .multi_cartesian_product()
            .map(|conditions| Rule::new(self.id, original_tag, correct_tag, conditions))
            .collect()
    }

    /// The indices whose applicable rules may change when the tag at `index` changes.
    /// These are all tokens which observe `index` through one of the features, and `index` itself.
    pub fn get_neighborhood(&self, tokens: &[Token], index: usize) -> BTreeSet<usize> {
        let mut neighborhood = BTreeSet::new();
        neighborhood.insert(index);

        let start = (index as isize - self.max_position).max(0) as usize;
        let end = ((index as isize - self.min_position + 1).max(0) as usize).min(tokens.len());

        neighborhood.extend(start..end);
        neighborhood
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Template({})", self.features.iter().join(","))
    }
}

/// Owns a set of templates and assigns their ids in registration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateRegistry {
    templates: Vec<Template>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        TemplateRegistry::default()
    }

    /// Registers a template built from `features` and returns its id.
    ///
    /// # Errors
    /// - If `features` is empty.
    /// - If the registry is full.
    pub fn push(&mut self, features: Vec<Feature>) -> Result<TemplateId, Error> {
        if features.is_empty() {
            return Err(Error::EmptyTemplate);
        }

        let id = u16::try_from(self.templates.len())
            .map(TemplateId)
            .map_err(|_| Error::InvalidOption {
                name: "templates",
                reason: format!("at most {} templates can be registered", u16::MAX),
            })?;

        let (min_position, max_position) = features
            .iter()
            .flat_map(|x| x.positions().iter().copied())
            .chain(std::iter::once(0))
            .minmax()
            .into_option()
            .unwrap_or((0, 0));

        self.templates.push(Template {
            id,
            features,
            min_position,
            max_position,
        });
        Ok(id)
    }

    /// Registers every non-redundant template from the Cartesian product of
    /// `combinations` (inclusive bounds, default: 1 to all) of the given feature lists.
    /// A template is redundant if one of its features is a superset of another one,
    /// or if `skip_intersecting` is set and two of its features share a position.
    /// Templates with the same features as an already registered one are skipped.
    ///
    /// Returns the ids of the newly registered templates.
    pub fn expand(
        &mut self,
        feature_lists: &[Vec<Feature>],
        combinations: Option<(usize, usize)>,
        skip_intersecting: bool,
    ) -> Result<Vec<TemplateId>, Error> {
        let (min_count, max_count) = combinations.unwrap_or((1, feature_lists.len()));

        if min_count == 0 || min_count > max_count {
            return Err(Error::InvalidOption {
                name: "combinations",
                reason: format!("invalid range ({}, {})", min_count, max_count),
            });
        }

        let mut seen: FnvHashSet<Vec<Feature>> = self
            .templates
            .iter()
            .map(|x| x.features.clone())
            .collect();
        let mut ids = Vec::new();

        for count in min_count..=max_count.min(feature_lists.len()) {
            for lists in feature_lists.iter().combinations(count) {
                for pick in lists.into_iter().map(|x| x.iter()).multi_cartesian_product() {
                    let redundant = pick.iter().enumerate().any(|(i, a)| {
                        pick.iter().enumerate().any(|(j, b)| {
                            i != j && (a.is_superset(b) || (skip_intersecting && a.intersects(b)))
                        })
                    });
                    if redundant {
                        continue;
                    }

                    let mut features: Vec<Feature> = pick.into_iter().cloned().collect();
                    features.sort();

                    if seen.insert(features.clone()) {
                        ids.push(self.push(features)?);
                    }
                }
            }
        }

        Ok(ids)
    }

    pub fn get(&self, id: TemplateId) -> Option<&Template> {
        self.templates.get(id.index())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Template> {
        self.templates.iter()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
