//! Properties of tokens and the relative positions at which templates and rules look at them.

use crate::{types::Token, Error};
use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Extracts one property of the token at `index`.
#[enum_dispatch]
pub trait Extract {
    fn extract<'t>(&self, tokens: &'t [Token], index: usize) -> &'t str;

    /// The name used when printing rules and templates.
    fn name(&self) -> &'static str;
}

/// The closed set of properties rules can be conditioned on.
/// Variants are ordered by name.
#[enum_dispatch(Extract)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Property {
    Pos(concrete::Pos),
    Word(concrete::Word),
}

impl Property {
    /// The current tag of a token.
    pub fn pos() -> Self {
        Property::Pos(concrete::Pos)
    }

    /// The text of a token.
    pub fn word() -> Self {
        Property::Word(concrete::Word)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Pos" => Some(Property::pos()),
            "Word" => Some(Property::word()),
            _ => None,
        }
    }
}

pub mod concrete {
    use super::Extract;
    use crate::types::Token;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    pub struct Pos;

    impl Extract for Pos {
        fn extract<'t>(&self, tokens: &'t [Token], index: usize) -> &'t str {
            tokens[index].tag()
        }

        fn name(&self) -> &'static str {
            "Pos"
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    pub struct Word;

    impl Extract for Word {
        fn extract<'t>(&self, tokens: &'t [Token], index: usize) -> &'t str {
            tokens[index].word()
        }

        fn name(&self) -> &'static str {
            "Word"
        }
    }
}

/// A property combined with the relative positions it is probed at.
/// Positions are sorted, deduplicated and never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Feature {
    property: Property,
    positions: Vec<isize>,
}

impl Feature {
    /// Creates a feature looking at `positions` relative to the current token.
    ///
    /// # Errors
    /// - If `positions` is empty.
    pub fn new(property: Property, mut positions: Vec<isize>) -> Result<Self, Error> {
        positions.sort_unstable();
        positions.dedup();

        if positions.is_empty() {
            return Err(Error::EmptyFeature);
        }

        Ok(Feature {
            property,
            positions,
        })
    }

    /// Creates a feature looking at the contiguous range `start..=end`.
    ///
    /// # Errors
    /// - If `start > end`.
    pub fn range(property: Property, start: isize, end: isize) -> Result<Self, Error> {
        if start > end {
            return Err(Error::InvalidInterval { start, end });
        }

        Feature::new(property, (start..=end).collect())
    }

    /// Creates one feature for every window of length `window_lengths[i]` over `starts`.
    /// If `exclude_zero` is set, features containing the position 0 are skipped.
    ///
    /// # Errors
    /// - If any window length is zero.
    pub fn expand(
        property: Property,
        starts: &[isize],
        window_lengths: &[usize],
        exclude_zero: bool,
    ) -> Result<Vec<Self>, Error> {
        if window_lengths.iter().any(|x| *x == 0) {
            return Err(Error::InvalidWindow(window_lengths.to_vec()));
        }

        let mut features = Vec::new();
        for &length in window_lengths {
            if length > starts.len() {
                continue;
            }

            for window in starts.windows(length) {
                if exclude_zero && window.contains(&0) {
                    continue;
                }
                features.push(Feature::new(property, window.to_vec())?);
            }
        }

        Ok(features)
    }

    pub fn property(&self) -> Property {
        self.property
    }

    pub fn positions(&self) -> &[isize] {
        &self.positions
    }

    pub fn min_position(&self) -> isize {
        self.positions[0]
    }

    pub fn max_position(&self) -> isize {
        self.positions[self.positions.len() - 1]
    }

    /// Whether this feature looks at the same property and at least at every position `other` looks at.
    pub fn is_superset(&self, other: &Feature) -> bool {
        self.property == other.property
            && other
                .positions
                .iter()
                .all(|x| self.positions.binary_search(x).is_ok())
    }

    /// Whether this feature looks at the same property and shares a position with `other`.
    pub fn intersects(&self, other: &Feature) -> bool {
        self.property == other.property
            && other
                .positions
                .iter()
                .any(|x| self.positions.binary_search(x).is_ok())
    }

    /// The values observed at each position relative to `index`.
    /// Positions outside of the sequence are observed as `None`.
    pub fn observe<'a, 't: 'a>(
        &'a self,
        tokens: &'t [Token],
        index: usize,
    ) -> impl Iterator<Item = Option<&'t str>> + 'a {
        let property = self.property;

        self.positions.iter().map(move |offset| {
            let i = index as isize + offset;

            if i >= 0 && (i as usize) < tokens.len() {
                Some(property.extract(tokens, i as usize))
            } else {
                None
            }
        })
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}([{}])",
            self.property.name(),
            self.positions
                .iter()
                .map(|x| x.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::sentence;

    #[test]
    fn positions_are_normalized() {
        let feature = Feature::new(Property::word(), vec![1, -2, 1, -1]).unwrap();

        assert_eq!(feature.positions(), &[-2, -1, 1]);
        assert_eq!(feature.to_string(), "Word([-2, -1, 1])");
    }

    #[test]
    fn malformed_features_are_rejected() {
        assert!(matches!(
            Feature::range(Property::pos(), 2, 1),
            Err(Error::InvalidInterval { start: 2, end: 1 })
        ));
        assert!(matches!(
            Feature::new(Property::pos(), vec![]),
            Err(Error::EmptyFeature)
        ));
        assert_eq!(
            Feature::range(Property::pos(), -3, -1).unwrap().positions(),
            &[-3, -2, -1]
        );
    }

    #[test]
    fn expand_builds_windows() {
        let features = Feature::expand(Property::word(), &[-3, -2, -1], &[1, 2], false).unwrap();
        let printed: Vec<_> = features.iter().map(|x| x.to_string()).collect();

        assert_eq!(
            printed,
            vec![
                "Word([-3])",
                "Word([-2])",
                "Word([-1])",
                "Word([-3, -2])",
                "Word([-2, -1])"
            ]
        );

        let features = Feature::expand(Property::word(), &[-2, -1, 0], &[1, 2], true).unwrap();
        assert_eq!(features.len(), 3);

        assert!(matches!(
            Feature::expand(Property::word(), &[-2, -1], &[0], false),
            Err(Error::InvalidWindow(_))
        ));
    }

    #[test]
    fn superset_and_intersection() {
        let wide = Feature::new(Property::word(), vec![-3, -2, -1]).unwrap();
        let narrow = Feature::new(Property::word(), vec![-3, -2]).unwrap();
        let other = Feature::new(Property::word(), vec![-3, -2, 0]).unwrap();
        let pos = Feature::new(Property::pos(), vec![-3, -2]).unwrap();

        assert!(wide.is_superset(&narrow));
        assert!(!wide.is_superset(&other));
        assert!(!wide.is_superset(&pos));
        assert!(wide.intersects(&other));
        assert!(!wide.intersects(&Feature::new(Property::word(), vec![0]).unwrap()));
        assert!(!wide.intersects(&pos));
    }

    #[test]
    fn observe_marks_the_boundary() {
        let tokens = sentence(&[("the", "DT"), ("dog", "NN")]);
        let feature = Feature::new(Property::pos(), vec![-1, 1]).unwrap();

        assert_eq!(
            feature.observe(&tokens, 0).collect::<Vec<_>>(),
            vec![None, Some("NN")]
        );
        assert_eq!(
            feature.observe(&tokens, 1).collect::<Vec<_>>(),
            vec![Some("DT"), None]
        );
    }
}
