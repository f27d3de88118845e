//! Brill's transformation-based tagger with a fast, incremental rule learner.
//! # Overview
//!
//! brill has the following core abstractions:
//! - A [Rule][rule::Rule] changing a token's tag from an *original tag* to a *replacement tag* if
//!   its conditions hold around the token.
//! - A [Template][rule::Template] proposing candidate rules which would correct a token's tag.
//!   Templates are owned by a [TemplateRegistry][rule::TemplateRegistry] assigning their ids.
//! - A [Trainer][trainer::Trainer] which learns an ordered list of rules from gold data,
//!   keeping a scored rule index up to date instead of rescanning the corpus for every rule.
//! - A [BrillTagger][tagger::BrillTagger] which runs an initial tagger and then applies the learned rules.
//!
//! # Examples
//!
//! Learn rules on a tiny corpus:
//!
//! ```
//! use brill::rule::{Feature, Property, TemplateRegistry};
//! use brill::tagger::DefaultTagger;
//! use brill::trainer::{Trainer, TrainerOptions};
//! use brill::types::sentence;
//!
//! let gold = vec![sentence(&[("the", "DT"), ("dog", "NN"), ("barked", "VBD")])];
//!
//! let mut templates = TemplateRegistry::new();
//! templates.push(vec![Feature::new(Property::pos(), vec![-1])?])?;
//!
//! let options = TrainerOptions {
//!     max_rules: 5,
//!     min_score: 1,
//!     ..TrainerOptions::default()
//! };
//! let trainer = Trainer::new(DefaultTagger::new("NN"), &templates, options)?;
//! let tagger = trainer.train(&gold)?;
//!
//! assert_eq!(tagger.train_stats().unwrap().final_errors, 0);
//! assert_eq!(tagger.tag(&["the", "dog", "barked"])[2].tag(), "VBD");
//! # Ok::<(), brill::Error>(())
//! ```
//!
//! Persist learned rules and read them back:
//!
//! ```
//! use brill::rule::{Feature, Property, Rule, TemplateId};
//! use brill::rule::record::{decode_rules, encode_rules};
//!
//! let rule = Rule::new(
//!     TemplateId::new(0),
//!     "NN",
//!     "VB",
//!     vec![(Feature::new(Property::pos(), vec![-1])?, Some("TO".into()))],
//! );
//! let json = encode_rules(&[rule.clone()])?;
//! assert_eq!(decode_rules(&json)?, vec![rule]);
//! # Ok::<(), brill::Error>(())
//! ```

use std::io;

use thiserror::Error;

pub mod persist;
pub mod rule;
pub mod tagger;
pub mod trainer;
pub mod types;

pub use persist::Persist;
pub use tagger::BrillTagger;
pub use trainer::Trainer;

#[derive(Error, Debug)]
#[allow(missing_docs)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),
    /// (De)serialization error. Can have occured during deserialization or during serialization.
    #[error(transparent)]
    Serialization(#[from] bincode::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("illegal interval specification: (start={start}, end={end})")]
    InvalidInterval { start: isize, end: isize },
    #[error("non-positive window length in {0:?}")]
    InvalidWindow(Vec<usize>),
    #[error("a feature must look at one or more positions")]
    EmptyFeature,
    #[error("a template must have one or more features")]
    EmptyTemplate,
    #[error("invalid option `{name}`: {reason}")]
    InvalidOption { name: &'static str, reason: String },
    #[error("unknown template id: {0}")]
    UnknownTemplate(String),
    #[error("unknown property: {0}")]
    UnknownProperty(String),
    #[error("unsupported rule record version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("initial tagger returned {found} tags for a sequence of {expected} words")]
    LengthMismatch { expected: usize, found: usize },
}
