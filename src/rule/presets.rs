//! Commonly used template sets.
//!
//! Each preset returns a fresh [TemplateRegistry] with ids assigned in the order listed.

use super::{Feature, Property, TemplateRegistry};
use crate::Error;

fn pos(positions: &[isize]) -> Result<Feature, Error> {
    Feature::new(Property::pos(), positions.to_vec())
}

fn word(positions: &[isize]) -> Result<Feature, Error> {
    Feature::new(Property::word(), positions.to_vec())
}

fn build(templates: Vec<Vec<Result<Feature, Error>>>) -> Result<TemplateRegistry, Error> {
    let mut registry = TemplateRegistry::new();

    for features in templates {
        registry.push(features.into_iter().collect::<Result<Vec<_>, _>>()?)?;
    }

    Ok(registry)
}

/// The 18 templates of the classic demo: tags and words in symmetric windows around the token.
pub fn nltkdemo18() -> Result<TemplateRegistry, Error> {
    build(vec![
        vec![pos(&[-1])],
        vec![pos(&[1])],
        vec![pos(&[-2])],
        vec![pos(&[2])],
        vec![pos(&[-2, -1])],
        vec![pos(&[1, 2])],
        vec![pos(&[-3, -2, -1])],
        vec![pos(&[1, 2, 3])],
        vec![pos(&[-1]), pos(&[1])],
        vec![word(&[-1])],
        vec![word(&[1])],
        vec![word(&[-2])],
        vec![word(&[2])],
        vec![word(&[-2, -1])],
        vec![word(&[1, 2])],
        vec![word(&[-3, -2, -1])],
        vec![word(&[1, 2, 3])],
        vec![word(&[-1]), word(&[1])],
    ])
}

/// The 24 templates of Brill (1995).
pub fn brill24() -> Result<TemplateRegistry, Error> {
    build(vec![
        vec![pos(&[-1])],
        vec![pos(&[1])],
        vec![pos(&[-2])],
        vec![pos(&[2])],
        vec![pos(&[-2, -1])],
        vec![pos(&[1, 2])],
        vec![pos(&[-3, -2, -1])],
        vec![pos(&[1, 2, 3])],
        vec![pos(&[-1]), pos(&[1])],
        vec![pos(&[-2]), pos(&[-1])],
        vec![pos(&[1]), pos(&[2])],
        vec![word(&[-1])],
        vec![word(&[1])],
        vec![word(&[-2])],
        vec![word(&[2])],
        vec![word(&[-2, -1])],
        vec![word(&[1, 2])],
        vec![word(&[-1, 0])],
        vec![word(&[0, 1])],
        vec![word(&[0])],
        vec![word(&[-1]), pos(&[-1])],
        vec![word(&[1]), pos(&[1])],
        vec![word(&[0]), word(&[-1]), pos(&[-1])],
        vec![word(&[0]), word(&[1]), pos(&[1])],
    ])
}

/// The 37 templates used by the fnTBL toolkit.
pub fn fntbl37() -> Result<TemplateRegistry, Error> {
    build(vec![
        vec![word(&[0]), word(&[1]), word(&[2])],
        vec![word(&[-1]), word(&[0]), word(&[1])],
        vec![word(&[0]), word(&[-1])],
        vec![word(&[0]), word(&[1])],
        vec![word(&[0]), word(&[2])],
        vec![word(&[0]), word(&[-2])],
        vec![word(&[1, 2])],
        vec![word(&[-2, -1])],
        vec![word(&[1, 2, 3])],
        vec![word(&[-3, -2, -1])],
        vec![word(&[0]), pos(&[2])],
        vec![word(&[0]), pos(&[-2])],
        vec![word(&[0]), pos(&[1])],
        vec![word(&[0]), pos(&[-1])],
        vec![word(&[0])],
        vec![word(&[-2])],
        vec![word(&[2])],
        vec![word(&[1])],
        vec![word(&[-1])],
        vec![pos(&[-1]), pos(&[1])],
        vec![pos(&[1]), pos(&[2])],
        vec![pos(&[-1]), pos(&[-2])],
        vec![pos(&[1])],
        vec![pos(&[-1])],
        vec![pos(&[-2])],
        vec![pos(&[2])],
        vec![pos(&[1, 2, 3])],
        vec![pos(&[1, 2])],
        vec![pos(&[-3, -2, -1])],
        vec![pos(&[-2, -1])],
        vec![pos(&[1]), word(&[0]), word(&[1])],
        vec![pos(&[1]), word(&[0]), word(&[-1])],
        vec![pos(&[-1]), word(&[-1]), word(&[0])],
        vec![pos(&[-1]), word(&[0]), word(&[1])],
        vec![pos(&[-2]), pos(&[-1])],
        vec![pos(&[1]), pos(&[2])],
        vec![pos(&[1]), pos(&[2]), word(&[1])],
    ])
}

/// Looks up a preset by name.
pub fn by_name(name: &str) -> Result<TemplateRegistry, Error> {
    match name {
        "nltkdemo18" => nltkdemo18(),
        "brill24" => brill24(),
        "fntbl37" => fntbl37(),
        _ => Err(Error::InvalidOption {
            name: "templates",
            reason: format!(
                "unknown preset `{}`, expected one of `nltkdemo18`, `brill24` or `fntbl37`",
                name
            ),
        }),
    }
}
