//! A versioned, human-readable representation of learned rules.

use super::{Extract, Feature, Property, Rule};
use crate::Error;
use serde::{Deserialize, Serialize};
use std::{
    convert::TryFrom,
    io::{Read, Write},
};

/// The version written by this crate.
pub const RECORD_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub property: String,
    pub positions: Vec<isize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleRecord {
    pub version: u32,
    pub template_id: String,
    pub original_tag: String,
    pub replacement_tag: String,
    pub conditions: Vec<(FeatureRecord, Option<String>)>,
}

impl From<&Feature> for FeatureRecord {
    fn from(feature: &Feature) -> Self {
        FeatureRecord {
            property: feature.property().name().to_string(),
            positions: feature.positions().to_vec(),
        }
    }
}

impl TryFrom<FeatureRecord> for Feature {
    type Error = Error;

    fn try_from(record: FeatureRecord) -> Result<Self, Self::Error> {
        let property = Property::from_name(&record.property)
            .ok_or_else(|| Error::UnknownProperty(record.property.clone()))?;

        Feature::new(property, record.positions)
    }
}

impl From<&Rule> for RuleRecord {
    fn from(rule: &Rule) -> Self {
        RuleRecord {
            version: RECORD_VERSION,
            template_id: rule.template_id().to_string(),
            original_tag: rule.original_tag().to_string(),
            replacement_tag: rule.replacement_tag().to_string(),
            conditions: rule
                .conditions()
                .iter()
                .map(|(feature, value)| (feature.into(), value.clone()))
                .collect(),
        }
    }
}

impl TryFrom<RuleRecord> for Rule {
    type Error = Error;

    fn try_from(record: RuleRecord) -> Result<Self, Self::Error> {
        if record.version != RECORD_VERSION {
            return Err(Error::UnsupportedVersion {
                found: record.version,
                expected: RECORD_VERSION,
            });
        }

        let conditions = record
            .conditions
            .into_iter()
            .map(|(feature, value)| Ok((Feature::try_from(feature)?, value)))
            .collect::<Result<Vec<_>, Error>>()?;

        Ok(Rule::new(
            record.template_id.parse()?,
            record.original_tag,
            record.replacement_tag,
            conditions,
        ))
    }
}

/// Encodes rules as a JSON array of [RuleRecord]s.
pub fn encode_rules(rules: &[Rule]) -> Result<String, Error> {
    let records: Vec<RuleRecord> = rules.iter().map(RuleRecord::from).collect();
    Ok(serde_json::to_string_pretty(&records)?)
}

/// Decodes rules written by [encode_rules].
///
/// # Errors
/// - If the JSON is malformed.
/// - If a record has an unsupported version, an unknown property or invalid positions.
pub fn decode_rules(json: &str) -> Result<Vec<Rule>, Error> {
    let records: Vec<RuleRecord> = serde_json::from_str(json)?;
    records.into_iter().map(Rule::try_from).collect()
}

pub fn write_rules<W: Write>(writer: W, rules: &[Rule]) -> Result<(), Error> {
    let records: Vec<RuleRecord> = rules.iter().map(RuleRecord::from).collect();
    serde_json::to_writer_pretty(writer, &records)?;
    Ok(())
}

pub fn read_rules<R: Read>(reader: R) -> Result<Vec<Rule>, Error> {
    let records: Vec<RuleRecord> = serde_json::from_reader(reader)?;
    records.into_iter().map(Rule::try_from).collect()
}
