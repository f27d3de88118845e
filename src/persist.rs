//! Binary persistence of trained taggers.

use fs_err::File;
use serde::{de::DeserializeOwned, Serialize};
use std::{
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use crate::{tagger::InitialTagger, BrillTagger, Error};

/// Something which can be stored in the binary format of this crate.
pub trait Persist: Serialize + DeserializeOwned {
    fn name() -> &'static str;

    fn load<P: AsRef<Path>>(p: P) -> Result<Self, Error> {
        let reader = BufReader::new(File::open(p.as_ref())?);
        let value = Self::from_reader(reader)?;

        log::info!("loaded {} from {}", Self::name(), p.as_ref().display());
        Ok(value)
    }

    fn save<P: AsRef<Path>>(&self, p: P) -> Result<(), Error> {
        let mut writer = BufWriter::new(File::create(p.as_ref())?);
        self.to_writer(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    fn from_reader<R: Read>(reader: R) -> Result<Self, Error> {
        Ok(bincode::deserialize_from(reader)?)
    }

    fn to_writer<W: Write>(&self, writer: W) -> Result<(), Error> {
        Ok(bincode::serialize_into(writer, self)?)
    }
}

impl<T: InitialTagger + Serialize + DeserializeOwned> Persist for BrillTagger<T> {
    fn name() -> &'static str {
        "tagger"
    }
}
