//! JSON persistence shared by the fitted artifacts.

use crate::error::LearningError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Format version written into every artifact.
pub const FORMAT_VERSION: u32 = 1;

/// Artifacts that record the format version they were written with.
pub(crate) trait Versioned {
    fn format_version(&self) -> u32;
}

pub(crate) fn save_json<T: Serialize>(value: &T, path: &Path) -> Result<(), LearningError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    debug!("Artifact written: {}", path.display());
    Ok(())
}

pub(crate) fn load_json<T>(path: &Path) -> Result<T, LearningError>
where
    T: DeserializeOwned + Versioned,
{
    let reader = BufReader::new(File::open(path)?);
    let value: T = serde_json::from_reader(reader)?;
    if value.format_version() != FORMAT_VERSION {
        return Err(LearningError::ArtifactVersion {
            found: value.format_version(),
            expected: FORMAT_VERSION,
        });
    }
    debug!("Artifact loaded: {}", path.display());
    Ok(value)
}
