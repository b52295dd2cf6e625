//! Pipeline configuration

use std::path::PathBuf;

use crate::packing::PackingParams;
use crate::srs::IGNITION_TRANSCRIPT_URL;

/// Reference string size fetched on first run, in G1 points
pub const DEFAULT_SRS_SIZE: usize = 174;

pub const DEFAULT_DATA_DIR: &str = "data";

/// Pipeline configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Directory holding the inner proof bundle and every artifact
    pub data_dir: PathBuf,
    pub packing: PackingParams,
    /// Minimum G1 points to request when provisioning the reference string
    pub srs_size: usize,
    /// Ceremony transcript to provision from
    pub srs_url: String,
}

impl PipelineConfig {
    /// Six 32-bit inner inputs per outer public input
    pub fn compressed() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            packing: PackingParams::COMPRESSED,
            srs_size: DEFAULT_SRS_SIZE,
            srs_url: IGNITION_TRANSCRIPT_URL.to_string(),
        }
    }

    /// One outer public input per inner public input
    pub fn uncompressed() -> Self {
        Self {
            packing: PackingParams::for_compression(false),
            ..Self::compressed()
        }
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::compressed()
    }
}
