//! Structured reference string provisioning
//!
//! The reference string is fetched once from the Aztec Ignition ceremony and
//! cached in the artifact store. A cached copy is trusted as-is: its size is
//! not re-checked here, an undersized string makes backend setup fail.

use std::fs::File;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::PathBuf;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use reqwest::blocking::Client;
use reqwest::header::RANGE;
use thiserror::Error;
use tracing::info;

use crate::store::{ArtifactKind, ArtifactStore, StoreError};

/// Size of an uncompressed BN254 G1 point in the transcript
pub const G1_POINT_SIZE: usize = 64;
/// Size of an uncompressed BN254 G2 point in the transcript
pub const G2_POINT_SIZE: usize = 128;

/// First transcript of the Aztec Ignition ceremony
pub const IGNITION_TRANSCRIPT_URL: &str =
    "https://aztec-ignition.s3.amazonaws.com/MAIN%20IGNITION/monomial/transcript00.dat";

/// Ignition transcript header: seven big-endian u32 fields
const TRANSCRIPT_HEADER_SIZE: u64 = 28;

/// Container header: G1 count and G2 count as big-endian u32
const CONTAINER_HEADER_SIZE: usize = 8;

/// Reference string errors
#[derive(Debug, Error)]
pub enum SrsError {
    #[error("download failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("cannot read transcript: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid transcript: {0}")]
    Transcript(String),

    #[error("transcript has {available} G1 points, {requested} requested")]
    TooSmall { available: usize, requested: usize },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Powers of tau in G1 followed by the G2 points, as raw curve encodings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferenceString {
    bytes: Vec<u8>,
    num_g1: usize,
}

impl ReferenceString {
    /// Assemble a reference string from raw point encodings
    pub fn from_points(g1: &[u8], g2: &[u8]) -> Result<Self, SrsError> {
        if g1.len() % G1_POINT_SIZE != 0 || g2.len() % G2_POINT_SIZE != 0 {
            return Err(SrsError::Transcript(
                "point data is not a whole number of points".to_string(),
            ));
        }
        let num_g1 = g1.len() / G1_POINT_SIZE;
        let num_g2 = g2.len() / G2_POINT_SIZE;

        let mut bytes = Vec::with_capacity(CONTAINER_HEADER_SIZE + g1.len() + g2.len());
        bytes.write_u32::<BigEndian>(to_u32(num_g1)?)?;
        bytes.write_u32::<BigEndian>(to_u32(num_g2)?)?;
        bytes.extend_from_slice(g1);
        bytes.extend_from_slice(g2);

        Ok(Self { bytes, num_g1 })
    }

    /// Parse the stored container format
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, SrsError> {
        let mut cursor = Cursor::new(&bytes);
        let num_g1 = cursor.read_u32::<BigEndian>()? as usize;
        let num_g2 = cursor.read_u32::<BigEndian>()? as usize;
        let expected = CONTAINER_HEADER_SIZE + num_g1 * G1_POINT_SIZE + num_g2 * G2_POINT_SIZE;
        if bytes.len() != expected {
            return Err(SrsError::Transcript(format!(
                "expected {} bytes for {} G1 and {} G2 points, got {}",
                expected,
                num_g1,
                num_g2,
                bytes.len()
            )));
        }
        Ok(Self { bytes, num_g1 })
    }

    pub fn num_g1_points(&self) -> usize {
        self.num_g1
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

fn to_u32(n: usize) -> Result<u32, SrsError> {
    u32::try_from(n).map_err(|_| SrsError::Transcript(format!("{} points overflow the header", n)))
}

/// Point counts from an Ignition transcript header
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TranscriptManifest {
    pub transcript_number: u32,
    pub total_transcripts: u32,
    pub total_g1_points: u32,
    pub total_g2_points: u32,
    pub num_g1_points: u32,
    pub num_g2_points: u32,
    pub start_from: u32,
}

impl TranscriptManifest {
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, SrsError> {
        Ok(Self {
            transcript_number: reader.read_u32::<BigEndian>()?,
            total_transcripts: reader.read_u32::<BigEndian>()?,
            total_g1_points: reader.read_u32::<BigEndian>()?,
            total_g2_points: reader.read_u32::<BigEndian>()?,
            num_g1_points: reader.read_u32::<BigEndian>()?,
            num_g2_points: reader.read_u32::<BigEndian>()?,
            start_from: reader.read_u32::<BigEndian>()?,
        })
    }

    /// Byte offset of the G2 section
    fn g2_offset(&self) -> u64 {
        TRANSCRIPT_HEADER_SIZE + u64::from(self.num_g1_points) * G1_POINT_SIZE as u64
    }

    fn check_size(&self, requested: usize) -> Result<(), SrsError> {
        if self.transcript_number != 0 {
            return Err(SrsError::Transcript(format!(
                "transcript {} does not start at the first power",
                self.transcript_number
            )));
        }
        if (self.num_g1_points as usize) < requested {
            return Err(SrsError::TooSmall {
                available: self.num_g1_points as usize,
                requested,
            });
        }
        Ok(())
    }
}

/// Where a missing reference string comes from
pub trait SrsSource {
    /// Produce a reference string with at least `size` G1 points
    fn fetch(&self, size: usize) -> Result<ReferenceString, SrsError>;
}

/// Downloads the needed prefix of an Ignition transcript with range requests
pub struct IgnitionSource {
    client: Client,
    url: String,
}

impl IgnitionSource {
    pub fn new(url: impl Into<String>) -> Result<Self, SrsError> {
        let client = Client::builder().timeout(None).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    fn get_range(&self, start: u64, len: u64) -> Result<Vec<u8>, SrsError> {
        if len == 0 {
            return Ok(Vec::new());
        }
        let end = start + len - 1;
        let response = self
            .client
            .get(&self.url)
            .header(RANGE, format!("bytes={}-{}", start, end))
            .send()?
            .error_for_status()?;
        let bytes = response.bytes()?;
        if bytes.len() as u64 != len {
            return Err(SrsError::Transcript(format!(
                "range {}-{} returned {} bytes",
                start,
                end,
                bytes.len()
            )));
        }
        Ok(bytes.to_vec())
    }
}

impl SrsSource for IgnitionSource {
    fn fetch(&self, size: usize) -> Result<ReferenceString, SrsError> {
        info!("Downloading {} G1 points from {}", size, self.url);

        let header = self.get_range(0, TRANSCRIPT_HEADER_SIZE)?;
        let manifest = TranscriptManifest::read(&mut Cursor::new(header))?;
        manifest.check_size(size)?;

        let g1 = self.get_range(TRANSCRIPT_HEADER_SIZE, (size * G1_POINT_SIZE) as u64)?;
        let g2 = self.get_range(
            manifest.g2_offset(),
            u64::from(manifest.num_g2_points) * G2_POINT_SIZE as u64,
        )?;

        ReferenceString::from_points(&g1, &g2)
    }
}

/// Reads a locally downloaded Ignition transcript
pub struct TranscriptFileSource {
    path: PathBuf,
}

impl TranscriptFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SrsSource for TranscriptFileSource {
    fn fetch(&self, size: usize) -> Result<ReferenceString, SrsError> {
        info!("Reading {} G1 points from {:?}", size, self.path);

        let mut file = File::open(&self.path)?;
        let manifest = TranscriptManifest::read(&mut file)?;
        manifest.check_size(size)?;

        let mut g1 = vec![0u8; size * G1_POINT_SIZE];
        file.read_exact(&mut g1)?;

        file.seek(SeekFrom::Start(manifest.g2_offset()))?;
        let mut g2 = vec![0u8; manifest.num_g2_points as usize * G2_POINT_SIZE];
        file.read_exact(&mut g2)?;

        ReferenceString::from_points(&g1, &g2)
    }
}

/// Ensures a reference string is present in the artifact store
pub struct SrsProvisioner {
    source: Box<dyn SrsSource>,
}

impl SrsProvisioner {
    pub fn new(source: Box<dyn SrsSource>) -> Self {
        Self { source }
    }

    /// Return the cached reference string, fetching and caching it on first use
    pub fn ensure<S: ArtifactStore>(
        &self,
        store: &mut S,
        size: usize,
    ) -> Result<ReferenceString, SrsError> {
        if store.contains(ArtifactKind::ReferenceString) {
            let bytes = store.load(ArtifactKind::ReferenceString)?;
            let srs = ReferenceString::from_bytes(bytes).map_err(|e| StoreError::Corrupt {
                kind: ArtifactKind::ReferenceString,
                reason: e.to_string(),
            })?;
            info!(
                "Using cached reference string with {} G1 points",
                srs.num_g1_points()
            );
            return Ok(srs);
        }

        let srs = self.source.fetch(size)?;
        store.save(ArtifactKind::ReferenceString, srs.as_bytes())?;
        info!(
            "Saved reference string with {} G1 points to {}",
            srs.num_g1_points(),
            store.location(ArtifactKind::ReferenceString)
        );
        Ok(srs)
    }
}
