//! Proof wrapper CLI

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use proof_wrapper::config::DEFAULT_DATA_DIR;
use proof_wrapper::{
    DigestBackend, FileSystemStore, IgnitionSource, PackingParams, Pipeline, PipelineConfig,
    SrsProvisioner, SrsSource, TranscriptFileSource,
};

#[derive(Parser)]
#[command(name = "proof-wrapper")]
#[command(
    about = "Runs the Plonky2-to-BN254 wrapping pipeline with the digest reference backend",
    long_about = "Runs the Plonky2-to-BN254 wrapping pipeline with the digest reference backend.\n\n\
                  The digest backend produces Keccak commitments and a stub verifier contract, \
                  not PLONK proofs. Its output must not be published as a real wrapped proof."
)]
struct Cli {
    /// Compile the circuit and derive keys before proving
    #[arg(long)]
    compile_circuit: bool,

    /// Directory holding artifacts
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    /// Directory holding the inner proof bundle (defaults to the data directory)
    #[arg(long)]
    bundle_dir: Option<PathBuf>,

    /// Expose every inner public input as its own outer public input
    #[arg(long)]
    no_compress: bool,

    /// G1 points to provision for the reference string
    #[arg(long)]
    srs_size: Option<usize>,

    /// Ceremony transcript URL to provision the reference string from
    #[arg(long)]
    srs_url: Option<String>,

    /// Local ceremony transcript, used instead of downloading
    #[arg(long, conflicts_with = "srs_url")]
    srs_transcript: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = PipelineConfig::default().with_data_dir(&cli.data_dir);
    config.packing = PackingParams::for_compression(!cli.no_compress);
    if let Some(size) = cli.srs_size {
        config.srs_size = size;
    }
    if let Some(url) = cli.srs_url {
        config.srs_url = url;
    }

    let source: Box<dyn SrsSource> = match cli.srs_transcript {
        Some(path) => Box::new(TranscriptFileSource::new(path)),
        None => Box::new(IgnitionSource::new(config.srs_url.clone())?),
    };

    let store = FileSystemStore::open(&config.data_dir)
        .with_context(|| format!("cannot open data directory {:?}", config.data_dir))?;
    let bundle_dir = cli.bundle_dir.unwrap_or_else(|| config.data_dir.clone());

    let backend = DigestBackend::new();
    warn!("The digest backend gives no soundness guarantees; its proofs are not PLONK proofs");

    let mut pipeline = Pipeline::new(config, store, backend, SrsProvisioner::new(source));
    let final_proof = pipeline.run(&bundle_dir, cli.compile_circuit)?;

    info!(
        "Done: proof {} with {} public inputs in {:?}",
        final_proof.proof,
        final_proof.public_inputs.len(),
        pipeline.config().data_dir
    );
    Ok(())
}
