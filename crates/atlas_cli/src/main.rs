//! Atlas expansion entry point.
//!
//! # Responsibility
//! - Load `atlas.toml`, start logging and wire the configured backends.
//! - Seed or resume the atlas directory and run one expansion.
//!
//! Usage: `atlas [CONFIG]`, where `CONFIG` defaults to `atlas.toml`.

use atlas_core::{
    core_version, default_log_level, init_logging, AtlasConfig, AtlasTracer, BackendRegistry,
    BagOfWordsVectorizer, BatchLibrarian, Cartographer, CatalogSource, DirectoryAtlasStore,
    Librarian, Vectorizer, WorkerPool,
};
use log::{error, info};
use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;

const DEFAULT_CONFIG_PATH: &str = "atlas.toml";

fn main() -> ExitCode {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    match run(&config_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=atlas_run module=cli status=error error={err}");
            eprintln!("atlas error={err}");
            ExitCode::FAILURE
        }
    }
}

fn run(config_path: &str) -> Result<(), Box<dyn Error>> {
    let config = AtlasConfig::load(config_path)?;
    let level = config
        .log_level
        .clone()
        .unwrap_or_else(|| default_log_level().to_string());
    init_logging(&level, &config.log_dir())?;
    println!("atlas_core version={}", core_version());

    let librarian = librarians(&config)?.require(&config.librarian)?;
    let vectorizer = vectorizers(&config)?.require(&config.vectorizer)?;
    let mut cartographer = Cartographer::new(librarian, vectorizer);
    if let Some(seed) = config.seed {
        cartographer = cartographer.with_seed(seed);
    }

    let store = DirectoryAtlasStore::new(config.atlas_dir.clone());
    let mut tracer = AtlasTracer::open(
        cartographer,
        store,
        &config.seed_bibtex,
        &config.fetch_options(),
    )?;
    println!(
        "atlas opened dir={} size={} center={}",
        config.atlas_dir.display(),
        tracer.atlas().len(),
        tracer.atlas().center().unwrap_or("none")
    );

    let summary = tracer.expand_atlas(&config.to_expansion_config())?;
    info!(
        "event=atlas_run module=cli status=ok stop_reason={} iterations={} size={}",
        summary.stop_reason.as_str(),
        summary.iterations,
        summary.atlas_size
    );
    println!(
        "atlas expanded stop_reason={} iterations={} size={}",
        summary.stop_reason.as_str(),
        summary.iterations,
        summary.atlas_size
    );
    Ok(())
}

fn librarians(config: &AtlasConfig) -> Result<BackendRegistry<dyn Librarian>, Box<dyn Error>> {
    let mut registry: BackendRegistry<dyn Librarian> = BackendRegistry::new();
    if let Some(catalog_path) = &config.catalog {
        let catalog = CatalogSource::from_path(catalog_path)?;
        let pool = WorkerPool::new(config.workers)?;
        registry.register(Arc::new(BatchLibrarian::new(catalog).with_pool(pool)))?;
    }
    Ok(registry)
}

fn vectorizers(config: &AtlasConfig) -> Result<BackendRegistry<dyn Vectorizer>, Box<dyn Error>> {
    let mut registry: BackendRegistry<dyn Vectorizer> = BackendRegistry::new();
    registry.register(Arc::new(BagOfWordsVectorizer::new(config.bow_dimension)?))?;
    Ok(registry)
}
