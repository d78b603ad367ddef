//! Puntos de entrada de los dos comandos. Cada uno abre la entrada, arma el
//! sink, corre el pipeline hasta el final del archivo y devuelve su resumen.
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use log::info;
use wrangler_core::{Pipeline, PipelineOptions, RunSummary, Sink};
use wrangler_persistence::{SplitFilePaths, SplitFileSink, SqliteSink};

use crate::config::AppConfig;

fn open_input(input: &Path) -> Result<BufReader<File>> {
    let file = File::open(input)
        .with_context(|| format!("failed to open input {}", input.display()))?;
    Ok(BufReader::new(file))
}

fn run_pipeline<S: Sink>(sink: S, input: &Path, config: &AppConfig) -> Result<RunSummary> {
    let reader = open_input(input)?;
    let options = PipelineOptions {
        progress_every: config.progress_every,
    };
    let mut pipeline =
        Pipeline::open_with(sink, options).context("failed to prepare the sink")?;
    let summary = pipeline
        .run(reader)
        .with_context(|| format!("aborted while processing {}", input.display()))?;
    Ok(summary)
}

/// `gas-wrangler load <INPUT> [DATABASE]`
pub fn run_load(input: &Path, database: Option<&str>, config: &AppConfig) -> Result<RunSummary> {
    let db = config
        .database_for(database)
        .ok_or_else(|| anyhow!("no database path given and DATABASE_URL is not set"))?;
    info!("loading {} into {}", input.display(), db.path);
    let path = db.path.clone();
    let sink = SqliteSink::open(db).with_context(|| format!("failed to open database {path}"))?;
    run_pipeline(sink, input, config)
}

/// `gas-wrangler normalize <INPUT>`
pub fn run_normalize(input: &Path, config: &AppConfig) -> Result<RunSummary> {
    let paths = SplitFilePaths::derive(input);
    info!(
        "normalizing {} into {}, {}, {}",
        input.display(),
        paths.contexts.display(),
        paths.points.display(),
        paths.spans.display()
    );
    // abrir la entrada antes, así un error de tipeo no deja salidas vacías
    let _ = open_input(input)?;
    let sink = SplitFileSink::create(&paths).context("failed to create output files")?;
    run_pipeline(sink, input, config)
}
