use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use ingest_engine::io::{JsonlWriter, Writer};
use ingest_engine::{InputReader, ReaderFactory, SourceDescriptor, SourceVariant};
use ingest_sdk::LoadError;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::JobConfig;

mod manifest;
pub use manifest::{RunManifest, SourceManifest};

pub fn run_job(config: &JobConfig) -> Result<RunManifest> {
    info!(job = %config.name, sources = config.sources.len(), "Running job");

    let mut writer: Box<dyn Writer> = match &config.output {
        Some(path) => {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            Box::new(JsonlWriter::create(path)?)
        }
        None => Box::new(JsonlWriter::stdout()),
    };

    let mut manifest = RunManifest::new(config.name.clone(), config.output.clone());
    for (idx, source) in config.sources.iter().enumerate() {
        info!(
            "[Source {}/{}] {}",
            idx + 1,
            config.sources.len(),
            source.path
        );
        let source_manifest = read_source(source, config.limit, writer.as_mut())
            .with_context(|| format!("Failed to read source '{}'", source.path))?;
        info!(
            path = %source.path,
            records = source_manifest.records_read,
            parse_errors = source_manifest.parse_errors,
            "Source completed"
        );
        manifest.add_source(source_manifest);
    }

    let has_data = writer.close()?;
    if !has_data {
        warn!(job = %config.name, "No records were read");
    }

    if let Some(output) = &config.output {
        let manifest_path = format!("{}.manifest.json", output);
        manifest.write_to_file(&manifest_path)?;
        info!(path = %manifest_path, "Manifest written");
    }

    info!(job = %config.name, records = manifest.total_records, "Job completed");
    Ok(manifest)
}

fn read_source(
    source: &SourceDescriptor,
    limit: Option<usize>,
    writer: &mut dyn Writer,
) -> Result<SourceManifest> {
    let variant = SourceVariant::of(source);
    let mut reader = ReaderFactory::create(Arc::new(source.clone()))?;
    reader.init()?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {pos} records {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(source.path.clone());
    pb.enable_steady_tick(Duration::from_millis(120));

    let result = copy_records(reader.as_mut(), limit, writer, &pb);
    reader.close();
    pb.finish_and_clear();

    let (records_read, parse_errors, limited) = result?;
    Ok(SourceManifest {
        path: source.path.clone(),
        variant: format!("{:?}", variant).to_lowercase(),
        records_read,
        parse_errors,
        limited,
    })
}

/// Copy records until the source is exhausted or `limit` is reached.
///
/// Malformed lines are logged and skipped; any other error aborts the source.
fn copy_records(
    reader: &mut dyn InputReader,
    limit: Option<usize>,
    writer: &mut dyn Writer,
    pb: &ProgressBar,
) -> Result<(usize, usize, bool)> {
    let mut records_read = 0;
    let mut parse_errors = 0;
    loop {
        if limit.is_some_and(|limit| records_read >= limit) {
            return Ok((records_read, parse_errors, true));
        }
        match reader.has_next() {
            Ok(true) => {}
            Ok(false) => break,
            Err(e @ LoadError::Parse { .. }) => {
                warn!(error = %e, "Skipping malformed line");
                parse_errors += 1;
                continue;
            }
            Err(e) => return Err(e.into()),
        }
        let record = reader.next()?;
        writer.write_record(&record)?;
        records_read += 1;
        pb.inc(1);
    }
    Ok((records_read, parse_errors, false))
}
