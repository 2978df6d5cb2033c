use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub job_name: String,
    pub output_path: Option<String>,
    pub sources: Vec<SourceManifest>,
    pub total_records: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceManifest {
    pub path: String,
    pub variant: String,
    pub records_read: usize,
    pub parse_errors: usize,
    pub limited: bool,
}

impl RunManifest {
    pub fn new(job_name: String, output_path: Option<String>) -> Self {
        Self {
            job_name,
            output_path,
            sources: Vec::new(),
            total_records: 0,
        }
    }

    pub fn add_source(&mut self, source: SourceManifest) {
        self.total_records += source.records_read;
        self.sources.push(source);
    }

    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }
}
