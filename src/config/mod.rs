use anyhow::{Context, Result};
use ingest_engine::SourceDescriptor;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A job reads every source in order and writes their records to one output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub name: String,
    pub sources: Vec<SourceDescriptor>,
    /// JSON lines output file; records go to stdout when absent
    #[serde(default)]
    pub output: Option<String>,
    /// Maximum records read per source
    #[serde(default)]
    pub limit: Option<usize>,
}

impl JobConfig {
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: JobConfig =
            serde_yaml::from_str(content).context("Failed to parse YAML configuration")?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            anyhow::bail!("Job name must not be empty");
        }
        if self.sources.is_empty() {
            anyhow::bail!("Job '{}' must declare at least one source", self.name);
        }
        for (idx, source) in self.sources.iter().enumerate() {
            source
                .validate()
                .with_context(|| format!("Invalid source #{} '{}'", idx + 1, source.path))?;
        }
        if self.limit == Some(0) {
            anyhow::bail!("Limit must be greater than zero");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest_engine::{Compression, FileFormat, SourceKind};

    #[test]
    fn parses_job_with_defaults() {
        let yaml = r##"
name: people
output: /tmp/people.jsonl
sources:
  - path: /data/person.csv
    format: csv
    comment_symbols: ["#"]
  - kind: remote
    path: s3://warehouse/person.parquet
    format: csv
    compression: orc
"##;
        let job = JobConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(job.name, "people");
        assert_eq!(job.output.as_deref(), Some("/tmp/people.jsonl"));
        assert_eq!(job.limit, None);
        assert_eq!(job.sources[0].kind, SourceKind::File);
        assert_eq!(job.sources[0].format, FileFormat::Csv);
        assert_eq!(job.sources[0].comment_symbols, ["#"]);
        assert_eq!(job.sources[1].kind, SourceKind::Remote);
        assert_eq!(job.sources[1].compression, Compression::Columnar);
    }

    #[test]
    fn rejects_job_without_sources() {
        let err = JobConfig::from_yaml_str("name: empty\nsources: []\n").unwrap_err();
        assert!(err.to_string().contains("at least one source"));
    }

    #[test]
    fn rejects_invalid_source() {
        let yaml = "name: bad\nsources:\n  - path: a.csv\n    format: csv\n    delimiter: '||'\n";
        let err = JobConfig::from_yaml_str(yaml).unwrap_err();
        assert!(err.to_string().contains("Invalid source #1"));
    }

    #[test]
    fn rejects_unknown_compression() {
        let yaml = "name: bad\nsources:\n  - path: a.txt\n    format: text\n    compression: pack200\n";
        assert!(JobConfig::from_yaml_str(yaml).is_err());
    }
}
