use ingest_sdk::{LoadError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Describes one input: where the bytes come from and how to turn them into records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDescriptor {
    #[serde(default)]
    pub kind: SourceKind,
    pub path: String,
    pub format: FileFormat,
    #[serde(default)]
    pub compression: Compression,
    #[serde(default = "default_charset")]
    pub charset: String,
    #[serde(default)]
    pub comment_symbols: Vec<String>,
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    /// Explicit field names for csv sources; when set no header line is consumed
    #[serde(default)]
    pub header: Option<Vec<String>>,
    #[serde(default = "default_has_header")]
    pub has_header: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    File,
    #[serde(alias = "hdfs")]
    Remote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Csv,
    Text,
    #[serde(alias = "jsonl")]
    Json,
}

/// Compression identifiers understood by the readers.
///
/// `Columnar` names the self-describing columnar format, which carries its own
/// compression and is only readable by the columnar reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Compression {
    #[default]
    None,
    Gzip,
    Bzip2,
    Xz,
    Lzma,
    SnappyFramed,
    SnappyRaw,
    Deflate,
    Zip,
    Columnar,
}

fn default_charset() -> String {
    "UTF-8".to_string()
}

fn default_delimiter() -> String {
    ",".to_string()
}

fn default_has_header() -> bool {
    true
}

impl SourceDescriptor {
    pub fn new(kind: SourceKind, path: impl Into<String>, format: FileFormat) -> Self {
        Self {
            kind,
            path: path.into(),
            format,
            compression: Compression::None,
            charset: default_charset(),
            comment_symbols: Vec::new(),
            delimiter: default_delimiter(),
            header: None,
            has_header: default_has_header(),
        }
    }

    pub fn file(path: impl Into<String>, format: FileFormat) -> Self {
        Self::new(SourceKind::File, path, format)
    }

    pub fn remote(path: impl Into<String>, format: FileFormat) -> Self {
        Self::new(SourceKind::Remote, path, format)
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }

    pub fn with_comment_symbols<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.comment_symbols = symbols.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    pub fn with_header<I, S>(mut self, header: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.header = Some(header.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_has_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    pub fn is_comment_line(&self, line: &str) -> bool {
        self.comment_symbols
            .iter()
            .any(|symbol| !symbol.is_empty() && line.starts_with(symbol.as_str()))
    }

    /// The csv delimiter as a single byte
    pub fn delimiter_byte(&self) -> Result<u8> {
        match self.delimiter.as_bytes() {
            [byte] => Ok(*byte),
            b"\\t" => Ok(b'\t'),
            _ => Err(LoadError::Unsupported(format!(
                "Delimiter must be a single byte, got '{}'",
                self.delimiter
            ))),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.path.trim().is_empty() {
            return Err(LoadError::Unsupported(
                "Source path must not be empty".to_string(),
            ));
        }
        if self.format == FileFormat::Csv {
            self.delimiter_byte()?;
            if let Some(header) = &self.header {
                if header.is_empty() {
                    return Err(LoadError::Unsupported(format!(
                        "Explicit header of source '{}' must not be empty",
                        self.path
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Compression {
    /// Canonical identifier, as accepted by the codec factory
    pub fn name(&self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Gzip => "gz",
            Compression::Bzip2 => "bzip2",
            Compression::Xz => "xz",
            Compression::Lzma => "lzma",
            Compression::SnappyFramed => "snappy-framed",
            Compression::SnappyRaw => "snappy-raw",
            Compression::Deflate => "deflate",
            Compression::Zip => "zip",
            Compression::Columnar => "parquet",
        }
    }

    pub fn is_columnar(&self) -> bool {
        matches!(self, Compression::Columnar)
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Compression {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Ok(Compression::None),
            "gz" | "gzip" => Ok(Compression::Gzip),
            "bzip2" | "bz2" => Ok(Compression::Bzip2),
            "xz" => Ok(Compression::Xz),
            "lzma" => Ok(Compression::Lzma),
            "snappy-framed" | "snappy_framed" => Ok(Compression::SnappyFramed),
            "snappy-raw" | "snappy_raw" => Ok(Compression::SnappyRaw),
            "deflate" => Ok(Compression::Deflate),
            "zip" => Ok(Compression::Zip),
            "parquet" | "orc" | "columnar" => Ok(Compression::Columnar),
            other => Err(LoadError::Unsupported(format!(
                "Unsupported compression '{}'",
                other
            ))),
        }
    }
}

impl TryFrom<String> for Compression {
    type Error = LoadError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Compression> for String {
    fn from(value: Compression) -> Self {
        value.name().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_with_defaults() {
        let yaml = "path: /data/person.csv\nformat: csv\n";
        let source: SourceDescriptor = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(source.kind, SourceKind::File);
        assert_eq!(source.compression, Compression::None);
        assert_eq!(source.charset, "UTF-8");
        assert_eq!(source.delimiter, ",");
        assert!(source.has_header);
        assert!(source.comment_symbols.is_empty());
    }

    #[test]
    fn deserializes_remote_columnar_source() {
        let yaml = "kind: hdfs\npath: memory:///warehouse/person.parquet\nformat: csv\ncompression: ORC\n";
        let source: SourceDescriptor = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(source.kind, SourceKind::Remote);
        assert!(source.compression.is_columnar());
    }

    #[test]
    fn unknown_compression_is_unsupported() {
        let err = "pack200".parse::<Compression>().unwrap_err();
        assert!(matches!(err, LoadError::Unsupported(_)));

        let yaml = "path: a.txt\nformat: text\ncompression: z\n";
        let err = serde_yaml::from_str::<SourceDescriptor>(yaml).unwrap_err();
        assert!(err.to_string().contains("Unsupported compression 'z'"));
    }

    #[test]
    fn compression_names_round_trip() {
        for compression in [
            Compression::None,
            Compression::Gzip,
            Compression::Bzip2,
            Compression::Xz,
            Compression::Lzma,
            Compression::SnappyFramed,
            Compression::SnappyRaw,
            Compression::Deflate,
            Compression::Zip,
            Compression::Columnar,
        ] {
            assert_eq!(compression.name().parse::<Compression>().unwrap(), compression);
        }
    }

    #[test]
    fn comment_lines_match_any_prefix() {
        let source = SourceDescriptor::file("a.csv", FileFormat::Csv)
            .with_comment_symbols(["#", "//"]);
        assert!(source.is_comment_line("# header"));
        assert!(source.is_comment_line("// note"));
        assert!(!source.is_comment_line("a,b,#c"));
    }

    #[test]
    fn delimiter_must_be_single_byte() {
        let source = SourceDescriptor::file("a.csv", FileFormat::Csv).with_delimiter("||");
        assert!(matches!(source.validate(), Err(LoadError::Unsupported(_))));

        let tab = SourceDescriptor::file("a.tsv", FileFormat::Csv).with_delimiter("\\t");
        assert_eq!(tab.delimiter_byte().unwrap(), b'\t');
    }
}
