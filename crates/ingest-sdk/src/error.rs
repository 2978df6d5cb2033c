use std::error::Error as StdError;

/// Boxed cause carried by errors that wrap a lower-level failure.
pub type Cause = Box<dyn StdError + Send + Sync + 'static>;

/// Single error kind surfaced by every reader.
///
/// Each variant carries a human-readable message; variants that wrap a
/// lower-level failure keep it as the error source.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The input could not be opened or the reader could not be set up.
    #[error("{message}")]
    Init {
        message: String,
        #[source]
        source: Option<Cause>,
    },

    /// The source declares something the line-oriented or columnar path cannot handle.
    #[error("{0}")]
    Unsupported(String),

    /// Reading from an already opened stream failed.
    #[error("{message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// A line could not be structured according to the declared format.
    #[error("{message} at line {line_no}: '{raw}'")]
    Parse {
        line_no: usize,
        raw: String,
        message: String,
    },

    /// `next()` was called with no record available.
    #[error("{0}")]
    Exhausted(String),

    /// The reader observed a state that indicates a bug or a reader/schema mismatch.
    #[error("{0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, LoadError>;

impl LoadError {
    pub fn init(message: impl Into<String>) -> Self {
        LoadError::Init {
            message: message.into(),
            source: None,
        }
    }

    pub fn init_with<E>(message: impl Into<String>, source: E) -> Self
    where
        E: Into<Cause>,
    {
        LoadError::Init {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        LoadError::Io {
            message: message.into(),
            source,
        }
    }

    pub fn parse(line_no: usize, raw: impl Into<String>, message: impl Into<String>) -> Self {
        LoadError::Parse {
            line_no,
            raw: raw.into(),
            message: message.into(),
        }
    }

    /// Re-labels an error raised while opening a source as an initialization failure.
    ///
    /// Unsupported-configuration errors keep their kind so callers can tell a bad
    /// descriptor apart from an unreachable input.
    pub fn into_init(self, message: impl Into<String>) -> Self {
        match self {
            LoadError::Unsupported(_) | LoadError::Init { .. } => self,
            other => LoadError::init_with(message, other),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, LoadError::Exhausted(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_includes_raw_line_and_position() {
        let err = LoadError::parse(7, "a,b", "Expected 3 columns but found 2");
        assert_eq!(
            err.to_string(),
            "Expected 3 columns but found 2 at line 7: 'a,b'"
        );
    }

    #[test]
    fn into_init_keeps_unsupported_kind() {
        let err = LoadError::Unsupported("Unsupported compression 'z'".into());
        assert!(matches!(
            err.into_init("Failed to load input"),
            LoadError::Unsupported(_)
        ));
    }

    #[test]
    fn into_init_wraps_io_errors() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let err = LoadError::io("Read next line error", io).into_init("Failed to load input");
        match err {
            LoadError::Init { message, source } => {
                assert_eq!(message, "Failed to load input");
                assert!(source.is_some());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
