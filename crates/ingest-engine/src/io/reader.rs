use ingest_sdk::{LoadError, Record, Result};

pub mod columnar;
pub mod lines;
pub mod local;
pub mod remote;

/// Pull-based reader over one source (generator-like API).
///
/// `has_next` fetches at most one record ahead; `next` hands it out. Records
/// come back in source order.
pub trait InputReader {
    /// Open the source. Must be called once before iterating.
    fn init(&mut self) -> Result<()>;

    /// Whether another record is available; idempotent until `next` is called.
    fn has_next(&mut self) -> Result<bool>;

    /// Consume the next record, fetching it first if needed.
    fn next(&mut self) -> Result<Record>;

    /// Raw text of the buffered record, if any
    fn line(&self) -> Option<&str>;

    /// Release every stream and handle. Safe to call repeatedly and after a failed `init`.
    fn close(&mut self);
}

/// Produces records for a [`SourceReader`]; the lookahead lives in the reader.
pub trait RecordSource {
    fn init(&mut self) -> Result<()>;

    /// Next record, or `None` at end of input
    fn fetch(&mut self) -> Result<Option<Record>>;

    /// Release resources; must tolerate never having been initialized.
    fn close(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    Unopened,
    Initialized,
    Closed,
}

/// One-slot lookahead buffer
#[derive(Debug, Default)]
struct Lookahead {
    slot: Option<Record>,
    exhausted: bool,
}

impl Lookahead {
    fn peek(&self) -> Option<&Record> {
        self.slot.as_ref()
    }

    fn advance(&mut self) -> Option<Record> {
        self.slot.take()
    }

    fn fill(&mut self, record: Option<Record>) -> bool {
        match record {
            Some(record) => {
                self.slot = Some(record);
                true
            }
            None => {
                self.exhausted = true;
                false
            }
        }
    }
}

/// [`InputReader`] over any [`RecordSource`].
pub struct SourceReader<S: RecordSource> {
    source: S,
    lookahead: Lookahead,
    state: ReaderState,
}

impl<S: RecordSource> SourceReader<S> {
    pub fn from_source(source: S) -> Self {
        Self {
            source,
            lookahead: Lookahead::default(),
            state: ReaderState::Unopened,
        }
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    fn ensure_initialized(&self) -> Result<()> {
        match self.state {
            ReaderState::Initialized => Ok(()),
            ReaderState::Unopened => Err(LoadError::Internal(
                "Reader must be initialized before reading".to_string(),
            )),
            ReaderState::Closed => Err(LoadError::Internal("Reader is already closed".to_string())),
        }
    }
}

impl<S: RecordSource> InputReader for SourceReader<S> {
    fn init(&mut self) -> Result<()> {
        match self.state {
            ReaderState::Unopened => {}
            ReaderState::Initialized => {
                return Err(LoadError::Internal("Reader is already initialized".to_string()))
            }
            ReaderState::Closed => {
                return Err(LoadError::Internal("Reader is already closed".to_string()))
            }
        }
        if let Err(e) = self.source.init() {
            self.source.close();
            return Err(e);
        }
        self.state = ReaderState::Initialized;
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool> {
        self.ensure_initialized()?;
        if self.lookahead.peek().is_some() {
            return Ok(true);
        }
        if self.lookahead.exhausted {
            return Ok(false);
        }
        let record = self.source.fetch()?;
        Ok(self.lookahead.fill(record))
    }

    fn next(&mut self) -> Result<Record> {
        if !self.has_next()? {
            return Err(LoadError::Exhausted("Reach end of input".to_string()));
        }
        self.lookahead
            .advance()
            .ok_or_else(|| LoadError::Internal("Lookahead buffer is empty".to_string()))
    }

    fn line(&self) -> Option<&str> {
        self.lookahead.peek().map(Record::raw)
    }

    fn close(&mut self) {
        if self.state == ReaderState::Closed {
            return;
        }
        self.source.close();
        self.lookahead = Lookahead::default();
        self.state = ReaderState::Closed;
    }
}

impl<S: RecordSource> Drop for SourceReader<S> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Iterator adapter over an initialized reader.
///
/// Errors are yielded in place; iteration may continue after a parse error.
pub struct Records<'a, R: InputReader + ?Sized> {
    reader: &'a mut R,
}

impl<'a, R: InputReader + ?Sized> Records<'a, R> {
    pub fn new(reader: &'a mut R) -> Self {
        Self { reader }
    }
}

impl<R: InputReader + ?Sized> Iterator for Records<'_, R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.has_next() {
            Ok(true) => Some(InputReader::next(self.reader)),
            Ok(false) => None,
            Err(e) => Some(Err(e)),
        }
    }
}
