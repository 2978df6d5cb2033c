use ingest_sdk::Record;

/// Sink for records read from a source.
/// Writer manages its own buffer and flushes when the buffer reaches its partition size
pub trait Writer {
    /// Write a single record
    fn write_record(&mut self, record: &Record) -> anyhow::Result<()>;

    /// Flush anything buffered and finalize the output.
    /// Returns true if any data was written, false otherwise
    fn close(self: Box<Self>) -> anyhow::Result<bool>;
}

pub mod jsonl;
