//! Streaming zip reader.
//!
//! Walks the archive's local file headers front to back, so it works on
//! non-seekable streams and never needs the central directory. Entry bodies
//! are passed through (stored) or inflated incrementally (deflated).

use flate2::bufread::DeflateDecoder;
use std::io::{self, BufRead, BufReader, Read, Take};

const LOCAL_HEADER_SIG: u32 = 0x0403_4b50;
const CENTRAL_HEADER_SIG: u32 = 0x0201_4b50;
const END_OF_CENTRAL_DIR_SIG: u32 = 0x0605_4b50;
const DATA_DESCRIPTOR_SIG: u32 = 0x0807_4b50;

const FLAG_ENCRYPTED: u16 = 1;
const FLAG_DATA_DESCRIPTOR: u16 = 1 << 3;

const METHOD_STORED: u16 = 0;
const METHOD_DEFLATED: u16 = 8;

const ZIP64_EXTRA_ID: u16 = 0x0001;

struct LocalHeader {
    flags: u16,
    method: u16,
    compressed_size: u64,
    zip64: bool,
}

enum State<R> {
    /// Positioned at the next local header (or the central directory)
    Header(BufReader<R>),
    Stored(Take<BufReader<R>>),
    Deflated {
        body: DeflateDecoder<BufReader<R>>,
        /// Sizes follow the body; `Some(zip64)` tells their width
        descriptor: Option<bool>,
    },
    Done,
}

/// Concatenated contents of every entry of a zip archive, in archive order.
///
/// Directory entries have empty bodies and contribute nothing. Sizes declared
/// in the headers are only trusted for stored entries, whose body length
/// cannot be found any other way.
pub struct ZipEntries<R> {
    state: State<R>,
}

impl<R: Read> ZipEntries<R> {
    pub fn new(inner: R) -> Self {
        Self {
            state: State::Header(BufReader::new(inner)),
        }
    }

    fn start_entry(&mut self) -> io::Result<()> {
        let State::Header(mut reader) = std::mem::replace(&mut self.state, State::Done) else {
            return Ok(());
        };
        let Some(header) = read_local_header(&mut reader)? else {
            return Ok(());
        };

        if header.flags & FLAG_ENCRYPTED != 0 {
            return Err(invalid_data("Encrypted zip entries are not supported"));
        }
        let has_descriptor = header.flags & FLAG_DATA_DESCRIPTOR != 0;
        self.state = match header.method {
            METHOD_STORED if has_descriptor => {
                return Err(invalid_data(
                    "Stored zip entries with a trailing data descriptor are not supported",
                ))
            }
            METHOD_STORED => State::Stored(reader.take(header.compressed_size)),
            METHOD_DEFLATED => State::Deflated {
                body: DeflateDecoder::new(reader),
                descriptor: has_descriptor.then_some(header.zip64),
            },
            other => {
                return Err(invalid_data(format!(
                    "Unsupported zip compression method {}",
                    other
                )))
            }
        };
        Ok(())
    }

    fn finish_entry(&mut self) -> io::Result<()> {
        self.state = match std::mem::replace(&mut self.state, State::Done) {
            State::Stored(body) => {
                if body.limit() > 0 {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "Zip entry is truncated",
                    ));
                }
                State::Header(body.into_inner())
            }
            State::Deflated { body, descriptor } => {
                let mut reader = body.into_inner();
                if let Some(zip64) = descriptor {
                    skip_data_descriptor(&mut reader, zip64)?;
                }
                State::Header(reader)
            }
            other => other,
        };
        Ok(())
    }
}

impl<R: Read> Read for ZipEntries<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            let n = match &mut self.state {
                State::Header(_) => {
                    self.start_entry()?;
                    continue;
                }
                State::Stored(body) => body.read(buf)?,
                State::Deflated { body, .. } => body.read(buf)?,
                State::Done => return Ok(0),
            };
            if n > 0 {
                return Ok(n);
            }
            self.finish_entry()?;
        }
    }
}

/// Next local header, or `None` once the central directory (or end of input) is reached
fn read_local_header<R: BufRead>(reader: &mut R) -> io::Result<Option<LocalHeader>> {
    if reader.fill_buf()?.is_empty() {
        return Ok(None);
    }
    match read_u32(reader)? {
        LOCAL_HEADER_SIG => {}
        CENTRAL_HEADER_SIG | END_OF_CENTRAL_DIR_SIG => return Ok(None),
        other => {
            return Err(invalid_data(format!(
                "Unexpected zip record signature {:#010x}",
                other
            )))
        }
    }

    // version, flags, method, time, date, crc, sizes, name and extra lengths
    let mut fixed = [0u8; 26];
    reader.read_exact(&mut fixed)?;
    let flags = u16::from_le_bytes([fixed[2], fixed[3]]);
    let method = u16::from_le_bytes([fixed[4], fixed[5]]);
    let compressed = u32::from_le_bytes([fixed[14], fixed[15], fixed[16], fixed[17]]);
    let uncompressed = u32::from_le_bytes([fixed[18], fixed[19], fixed[20], fixed[21]]);
    let name_len = u16::from_le_bytes([fixed[22], fixed[23]]) as u64;
    let extra_len = u16::from_le_bytes([fixed[24], fixed[25]]) as usize;

    skip(reader, name_len)?;
    let mut extra = vec![0u8; extra_len];
    reader.read_exact(&mut extra)?;

    let mut header = LocalHeader {
        flags,
        method,
        compressed_size: compressed as u64,
        zip64: false,
    };
    if let Some(zip64) = find_extra(&extra, ZIP64_EXTRA_ID) {
        header.zip64 = true;
        // Only the sizes saturated in the fixed header are present, in this order
        let mut fields = zip64.chunks_exact(8).map(|chunk| {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(chunk);
            u64::from_le_bytes(bytes)
        });
        if uncompressed == u32::MAX {
            fields.next();
        }
        if compressed == u32::MAX {
            if let Some(size) = fields.next() {
                header.compressed_size = size;
            }
        }
    }
    Ok(Some(header))
}

fn find_extra(mut extra: &[u8], id: u16) -> Option<&[u8]> {
    while extra.len() >= 4 {
        let field_id = u16::from_le_bytes([extra[0], extra[1]]);
        let size = u16::from_le_bytes([extra[2], extra[3]]) as usize;
        let data = extra.get(4..4 + size)?;
        if field_id == id {
            return Some(data);
        }
        extra = &extra[4 + size..];
    }
    None
}

/// Data descriptor: optional signature, crc, then compressed and uncompressed sizes
fn skip_data_descriptor<R: Read>(reader: &mut R, zip64: bool) -> io::Result<()> {
    if read_u32(reader)? == DATA_DESCRIPTOR_SIG {
        read_u32(reader)?;
    }
    skip(reader, if zip64 { 16 } else { 8 })
}

fn skip<R: Read>(reader: &mut R, len: u64) -> io::Result<()> {
    let skipped = io::copy(&mut reader.by_ref().take(len), &mut io::sink())?;
    if skipped < len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "Zip archive is truncated",
        ));
    }
    Ok(())
}

fn read_u32<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut bytes = [0u8; 4];
    reader.read_exact(&mut bytes)?;
    Ok(u32::from_le_bytes(bytes))
}

fn invalid_data(message: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message.into())
}
