//! Decompression dispatch.
//!
//! Turns a raw byte stream into a UTF-8 character stream ready for line
//! splitting: first the declared compression is undone, then the declared
//! charset is transcoded. Columnar sources never come through here.

use crate::spec::Compression;
use encoding_rs::Encoding;
use encoding_rs_io::DecodeReaderBytesBuilder;
use ingest_sdk::{LoadError, Result};
use std::io::{Cursor, Read};
use tracing::debug;

mod archive;

pub use archive::ZipEntries;

/// An open, readable stream of raw bytes.
pub type ByteStream = Box<dyn Read + Send>;

/// A stream of UTF-8 encoded text.
pub type CharStream = Box<dyn Read + Send>;

/// Wrap `input` in the decoder registered under `name`.
///
/// `name` is a canonical compression identifier (see [`Compression::name`]).
/// Identifiers without a decoder fail with [`LoadError::Unsupported`].
pub fn create_decoder(name: &str, input: ByteStream) -> Result<ByteStream> {
    let decoder: ByteStream = match name {
        "gz" => Box::new(flate2::read::MultiGzDecoder::new(input)),
        "bzip2" => Box::new(bzip2::read::MultiBzDecoder::new(input)),
        "xz" => Box::new(xz2::read::XzDecoder::new_multi_decoder(input)),
        "lzma" => {
            let stream = xz2::stream::Stream::new_lzma_decoder(u64::MAX)
                .map_err(|e| LoadError::init_with("Failed to create lzma decoder", e))?;
            Box::new(xz2::read::XzDecoder::new_stream(input, stream))
        }
        "snappy-framed" => Box::new(snap::read::FrameDecoder::new(input)),
        // Raw snappy has no framing, the block must be decoded as a whole
        "snappy-raw" => Box::new(Cursor::new(decompress_raw_snappy(input)?)),
        "deflate" => Box::new(flate2::read::ZlibDecoder::new(input)),
        "zip" => Box::new(ZipEntries::new(input)),
        other => {
            return Err(LoadError::Unsupported(format!(
                "Unsupported compression '{}'",
                other
            )))
        }
    };
    Ok(decoder)
}

/// Fails when `compression` can only be read by the columnar reader.
pub fn ensure_line_oriented(compression: Compression) -> Result<()> {
    if compression.is_columnar() {
        return Err(LoadError::Unsupported(format!(
            "Compression '{}' must be loaded by the columnar reader instead of a line reader",
            compression
        )));
    }
    Ok(())
}

/// Build the character stream for a line-oriented source.
///
/// On failure `input` is dropped, which closes it.
pub fn decode(compression: Compression, charset: &str, input: ByteStream) -> Result<CharStream> {
    ensure_line_oriented(compression)?;
    let encoding = lookup_charset(charset)?;

    let bytes = match compression {
        Compression::None => input,
        other => create_decoder(other.name(), input)?,
    };
    debug!(
        compression = %compression,
        charset = encoding.name(),
        "Created decoder"
    );

    Ok(Box::new(
        DecodeReaderBytesBuilder::new()
            .encoding(Some(encoding))
            .strip_bom(true)
            .build(bytes),
    ))
}

fn lookup_charset(charset: &str) -> Result<&'static Encoding> {
    Encoding::for_label(charset.trim().as_bytes())
        .ok_or_else(|| LoadError::Unsupported(format!("Unsupported charset '{}'", charset)))
}

fn decompress_raw_snappy(mut input: ByteStream) -> Result<Vec<u8>> {
    let mut compressed = Vec::new();
    input
        .read_to_end(&mut compressed)
        .map_err(|e| LoadError::io("Failed to read snappy block", e))?;
    snap::raw::Decoder::new()
        .decompress_vec(&compressed)
        .map_err(|e| LoadError::init_with("Failed to decompress snappy block", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const TEXT: &str = "marko,29,Beijing\nvadas,27,Hongkong\n";

    fn stream(data: Vec<u8>) -> ByteStream {
        Box::new(Cursor::new(data))
    }

    fn decode_to_string(compression: Compression, charset: &str, data: Vec<u8>) -> String {
        let mut out = String::new();
        decode(compression, charset, stream(data))
            .unwrap()
            .read_to_string(&mut out)
            .unwrap();
        out
    }

    #[test]
    fn passes_uncompressed_text_through() {
        assert_eq!(
            decode_to_string(Compression::None, "UTF-8", TEXT.as_bytes().to_vec()),
            TEXT
        );
    }

    #[test]
    fn decodes_gzip() {
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(TEXT.as_bytes()).unwrap();
        let data = encoder.finish().unwrap();
        assert_eq!(decode_to_string(Compression::Gzip, "UTF-8", data), TEXT);
    }

    #[test]
    fn decodes_deflate() {
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(TEXT.as_bytes()).unwrap();
        let data = encoder.finish().unwrap();
        assert_eq!(decode_to_string(Compression::Deflate, "UTF-8", data), TEXT);
    }

    #[test]
    fn decodes_bzip2() {
        let mut encoder =
            bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
        encoder.write_all(TEXT.as_bytes()).unwrap();
        let data = encoder.finish().unwrap();
        assert_eq!(decode_to_string(Compression::Bzip2, "UTF-8", data), TEXT);
    }

    #[test]
    fn decodes_xz() {
        let mut encoder = xz2::write::XzEncoder::new(Vec::new(), 6);
        encoder.write_all(TEXT.as_bytes()).unwrap();
        let data = encoder.finish().unwrap();
        assert_eq!(decode_to_string(Compression::Xz, "UTF-8", data), TEXT);
    }

    #[test]
    fn decodes_lzma() {
        let options = xz2::stream::LzmaOptions::new_preset(6).unwrap();
        let stream = xz2::stream::Stream::new_lzma_encoder(&options).unwrap();
        let mut encoder = xz2::write::XzEncoder::new_stream(Vec::new(), stream);
        encoder.write_all(TEXT.as_bytes()).unwrap();
        let data = encoder.finish().unwrap();
        assert_eq!(decode_to_string(Compression::Lzma, "UTF-8", data), TEXT);
    }

    #[test]
    fn decodes_snappy() {
        let mut framed = Vec::new();
        {
            let mut encoder = snap::write::FrameEncoder::new(&mut framed);
            encoder.write_all(TEXT.as_bytes()).unwrap();
            encoder.flush().unwrap();
        }
        assert_eq!(
            decode_to_string(Compression::SnappyFramed, "UTF-8", framed),
            TEXT
        );

        let raw = snap::raw::Encoder::new()
            .compress_vec(TEXT.as_bytes())
            .unwrap();
        assert_eq!(decode_to_string(Compression::SnappyRaw, "UTF-8", raw), TEXT);
    }

    #[test]
    fn concatenates_zip_entries() {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        writer.start_file("part-0.csv", options).unwrap();
        writer.write_all(b"marko,29,Beijing\n").unwrap();
        writer.add_directory("nested/", options).unwrap();
        writer.start_file("nested/part-1.csv", options).unwrap();
        writer.write_all(b"vadas,27,Hongkong\n").unwrap();
        let data = writer.finish().unwrap().into_inner();

        assert_eq!(decode_to_string(Compression::Zip, "UTF-8", data), TEXT);
    }

    #[test]
    fn transcodes_declared_charset() {
        let (gbk, _, _) = encoding_rs::GBK.encode("张三,北京\n");
        assert_eq!(
            decode_to_string(Compression::None, "GBK", gbk.into_owned()),
            "张三,北京\n"
        );
    }

    #[test]
    fn strips_byte_order_mark() {
        let mut data = vec![0xEF, 0xBB, 0xBF];
        data.extend_from_slice(b"a,b\n");
        assert_eq!(decode_to_string(Compression::None, "UTF-8", data), "a,b\n");
    }

    #[test]
    fn rejects_columnar_compression() {
        let err = decode(Compression::Columnar, "UTF-8", stream(Vec::new())).err().unwrap();
        assert!(matches!(err, LoadError::Unsupported(ref m) if m.contains("columnar reader")));
    }

    #[test]
    fn rejects_unknown_decoder_name() {
        let err = create_decoder("pack200", stream(Vec::new())).err().unwrap();
        assert!(matches!(err, LoadError::Unsupported(ref m) if m == "Unsupported compression 'pack200'"));
    }

    #[test]
    fn rejects_unknown_charset() {
        let err = decode(Compression::None, "klingon", stream(Vec::new())).err().unwrap();
        assert!(matches!(err, LoadError::Unsupported(_)));
    }
}
