use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use crate::errors::HprofError;
use crate::handler::RecordHandler;
use crate::parser::header::parse_file_header;
use crate::parser::record_parser::HprofDecoder;

/// Default refill size. Larger buffers trade memory for fewer refill cycles.
const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Drives an [`HprofDecoder`] over a byte source: decode what the buffer
/// holds, drain the consumed prefix, refill by at least what the decoder
/// asked for, repeat until EOF.
pub struct HprofReader<R, H> {
    reader: R,
    handler: H,
    chunk_size: usize,
    decode_instance_fields: bool,
}

impl<R: Read, H: RecordHandler> HprofReader<R, H> {
    pub fn new(reader: R, handler: H) -> Self {
        HprofReader {
            reader,
            handler,
            chunk_size: DEFAULT_CHUNK_SIZE,
            decode_instance_fields: false,
        }
    }

    /// Decode instance-dump field bytes against observed class dumps instead
    /// of delivering them raw.
    pub fn decode_instance_fields(mut self, enabled: bool) -> Self {
        self.decode_instance_fields = enabled;
        self
    }

    pub fn chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes.max(1);
        self
    }

    /// Parse the stream to EOF and hand the handler back. Clean EOF is only
    /// legal at a frame boundary with no open heap-dump container.
    pub fn run(self) -> Result<H, HprofError> {
        let HprofReader {
            mut reader,
            handler,
            chunk_size,
            decode_instance_fields,
        } = self;
        let mut buffer: Vec<u8> = Vec::new();
        let mut eof = false;

        let (header, header_len) = loop {
            match parse_file_header(&buffer) {
                Ok((rest, header)) => {
                    let consumed = buffer.len() - rest.len();
                    buffer.drain(..consumed);
                    break (header, consumed);
                }
                Err(_) if eof => {
                    return Err(HprofError::TruncatedStream {
                        offset: buffer.len() as u64,
                    });
                }
                Err(_) => {
                    eof = fill(&mut reader, &mut buffer, chunk_size, 1)?;
                }
            }
        };

        let mut decoder =
            HprofDecoder::new(&header, header_len as u64, decode_instance_fields, handler)?;
        decoder.emit_header(&header)?;

        loop {
            let progress = decoder.decode_chunk(&buffer)?;
            buffer.drain(..progress.consumed);
            if eof {
                if buffer.is_empty() && !decoder.in_heap_dump() {
                    return Ok(decoder.into_handler());
                }
                return Err(HprofError::TruncatedStream {
                    offset: decoder.offset() + buffer.len() as u64,
                });
            }
            eof = fill(&mut reader, &mut buffer, chunk_size, progress.needed.max(1))?;
        }
    }
}

/// Append at least `at_least` bytes to `buffer`, or less if the source ends.
/// Returns true once the source reports EOF.
fn fill<R: Read>(
    reader: &mut R,
    buffer: &mut Vec<u8>,
    chunk_size: usize,
    at_least: usize,
) -> Result<bool, HprofError> {
    let mut scratch = vec![0u8; chunk_size.max(at_least)];
    let mut added = 0;
    while added < at_least {
        match reader.read(&mut scratch) {
            Ok(0) => return Ok(true),
            Ok(n) => {
                buffer.extend_from_slice(&scratch[..n]);
                added += n;
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(HprofError::Io(e)),
        }
    }
    Ok(false)
}

/// Parse a complete hprof stream from any byte source.
pub fn parse_reader<R: Read, H: RecordHandler>(reader: R, handler: H) -> Result<H, HprofError> {
    HprofReader::new(reader, handler).run()
}

/// Open `path`, parse it to EOF, and return the handler.
pub fn parse_file<H: RecordHandler>(path: impl AsRef<Path>, handler: H) -> Result<H, HprofError> {
    let file = File::open(path)?;
    parse_reader(BufReader::new(file), handler)
}
