use nom::combinator::map;
use nom::sequence::tuple;
use nom::IResult;

use crate::parser::primitives::{parse_c_string, parse_u32, parse_u64, DecodeFail};

/// Leading segment of an hprof stream: format banner, identifier width in
/// bytes, and the capture wall-clock time in milliseconds since the epoch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    pub format: String,
    pub identifier_size: u32,
    pub timestamp_ms: u64,
}

pub fn parse_file_header(i: &[u8]) -> IResult<&[u8], FileHeader, DecodeFail> {
    map(
        tuple((parse_c_string, parse_u32, parse_u64)),
        |(format, identifier_size, timestamp_ms)| FileHeader {
            format: String::from_utf8_lossy(format).to_string(),
            identifier_size,
            timestamp_ms,
        },
    )(i)
}
