use nom::combinator::map;
use nom::error::{ErrorKind, ParseError};
use nom::sequence::terminated;
use nom::{bytes, number, IResult};

use crate::errors::FormatCause;

/// Identifier width declared by the file header. Fixed once per stream and
/// threaded through every parser that reads an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdSize {
    Four,
    Eight,
}

impl IdSize {
    pub fn from_header(raw: u32) -> Option<IdSize> {
        match raw {
            4 => Some(IdSize::Four),
            8 => Some(IdSize::Eight),
            _ => None,
        }
    }

    pub const fn in_bytes(self) -> u32 {
        match self {
            IdSize::Four => 4,
            IdSize::Eight => 8,
        }
    }
}

/// Parse-level failure. `remaining` is the unconsumed input length at the
/// failure site, from which the decoder computes an absolute byte offset.
#[derive(Debug, PartialEq)]
pub struct DecodeFail {
    pub cause: Option<FormatCause>,
    pub remaining: usize,
}

impl DecodeFail {
    pub(crate) fn failure(input: &[u8], cause: FormatCause) -> nom::Err<DecodeFail> {
        nom::Err::Failure(DecodeFail {
            cause: Some(cause),
            remaining: input.len(),
        })
    }
}

impl<'a> ParseError<&'a [u8]> for DecodeFail {
    fn from_error_kind(input: &'a [u8], _kind: ErrorKind) -> Self {
        DecodeFail {
            cause: None,
            remaining: input.len(),
        }
    }

    fn append(_input: &'a [u8], _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

pub fn parse_c_string(i: &[u8]) -> IResult<&[u8], &[u8], DecodeFail> {
    terminated(
        bytes::streaming::take_until("\0"),
        bytes::streaming::tag("\0"),
    )(i)
}

pub fn parse_u8(i: &[u8]) -> IResult<&[u8], u8, DecodeFail> {
    number::streaming::be_u8(i)
}

pub fn parse_i8(i: &[u8]) -> IResult<&[u8], i8, DecodeFail> {
    number::streaming::be_i8(i)
}

pub fn parse_u16(i: &[u8]) -> IResult<&[u8], u16, DecodeFail> {
    number::streaming::be_u16(i)
}

pub fn parse_i16(i: &[u8]) -> IResult<&[u8], i16, DecodeFail> {
    number::streaming::be_i16(i)
}

pub fn parse_u32(i: &[u8]) -> IResult<&[u8], u32, DecodeFail> {
    number::streaming::be_u32(i)
}

pub fn parse_i32(i: &[u8]) -> IResult<&[u8], i32, DecodeFail> {
    number::streaming::be_i32(i)
}

pub fn parse_u64(i: &[u8]) -> IResult<&[u8], u64, DecodeFail> {
    number::streaming::be_u64(i)
}

pub fn parse_i64(i: &[u8]) -> IResult<&[u8], i64, DecodeFail> {
    number::streaming::be_i64(i)
}

pub fn parse_f32(i: &[u8]) -> IResult<&[u8], f32, DecodeFail> {
    number::streaming::be_f32(i)
}

pub fn parse_f64(i: &[u8]) -> IResult<&[u8], f64, DecodeFail> {
    number::streaming::be_f64(i)
}

pub fn parse_bool(i: &[u8]) -> IResult<&[u8], bool, DecodeFail> {
    map(parse_u8, |b| b != 0)(i)
}

/// Read one identifier at the stream's declared width, zero-extended to u64.
pub fn parse_id(id_size: IdSize) -> impl Fn(&[u8]) -> IResult<&[u8], u64, DecodeFail> {
    move |i| match id_size {
        IdSize::Four => map(parse_u32, u64::from)(i),
        IdSize::Eight => parse_u64(i),
    }
}
