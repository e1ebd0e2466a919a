use thiserror::Error;

/// Reason a record body could not be decoded.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormatCause {
    /// The decoder did not consume exactly the declared number of bytes.
    #[error("declared length {declared} but decoder consumed {consumed}")]
    FrameLengthMismatch { declared: u32, consumed: u64 },

    /// A typed value carried a tag outside the basic-type enumeration.
    #[error("unknown basic type tag {0:#04x}")]
    UnknownBasicType(u8),

    /// A heap-dump container held a sub-record tag the decoder does not know.
    /// Sub-records carry no length prefix, so this cannot be skipped.
    #[error("unknown heap sub-record tag {0:#04x}")]
    UnknownHeapSubTag(u8),

    /// An instance dump referenced a class with no class dump observed so far.
    /// Only raised when instance-field decoding is enabled.
    #[error("no class dump recorded for class id {0:#x}")]
    MissingClassDump(u64),

    /// A primitive array dump declared a non-primitive element type.
    #[error("primitive array with element type tag {0:#04x}")]
    InvalidArrayElementType(u8),

    /// The body was structurally impossible to decode.
    #[error("malformed record body")]
    Malformed,
}

/// Fatal decoding errors. The parser does not recover; the first error stops
/// the stream and is returned to the caller.
#[derive(Debug, Error)]
pub enum HprofError {
    /// The byte source ended in the middle of a field or frame. `offset` is
    /// the position of the first byte that could not be obtained.
    #[error("stream truncated at offset {offset}")]
    TruncatedStream { offset: u64 },

    /// A record body violated the format. `tag` is the record (or container)
    /// tag being decoded and `offset` the failing byte position.
    #[error("malformed record {tag:#04x} at offset {offset}: {cause}")]
    Format {
        tag: u8,
        offset: u64,
        cause: FormatCause,
    },

    /// The file header declared an identifier size other than 4 or 8.
    #[error("unsupported identifier size {0} (expected 4 or 8)")]
    UnsupportedIdSize(u32),

    /// A handler callback requested termination.
    #[error("handler aborted parsing: {reason}")]
    HandlerAbort { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
