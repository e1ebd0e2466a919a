//! Streaming decoder for the binary hprof heap-profile format.
//!
//! The decoder reads the length-prefixed, tagged record stream produced by
//! the JVM's heap profiler and delivers every record as a typed callback to
//! a [`RecordHandler`]. Identifier width (4 or 8 bytes) is taken from the
//! file header and applied to every identifier field thereafter. Heap-dump
//! containers are decoded incrementally, so arbitrarily large dumps never
//! need to fit in memory.
//!
//! ```no_run
//! use hprof_stream::{parse_file, NullHandler};
//!
//! parse_file("heap.hprof", NullHandler)?;
//! # Ok::<(), hprof_stream::HprofError>(())
//! ```

pub mod errors;
pub mod handler;
pub mod handlers;
pub mod parser;
pub mod utils;

pub use errors::{FormatCause, HprofError};
pub use handler::{Abort, HandlerResult, NullHandler, RecordHandler};
pub use parser::header::FileHeader;
pub use parser::stream::{parse_file, parse_reader, HprofReader};
