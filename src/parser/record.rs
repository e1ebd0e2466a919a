/// An identifier naming an object, class, string, thread, or stack frame.
/// Zero-extended to 64 bits when the stream declares 4-byte identifiers.
pub type Id = u64;

/// A serial number assigned by the profiler (class, thread, or stack-trace
/// numbering scope).
pub type Serial = u32;

/// Frame prefix of every top-level record: microseconds since the header
/// timestamp plus the declared body length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub ts_delta_micros: u32,
    pub length: u32,
}

/// One entry of an alloc-sites record.
#[derive(Debug, Clone, PartialEq)]
pub struct AllocSite {
    pub is_array: u8,
    pub class_serial: Serial,
    pub stack_trace_serial: Serial,
    pub live_bytes: u32,
    pub live_instances: u32,
    pub bytes_allocated: u32,
    pub instances_allocated: u32,
}

/// One entry of a CPU-samples record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuSample {
    pub sample_count: u32,
    pub stack_trace_serial: Serial,
}

/// Reserved stack-frame line numbers.
pub const LINE_UNKNOWN: i32 = -1;
pub const LINE_COMPILED: i32 = -2;
pub const LINE_NATIVE: i32 = -3;
