use nom::combinator::{map, rest};
use nom::multi::count;
use nom::sequence::tuple;
use nom::{bytes, IResult, Needed};
use tracing::debug;

use crate::errors::{FormatCause, HprofError};
use crate::handler::{HandlerResult, RecordHandler};
use crate::parser::header::FileHeader;
use crate::parser::heap::{HeapRecord, InstanceFields};
use crate::parser::heap_parser::{parse_heap_record, ClassIndex, TAG_INSTANCE_DUMP};
use crate::parser::primitives::*;
use crate::parser::record::{AllocSite, CpuSample, Id, RecordHeader, Serial};

const TAG_STRING: u8 = 0x01;
const TAG_LOAD_CLASS: u8 = 0x02;
const TAG_UNLOAD_CLASS: u8 = 0x03;
const TAG_STACK_FRAME: u8 = 0x04;
const TAG_STACK_TRACE: u8 = 0x05;
const TAG_ALLOC_SITES: u8 = 0x06;
const TAG_HEAP_SUMMARY: u8 = 0x07;
const TAG_START_THREAD: u8 = 0x0A;
const TAG_END_THREAD: u8 = 0x0B;
const TAG_HEAP_DUMP: u8 = 0x0C;
const TAG_CPU_SAMPLES: u8 = 0x0D;
const TAG_CONTROL_SETTINGS: u8 = 0x0E;
const TAG_HEAP_DUMP_SEGMENT: u8 = 0x1C;
const TAG_HEAP_DUMP_END: u8 = 0x2C;

/// tag + ts-delta + body-length
const FRAME_HEADER_LEN: u64 = 9;

/// Outcome of one `decode_chunk` call: how many buffer bytes were consumed
/// and the minimum number of additional bytes required to make progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub consumed: usize,
    pub needed: usize,
}

#[derive(Debug, Clone, Copy)]
struct Container {
    tag: u8,
    remaining: u32,
}

enum Step<'a> {
    Consumed(&'a [u8]),
    More(usize),
}

fn needed_bytes(needed: Needed) -> usize {
    match needed {
        Needed::Size(n) => n.get(),
        Needed::Unknown => 1,
    }
}

/// Incremental hprof record decoder. Feed it buffers via [`decode_chunk`];
/// every completed record is dispatched to the handler before the call
/// returns. The decoder tracks the absolute stream offset for error
/// reporting and the remaining byte count of an open heap-dump container.
///
/// [`decode_chunk`]: HprofDecoder::decode_chunk
pub struct HprofDecoder<H> {
    handler: H,
    id_size: IdSize,
    offset: u64,
    container: Option<Container>,
    classes: Option<ClassIndex>,
}

impl<H: RecordHandler> HprofDecoder<H> {
    /// `start_offset` is the number of stream bytes already consumed by the
    /// file header. `decode_instance_fields` selects the eager strategy:
    /// instance-dump field bytes are decoded against observed class dumps
    /// instead of being delivered raw.
    pub fn new(
        header: &FileHeader,
        start_offset: u64,
        decode_instance_fields: bool,
        handler: H,
    ) -> Result<Self, HprofError> {
        let id_size = IdSize::from_header(header.identifier_size)
            .ok_or(HprofError::UnsupportedIdSize(header.identifier_size))?;
        Ok(HprofDecoder {
            handler,
            id_size,
            offset: start_offset,
            container: None,
            classes: decode_instance_fields.then(ClassIndex::default),
        })
    }

    pub fn emit_header(&mut self, header: &FileHeader) -> Result<(), HprofError> {
        self.emit(|h| h.header(&header.format, header.identifier_size, header.timestamp_ms))
    }

    /// Absolute stream offset of the next byte to decode.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// True while a heap-dump container still has sub-record bytes pending.
    /// EOF in this state is a truncation, not a clean end of stream.
    pub fn in_heap_dump(&self) -> bool {
        self.container.is_some()
    }

    pub fn into_handler(self) -> H {
        self.handler
    }

    /// Decode as many complete records as `buf` holds, dispatching each to
    /// the handler. Stops at the first record that does not fit entirely in
    /// the buffer and reports how much input it needs to continue.
    pub fn decode_chunk(&mut self, buf: &[u8]) -> Result<Progress, HprofError> {
        let mut i = buf;
        loop {
            let step = match self.container {
                Some(container) => self.decode_heap_record(i, container)?,
                None => self.decode_frame(i)?,
            };
            match step {
                Step::Consumed(rest) => i = rest,
                Step::More(needed) => {
                    return Ok(Progress {
                        consumed: buf.len() - i.len(),
                        needed,
                    });
                }
            }
        }
    }

    fn decode_frame<'a>(&mut self, i: &'a [u8]) -> Result<Step<'a>, HprofError> {
        let (r, (tag, header)) = match tuple((parse_u8, parse_record_header))(i) {
            Ok(v) => v,
            Err(nom::Err::Incomplete(n)) => return Ok(Step::More(needed_bytes(n))),
            // fixed-width reads only fail by running out of input
            Err(_) => return Ok(Step::More(1)),
        };
        let length = header.length;
        match tag {
            TAG_HEAP_DUMP | TAG_HEAP_DUMP_SEGMENT => {
                self.offset += FRAME_HEADER_LEN;
                if tag == TAG_HEAP_DUMP {
                    self.emit(|h| h.heap_dump())?;
                } else {
                    self.emit(|h| h.heap_dump_segment())?;
                }
                if length == 0 {
                    self.emit(|h| h.heap_dump_end())?;
                } else {
                    self.container = Some(Container {
                        tag,
                        remaining: length,
                    });
                }
                Ok(Step::Consumed(r))
            }
            TAG_HEAP_DUMP_END => match bytes::streaming::take::<_, _, DecodeFail>(length)(r) {
                Ok((r, _)) => {
                    self.offset += FRAME_HEADER_LEN + u64::from(length);
                    self.emit(|h| h.heap_dump_end())?;
                    Ok(Step::Consumed(r))
                }
                Err(nom::Err::Incomplete(n)) => Ok(Step::More(needed_bytes(n))),
                Err(_) => Ok(Step::More(1)),
            },
            _ => match bytes::streaming::take::<_, _, DecodeFail>(length)(r) {
                Ok((r, body)) => {
                    self.decode_body(tag, length, body)?;
                    self.offset += FRAME_HEADER_LEN + u64::from(length);
                    Ok(Step::Consumed(r))
                }
                Err(nom::Err::Incomplete(n)) => Ok(Step::More(needed_bytes(n))),
                Err(_) => Ok(Step::More(1)),
            },
        }
    }

    /// Decode one record body against its bounded slice and dispatch it. The
    /// declared length is authoritative: the body parser must consume the
    /// slice exactly.
    fn decode_body(&mut self, tag: u8, declared: u32, body: &[u8]) -> Result<(), HprofError> {
        let id_size = self.id_size;
        match tag {
            TAG_STRING => self.run_body(
                tag,
                declared,
                body,
                parse_utf8_string(id_size),
                |h: &mut H, (id, value): (Id, String)| h.utf8_string(id, &value),
            ),
            TAG_LOAD_CLASS => self.run_body(
                tag,
                declared,
                body,
                tuple((parse_u32, parse_id(id_size), parse_u32, parse_id(id_size))),
                |h: &mut H, (class_serial, class_object_id, stack_trace_serial, class_name_id)| {
                    h.load_class(
                        class_serial,
                        class_object_id,
                        stack_trace_serial,
                        class_name_id,
                    )
                },
            ),
            TAG_UNLOAD_CLASS => self.run_body(tag, declared, body, parse_u32, |h: &mut H, class_serial| {
                h.unload_class(class_serial)
            }),
            TAG_STACK_FRAME => self.run_body(
                tag,
                declared,
                body,
                tuple((
                    parse_id(id_size),
                    parse_id(id_size),
                    parse_id(id_size),
                    parse_id(id_size),
                    parse_u32,
                    parse_i32,
                )),
                |h: &mut H,
                 (
                    frame_id,
                    method_name_id,
                    method_signature_id,
                    source_file_name_id,
                    class_serial,
                    line,
                )| {
                    h.stack_frame(
                        frame_id,
                        method_name_id,
                        method_signature_id,
                        source_file_name_id,
                        class_serial,
                        line,
                    )
                },
            ),
            TAG_STACK_TRACE => self.run_body(
                tag,
                declared,
                body,
                parse_stack_trace(id_size),
                |h: &mut H, (stack_trace_serial, thread_serial, frame_ids): (_, _, Vec<Id>)| {
                    h.stack_trace(stack_trace_serial, thread_serial, &frame_ids)
                },
            ),
            TAG_ALLOC_SITES => self.run_body(
                tag,
                declared,
                body,
                parse_alloc_sites,
                |h: &mut H,
                 (
                    flags,
                    cutoff_ratio,
                    total_live_bytes,
                    total_live_instances,
                    total_bytes_allocated,
                    total_instances_allocated,
                    sites,
                ): (_, _, _, _, _, _, Vec<AllocSite>)| {
                    h.alloc_sites(
                        flags,
                        cutoff_ratio,
                        total_live_bytes,
                        total_live_instances,
                        total_bytes_allocated,
                        total_instances_allocated,
                        &sites,
                    )
                },
            ),
            TAG_HEAP_SUMMARY => self.run_body(
                tag,
                declared,
                body,
                tuple((parse_u32, parse_u32, parse_u64, parse_u64)),
                |h: &mut H, (live_bytes, live_instances, bytes_allocated, instances_allocated)| {
                    h.heap_summary(live_bytes, live_instances, bytes_allocated, instances_allocated)
                },
            ),
            TAG_START_THREAD => self.run_body(
                tag,
                declared,
                body,
                tuple((
                    parse_u32,
                    parse_id(id_size),
                    parse_u32,
                    parse_id(id_size),
                    parse_id(id_size),
                    parse_id(id_size),
                )),
                |h: &mut H,
                 (
                    thread_serial,
                    thread_object_id,
                    stack_trace_serial,
                    thread_name_id,
                    thread_group_name_id,
                    thread_group_parent_name_id,
                )| {
                    h.start_thread(
                        thread_serial,
                        thread_object_id,
                        stack_trace_serial,
                        thread_name_id,
                        thread_group_name_id,
                        thread_group_parent_name_id,
                    )
                },
            ),
            TAG_END_THREAD => self.run_body(tag, declared, body, parse_u32, |h: &mut H, thread_serial| {
                h.end_thread(thread_serial)
            }),
            TAG_CPU_SAMPLES => self.run_body(
                tag,
                declared,
                body,
                parse_cpu_samples,
                |h: &mut H, (total_samples, samples): (u32, Vec<CpuSample>)| {
                    h.cpu_samples(total_samples, &samples)
                },
            ),
            TAG_CONTROL_SETTINGS => self.run_body(
                tag,
                declared,
                body,
                tuple((parse_u32, parse_u16)),
                |h: &mut H, (flags, stack_trace_depth)| {
                    h.control_settings(flags, stack_trace_depth)
                },
            ),
            _ => {
                // Forward compatibility: vendors extend the tag space, and
                // the declared length makes the body skippable.
                debug!(tag, length = declared, "skipping unknown top-level record");
                Ok(())
            }
        }
    }

    fn run_body<'a, T>(
        &mut self,
        tag: u8,
        declared: u32,
        body: &'a [u8],
        mut parser: impl FnMut(&'a [u8]) -> IResult<&'a [u8], T, DecodeFail>,
        deliver: impl FnOnce(&mut H, T) -> HandlerResult,
    ) -> Result<(), HprofError> {
        let body_offset = self.offset + FRAME_HEADER_LEN;
        match parser(body) {
            Ok((rest, value)) => {
                if !rest.is_empty() {
                    let consumed = (body.len() - rest.len()) as u64;
                    return Err(HprofError::Format {
                        tag,
                        offset: body_offset + consumed,
                        cause: FormatCause::FrameLengthMismatch { declared, consumed },
                    });
                }
                deliver(&mut self.handler, value)
                    .map_err(|abort| HprofError::HandlerAbort {
                        reason: abort.reason,
                    })
            }
            Err(nom::Err::Incomplete(n)) => Err(HprofError::Format {
                tag,
                offset: body_offset + u64::from(declared),
                cause: FormatCause::FrameLengthMismatch {
                    declared,
                    consumed: u64::from(declared) + needed_bytes(n) as u64,
                },
            }),
            Err(nom::Err::Error(fail)) | Err(nom::Err::Failure(fail)) => {
                Err(body_error(tag, body_offset, body.len(), fail))
            }
        }
    }

    fn decode_heap_record<'a>(
        &mut self,
        i: &'a [u8],
        container: Container,
    ) -> Result<Step<'a>, HprofError> {
        let start_len = i.len();
        match parse_heap_record(self.id_size)(i) {
            Ok((rest, record)) => {
                let consumed = (start_len - rest.len()) as u64;
                if consumed > u64::from(container.remaining) {
                    return Err(HprofError::Format {
                        tag: container.tag,
                        offset: self.offset,
                        cause: FormatCause::FrameLengthMismatch {
                            declared: container.remaining,
                            consumed,
                        },
                    });
                }
                let record_offset = self.offset;
                self.offset += consumed;
                let remaining = container.remaining - consumed as u32;
                self.container = Some(Container {
                    tag: container.tag,
                    remaining,
                });
                self.dispatch_heap(record, record_offset)?;
                if remaining == 0 {
                    self.container = None;
                    self.emit(|h| h.heap_dump_end())?;
                }
                Ok(Step::Consumed(rest))
            }
            Err(nom::Err::Incomplete(n)) => Ok(Step::More(needed_bytes(n))),
            Err(nom::Err::Error(fail)) | Err(nom::Err::Failure(fail)) => {
                Err(body_error(container.tag, self.offset, start_len, fail))
            }
        }
    }

    fn dispatch_heap(&mut self, record: HeapRecord, record_offset: u64) -> Result<(), HprofError> {
        match record {
            HeapRecord::RootUnknown { object_id } => self.emit(|h| h.root_unknown(object_id)),
            HeapRecord::RootJniGlobal {
                object_id,
                jni_global_ref_id,
            } => self.emit(|h| h.root_jni_global(object_id, jni_global_ref_id)),
            HeapRecord::RootJniLocal {
                object_id,
                thread_serial,
                frame_index,
            } => self.emit(|h| h.root_jni_local(object_id, thread_serial, frame_index)),
            HeapRecord::RootJavaFrame {
                object_id,
                thread_serial,
                frame_index,
            } => self.emit(|h| h.root_java_frame(object_id, thread_serial, frame_index)),
            HeapRecord::RootNativeStack {
                object_id,
                thread_serial,
            } => self.emit(|h| h.root_native_stack(object_id, thread_serial)),
            HeapRecord::RootStickyClass { object_id } => {
                self.emit(|h| h.root_sticky_class(object_id))
            }
            HeapRecord::RootThreadBlock {
                object_id,
                thread_serial,
            } => self.emit(|h| h.root_thread_block(object_id, thread_serial)),
            HeapRecord::RootMonitorUsed { object_id } => {
                self.emit(|h| h.root_monitor_used(object_id))
            }
            HeapRecord::RootThreadObject {
                thread_object_id,
                thread_serial,
                stack_trace_serial,
            } => self.emit(|h| h.root_thread_object(thread_object_id, thread_serial, stack_trace_serial)),
            HeapRecord::Class(class) => {
                if let Some(index) = self.classes.as_mut() {
                    index.record(&class);
                }
                self.emit(|h| h.class_dump(&class))
            }
            HeapRecord::Instance(mut instance) => {
                if let Some(index) = self.classes.as_mut() {
                    if let InstanceFields::Raw(raw) = &instance.fields {
                        let decoded = index
                            .decode_fields(instance.class_object_id, raw, self.id_size)
                            .map_err(|cause| HprofError::Format {
                                tag: TAG_INSTANCE_DUMP,
                                offset: record_offset,
                                cause,
                            })?;
                        instance.fields = InstanceFields::Decoded(decoded);
                    }
                }
                self.emit(|h| h.instance_dump(&instance))
            }
            HeapRecord::ObjectArray(array) => self.emit(|h| h.object_array_dump(&array)),
            HeapRecord::PrimitiveArray(array) => self.emit(|h| h.primitive_array_dump(&array)),
        }
    }

    fn emit(&mut self, callback: impl FnOnce(&mut H) -> HandlerResult) -> Result<(), HprofError> {
        callback(&mut self.handler).map_err(|abort| HprofError::HandlerAbort {
            reason: abort.reason,
        })
    }
}

fn body_error(tag: u8, base_offset: u64, input_len: usize, fail: DecodeFail) -> HprofError {
    HprofError::Format {
        tag,
        offset: base_offset + (input_len - fail.remaining) as u64,
        cause: fail.cause.unwrap_or(FormatCause::Malformed),
    }
}

fn parse_record_header(i: &[u8]) -> IResult<&[u8], RecordHeader, DecodeFail> {
    map(tuple((parse_u32, parse_u32)), |(ts_delta_micros, length)| {
        RecordHeader {
            ts_delta_micros,
            length,
        }
    })(i)
}

fn parse_utf8_string(
    id_size: IdSize,
) -> impl FnMut(&[u8]) -> IResult<&[u8], (Id, String), DecodeFail> {
    move |i| {
        map(tuple((parse_id(id_size), rest)), |(id, payload): (_, &[u8])| {
            (id, String::from_utf8_lossy(payload).to_string())
        })(i)
    }
}

fn parse_stack_trace(
    id_size: IdSize,
) -> impl FnMut(&[u8]) -> IResult<&[u8], (Serial, Serial, Vec<Id>), DecodeFail> {
    move |i| {
        let (r, (stack_trace_serial, thread_serial, frame_count)) =
            tuple((parse_u32, parse_u32, parse_u32))(i)?;
        let (r, frame_ids) = count(parse_id(id_size), frame_count as usize)(r)?;
        Ok((r, (stack_trace_serial, thread_serial, frame_ids)))
    }
}

type AllocSitesBody = (u16, f32, u32, u32, u64, u64, Vec<AllocSite>);

fn parse_alloc_sites(i: &[u8]) -> IResult<&[u8], AllocSitesBody, DecodeFail> {
    let (
        r,
        (
            flags,
            cutoff_ratio,
            total_live_bytes,
            total_live_instances,
            total_bytes_allocated,
            total_instances_allocated,
            site_count,
        ),
    ) = tuple((
        parse_u16, parse_f32, parse_u32, parse_u32, parse_u64, parse_u64, parse_u32,
    ))(i)?;
    let (r, sites) = count(parse_alloc_site, site_count as usize)(r)?;
    Ok((
        r,
        (
            flags,
            cutoff_ratio,
            total_live_bytes,
            total_live_instances,
            total_bytes_allocated,
            total_instances_allocated,
            sites,
        ),
    ))
}

fn parse_alloc_site(i: &[u8]) -> IResult<&[u8], AllocSite, DecodeFail> {
    map(
        tuple((
            parse_u8, parse_u32, parse_u32, parse_u32, parse_u32, parse_u32, parse_u32,
        )),
        |(
            is_array,
            class_serial,
            stack_trace_serial,
            live_bytes,
            live_instances,
            bytes_allocated,
            instances_allocated,
        )| AllocSite {
            is_array,
            class_serial,
            stack_trace_serial,
            live_bytes,
            live_instances,
            bytes_allocated,
            instances_allocated,
        },
    )(i)
}

fn parse_cpu_samples(i: &[u8]) -> IResult<&[u8], (u32, Vec<CpuSample>), DecodeFail> {
    let (r, (total_samples, trace_count)) = tuple((parse_u32, parse_u32))(i)?;
    let (r, samples) = count(parse_cpu_sample, trace_count as usize)(r)?;
    Ok((r, (total_samples, samples)))
}

fn parse_cpu_sample(i: &[u8]) -> IResult<&[u8], CpuSample, DecodeFail> {
    map(
        tuple((parse_u32, parse_u32)),
        |(sample_count, stack_trace_serial)| CpuSample {
            sample_count,
            stack_trace_serial,
        },
    )(i)
}
