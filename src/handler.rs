//! The dispatch contract between the decoder and its consumer.
//!
//! A consumer implements [`RecordHandler`] and overrides only the callbacks
//! it cares about; every method defaults to a no-op. Callbacks are invoked
//! synchronously from the parsing thread, in stream order. Borrowed
//! arguments are valid only for the duration of the call; copy out whatever
//! must outlive it.

use crate::parser::heap::{ClassDump, InstanceDump, ObjectArrayDump, PrimitiveArrayDump};
use crate::parser::record::{AllocSite, CpuSample, Id, Serial};

/// Returned by a handler to stop parsing. Surfaces to the caller as
/// [`HprofError::HandlerAbort`](crate::errors::HprofError::HandlerAbort).
#[derive(Debug, Clone, thiserror::Error)]
#[error("{reason}")]
pub struct Abort {
    pub reason: String,
}

impl Abort {
    pub fn new(reason: impl Into<String>) -> Abort {
        Abort {
            reason: reason.into(),
        }
    }
}

pub type HandlerResult = Result<(), Abort>;

/// Typed notifications for every record kind in an hprof stream.
///
/// Instance dumps are delivered with their raw field bytes by default; when
/// the parser is constructed with instance-field decoding enabled, the bytes
/// are instead decoded against the observed class dumps (own fields first,
/// then the super-class chain) before delivery.
#[allow(unused_variables)]
pub trait RecordHandler {
    /// File header: format banner, identifier size in bytes, capture time in
    /// milliseconds since the epoch.
    fn header(&mut self, format: &str, id_size: u32, timestamp_ms: u64) -> HandlerResult {
        Ok(())
    }

    fn utf8_string(&mut self, id: Id, value: &str) -> HandlerResult {
        Ok(())
    }

    fn load_class(
        &mut self,
        class_serial: Serial,
        class_object_id: Id,
        stack_trace_serial: Serial,
        class_name_id: Id,
    ) -> HandlerResult {
        Ok(())
    }

    fn unload_class(&mut self, class_serial: Serial) -> HandlerResult {
        Ok(())
    }

    /// `line` uses the reserved negative sentinels in
    /// [`crate::parser::record`] for unknown, compiled, and native frames.
    fn stack_frame(
        &mut self,
        frame_id: Id,
        method_name_id: Id,
        method_signature_id: Id,
        source_file_name_id: Id,
        class_serial: Serial,
        line: i32,
    ) -> HandlerResult {
        Ok(())
    }

    fn stack_trace(
        &mut self,
        stack_trace_serial: Serial,
        thread_serial: Serial,
        frame_ids: &[Id],
    ) -> HandlerResult {
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn alloc_sites(
        &mut self,
        flags: u16,
        cutoff_ratio: f32,
        total_live_bytes: u32,
        total_live_instances: u32,
        total_bytes_allocated: u64,
        total_instances_allocated: u64,
        sites: &[AllocSite],
    ) -> HandlerResult {
        Ok(())
    }

    fn heap_summary(
        &mut self,
        total_live_bytes: u32,
        total_live_instances: u32,
        total_bytes_allocated: u64,
        total_instances_allocated: u64,
    ) -> HandlerResult {
        Ok(())
    }

    fn start_thread(
        &mut self,
        thread_serial: Serial,
        thread_object_id: Id,
        stack_trace_serial: Serial,
        thread_name_id: Id,
        thread_group_name_id: Id,
        thread_group_parent_name_id: Id,
    ) -> HandlerResult {
        Ok(())
    }

    fn end_thread(&mut self, thread_serial: Serial) -> HandlerResult {
        Ok(())
    }

    /// A heap-dump container opened (tag `0x0C`).
    fn heap_dump(&mut self) -> HandlerResult {
        Ok(())
    }

    /// A heap-dump segment container opened (tag `0x1C`).
    fn heap_dump_segment(&mut self) -> HandlerResult {
        Ok(())
    }

    /// A container's sub-records were fully consumed, or an explicit
    /// heap-dump-end record (tag `0x2C`) appeared.
    fn heap_dump_end(&mut self) -> HandlerResult {
        Ok(())
    }

    fn cpu_samples(&mut self, total_samples: u32, samples: &[CpuSample]) -> HandlerResult {
        Ok(())
    }

    fn control_settings(&mut self, flags: u32, stack_trace_depth: u16) -> HandlerResult {
        Ok(())
    }

    fn root_unknown(&mut self, object_id: Id) -> HandlerResult {
        Ok(())
    }

    fn root_jni_global(&mut self, object_id: Id, jni_global_ref_id: Id) -> HandlerResult {
        Ok(())
    }

    fn root_jni_local(
        &mut self,
        object_id: Id,
        thread_serial: Serial,
        frame_index: u32,
    ) -> HandlerResult {
        Ok(())
    }

    fn root_java_frame(
        &mut self,
        object_id: Id,
        thread_serial: Serial,
        frame_index: u32,
    ) -> HandlerResult {
        Ok(())
    }

    fn root_native_stack(&mut self, object_id: Id, thread_serial: Serial) -> HandlerResult {
        Ok(())
    }

    fn root_sticky_class(&mut self, object_id: Id) -> HandlerResult {
        Ok(())
    }

    fn root_thread_block(&mut self, object_id: Id, thread_serial: Serial) -> HandlerResult {
        Ok(())
    }

    fn root_monitor_used(&mut self, object_id: Id) -> HandlerResult {
        Ok(())
    }

    fn root_thread_object(
        &mut self,
        thread_object_id: Id,
        thread_serial: Serial,
        stack_trace_serial: Serial,
    ) -> HandlerResult {
        Ok(())
    }

    fn class_dump(&mut self, class: &ClassDump) -> HandlerResult {
        Ok(())
    }

    fn instance_dump(&mut self, instance: &InstanceDump) -> HandlerResult {
        Ok(())
    }

    fn object_array_dump(&mut self, array: &ObjectArrayDump) -> HandlerResult {
        Ok(())
    }

    fn primitive_array_dump(&mut self, array: &PrimitiveArrayDump) -> HandlerResult {
        Ok(())
    }
}

/// Handler that ignores every record. Useful as a base for tests and for
/// driving the parser purely for validation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHandler;

impl RecordHandler for NullHandler {}
