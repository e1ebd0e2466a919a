#![allow(dead_code)]

use std::io::Cursor;

use hprof_stream::parser::heap::{
    ClassDump, InstanceDump, InstanceFields, ObjectArrayDump, PrimitiveArrayDump,
};
use hprof_stream::parser::record::{AllocSite, CpuSample, Id, Serial};
use hprof_stream::{parse_reader, Abort, HandlerResult, HprofError, RecordHandler};

pub const FORMAT: &str = "JAVA PROFILE 1.0.2";

/// Builds an hprof byte stream in memory: header plus framed records.
pub struct StreamBuilder {
    id_size: u32,
    buf: Vec<u8>,
}

impl StreamBuilder {
    pub fn new(id_size: u32) -> Self {
        let mut buf = Vec::new();
        buf.extend_from_slice(FORMAT.as_bytes());
        buf.push(0);
        buf.extend_from_slice(&id_size.to_be_bytes());
        buf.extend_from_slice(&0u64.to_be_bytes());
        StreamBuilder { id_size, buf }
    }

    pub fn header_len(&self) -> usize {
        FORMAT.len() + 1 + 4 + 8
    }

    /// Encode an identifier at the stream's declared width.
    pub fn id(&self, v: u64) -> Vec<u8> {
        if self.id_size == 4 {
            (v as u32).to_be_bytes().to_vec()
        } else {
            v.to_be_bytes().to_vec()
        }
    }

    pub fn record(self, tag: u8, body: &[u8]) -> Self {
        let declared = body.len() as u32;
        self.record_declared(tag, declared, body)
    }

    /// Frame whose declared length differs from the bytes that follow.
    pub fn record_declared(mut self, tag: u8, declared: u32, body: &[u8]) -> Self {
        self.buf.push(tag);
        self.buf.extend_from_slice(&0u32.to_be_bytes());
        self.buf.extend_from_slice(&declared.to_be_bytes());
        self.buf.extend_from_slice(body);
        self
    }

    pub fn bytes(self) -> Vec<u8> {
        self.buf
    }
}

pub fn u16b(v: u16) -> [u8; 2] {
    v.to_be_bytes()
}

pub fn u32b(v: u32) -> [u8; 4] {
    v.to_be_bytes()
}

pub fn u64b(v: u64) -> [u8; 8] {
    v.to_be_bytes()
}

pub fn i32b(v: i32) -> [u8; 4] {
    v.to_be_bytes()
}

pub fn i64b(v: i64) -> [u8; 8] {
    v.to_be_bytes()
}

pub fn f32b(v: f32) -> [u8; 4] {
    v.to_be_bytes()
}

/// Records every callback as one line, preserving delivery order.
#[derive(Debug, Default)]
pub struct Events {
    pub log: Vec<String>,
}

impl RecordHandler for Events {
    fn header(&mut self, format: &str, id_size: u32, timestamp_ms: u64) -> HandlerResult {
        self.log
            .push(format!("header format={format} id_size={id_size} ts={timestamp_ms}"));
        Ok(())
    }

    fn utf8_string(&mut self, id: Id, value: &str) -> HandlerResult {
        self.log.push(format!("string id={id} value={value}"));
        Ok(())
    }

    fn load_class(
        &mut self,
        class_serial: Serial,
        class_object_id: Id,
        stack_trace_serial: Serial,
        class_name_id: Id,
    ) -> HandlerResult {
        self.log.push(format!(
            "load_class serial={class_serial} class={class_object_id} trace={stack_trace_serial} name={class_name_id}"
        ));
        Ok(())
    }

    fn unload_class(&mut self, class_serial: Serial) -> HandlerResult {
        self.log.push(format!("unload_class serial={class_serial}"));
        Ok(())
    }

    fn stack_frame(
        &mut self,
        frame_id: Id,
        method_name_id: Id,
        method_signature_id: Id,
        source_file_name_id: Id,
        class_serial: Serial,
        line: i32,
    ) -> HandlerResult {
        self.log.push(format!(
            "stack_frame id={frame_id} method={method_name_id} sig={method_signature_id} src={source_file_name_id} serial={class_serial} line={line}"
        ));
        Ok(())
    }

    fn stack_trace(
        &mut self,
        stack_trace_serial: Serial,
        thread_serial: Serial,
        frame_ids: &[Id],
    ) -> HandlerResult {
        self.log.push(format!(
            "stack_trace serial={stack_trace_serial} thread={thread_serial} frames={frame_ids:?}"
        ));
        Ok(())
    }

    fn alloc_sites(
        &mut self,
        flags: u16,
        cutoff_ratio: f32,
        _total_live_bytes: u32,
        _total_live_instances: u32,
        _total_bytes_allocated: u64,
        _total_instances_allocated: u64,
        sites: &[AllocSite],
    ) -> HandlerResult {
        self.log.push(format!(
            "alloc_sites flags={flags} cutoff={cutoff_ratio} sites={}",
            sites.len()
        ));
        Ok(())
    }

    fn heap_summary(
        &mut self,
        total_live_bytes: u32,
        total_live_instances: u32,
        total_bytes_allocated: u64,
        total_instances_allocated: u64,
    ) -> HandlerResult {
        self.log.push(format!(
            "heap_summary live={total_live_bytes}/{total_live_instances} total={total_bytes_allocated}/{total_instances_allocated}"
        ));
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
        self.log.push(format!(
            "start_thread serial={thread_serial} obj={thread_object_id} trace={stack_trace_serial} name={thread_name_id} group={thread_group_name_id} parent={thread_group_parent_name_id}"
        ));
        Ok(())
    }

    fn end_thread(&mut self, thread_serial: Serial) -> HandlerResult {
        self.log.push(format!("end_thread serial={thread_serial}"));
        Ok(())
    }

    fn heap_dump(&mut self) -> HandlerResult {
        self.log.push("heap_dump".to_string());
        Ok(())
    }

    fn heap_dump_segment(&mut self) -> HandlerResult {
        self.log.push("heap_dump_segment".to_string());
        Ok(())
    }

    fn heap_dump_end(&mut self) -> HandlerResult {
        self.log.push("heap_dump_end".to_string());
        Ok(())
    }

    fn cpu_samples(&mut self, total_samples: u32, samples: &[CpuSample]) -> HandlerResult {
        let samples: Vec<(u32, u32)> = samples
            .iter()
            .map(|s| (s.sample_count, s.stack_trace_serial))
            .collect();
        self.log
            .push(format!("cpu_samples total={total_samples} samples={samples:?}"));
        Ok(())
    }

    fn control_settings(&mut self, flags: u32, stack_trace_depth: u16) -> HandlerResult {
        self.log
            .push(format!("control_settings flags={flags} depth={stack_trace_depth}"));
        Ok(())
    }

    fn root_unknown(&mut self, object_id: Id) -> HandlerResult {
        self.log.push(format!("root_unknown id={object_id}"));
        Ok(())
    }

    fn root_jni_global(&mut self, object_id: Id, jni_global_ref_id: Id) -> HandlerResult {
        self.log
            .push(format!("root_jni_global id={object_id} ref={jni_global_ref_id}"));
        Ok(())
    }

    fn root_jni_local(
        &mut self,
        object_id: Id,
        thread_serial: Serial,
        frame_index: u32,
    ) -> HandlerResult {
        self.log.push(format!(
            "root_jni_local id={object_id} thread={thread_serial} frame={frame_index}"
        ));
        Ok(())
    }

    fn root_java_frame(
        &mut self,
        object_id: Id,
        thread_serial: Serial,
        frame_index: u32,
    ) -> HandlerResult {
        self.log.push(format!(
            "root_java_frame id={object_id} thread={thread_serial} frame={frame_index}"
        ));
        Ok(())
    }

    fn root_native_stack(&mut self, object_id: Id, thread_serial: Serial) -> HandlerResult {
        self.log
            .push(format!("root_native_stack id={object_id} thread={thread_serial}"));
        Ok(())
    }

    fn root_sticky_class(&mut self, object_id: Id) -> HandlerResult {
        self.log.push(format!("root_sticky_class id={object_id}"));
        Ok(())
    }

    fn root_thread_block(&mut self, object_id: Id, thread_serial: Serial) -> HandlerResult {
        self.log
            .push(format!("root_thread_block id={object_id} thread={thread_serial}"));
        Ok(())
    }

    fn root_monitor_used(&mut self, object_id: Id) -> HandlerResult {
        self.log.push(format!("root_monitor_used id={object_id}"));
        Ok(())
    }

    fn root_thread_object(
        &mut self,
        thread_object_id: Id,
        thread_serial: Serial,
        stack_trace_serial: Serial,
    ) -> HandlerResult {
        self.log.push(format!(
            "root_thread_object id={thread_object_id} thread={thread_serial} trace={stack_trace_serial}"
        ));
        Ok(())
    }

    fn class_dump(&mut self, class: &ClassDump) -> HandlerResult {
        self.log.push(format!(
            "class_dump id={} super={} size={} constants={} statics={} fields={}",
            class.class_object_id,
            class.super_class_object_id,
            class.instance_size,
            class.constants.len(),
            class.static_fields.len(),
            class.instance_fields.len()
        ));
        Ok(())
    }

    fn instance_dump(&mut self, instance: &InstanceDump) -> HandlerResult {
        let payload = match &instance.fields {
            InstanceFields::Raw(raw) => format!("raw={raw:?}"),
            InstanceFields::Decoded(fields) => {
                let fields: Vec<_> = fields.iter().map(|f| (f.name_id, f.value)).collect();
                format!("fields={fields:?}")
            }
        };
        self.log.push(format!(
            "instance id={} trace={} class={} {payload}",
            instance.object_id, instance.stack_trace_serial, instance.class_object_id
        ));
        Ok(())
    }

    fn object_array_dump(&mut self, array: &ObjectArrayDump) -> HandlerResult {
        self.log.push(format!(
            "object_array id={} class={} elements={:?}",
            array.object_id, array.element_class_id, array.elements
        ));
        Ok(())
    }

    fn primitive_array_dump(&mut self, array: &PrimitiveArrayDump) -> HandlerResult {
        self.log.push(format!(
            "prim_array id={} trace={} elements={:?}",
            array.object_id, array.stack_trace_serial, array.elements
        ));
        Ok(())
    }
}

/// Aborts as soon as any UTF-8 string record is delivered.
#[derive(Debug, Default)]
pub struct AbortOnString;

impl RecordHandler for AbortOnString {
    fn utf8_string(&mut self, _id: Id, value: &str) -> HandlerResult {
        Err(Abort::new(format!("saw string {value}")))
    }
}

pub fn run(stream: &[u8]) -> Result<Events, HprofError> {
    parse_reader(Cursor::new(stream.to_vec()), Events::default())
}

pub fn run_with_field_decoding(stream: &[u8]) -> Result<Events, HprofError> {
    hprof_stream::HprofReader::new(Cursor::new(stream.to_vec()), Events::default())
        .decode_instance_fields(true)
        .run()
}
