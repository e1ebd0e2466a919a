use indoc::formatdoc;

use crate::handler::{HandlerResult, RecordHandler};
use crate::parser::heap::{ClassDump, InstanceDump, ObjectArrayDump, PrimitiveArrayDump};
use crate::parser::record::{AllocSite, CpuSample, Id, Serial};

/// Counts every record kind seen in a stream. Backs the CLI summary output.
#[derive(Debug, Default)]
pub struct RecordCounter {
    strings: u64,
    classes_loaded: u64,
    classes_unloaded: u64,
    stack_frames: u64,
    stack_traces: u64,
    alloc_sites: u64,
    heap_summaries: u64,
    threads_started: u64,
    threads_ended: u64,
    heap_dumps: u64,
    heap_dump_segments: u64,
    heap_dump_ends: u64,
    cpu_samples: u64,
    control_settings: u64,
    roots_unknown: u64,
    roots_jni_global: u64,
    roots_jni_local: u64,
    roots_java_frame: u64,
    roots_native_stack: u64,
    roots_sticky_class: u64,
    roots_thread_block: u64,
    roots_monitor_used: u64,
    roots_thread_object: u64,
    class_dumps: u64,
    instance_dumps: u64,
    object_array_dumps: u64,
    primitive_array_dumps: u64,
}

impl RecordCounter {
    pub fn new() -> Self {
        RecordCounter::default()
    }

    fn heap_sub_records(&self) -> u64 {
        self.roots_unknown
            + self.roots_jni_global
            + self.roots_jni_local
            + self.roots_java_frame
            + self.roots_native_stack
            + self.roots_sticky_class
            + self.roots_thread_block
            + self.roots_monitor_used
            + self.roots_thread_object
            + self.class_dumps
            + self.instance_dumps
            + self.object_array_dumps
            + self.primitive_array_dumps
    }

    pub fn summary(&self) -> String {
        let records = formatdoc!(
            "
            Record summary:

            UTF-8 strings: {}
            Classes loaded: {}
            Classes unloaded: {}
            Stack frames: {}
            Stack traces: {}
            Allocation sites: {}
            Heap summaries: {}
            Threads started: {}
            Threads ended: {}
            Control settings: {}
            CPU samples: {}",
            self.strings,
            self.classes_loaded,
            self.classes_unloaded,
            self.stack_frames,
            self.stack_traces,
            self.alloc_sites,
            self.heap_summaries,
            self.threads_started,
            self.threads_ended,
            self.control_settings,
            self.cpu_samples,
        );

        let heap = formatdoc!(
            "
            {} heap dumps and {} segments holding {} sub-records:
            ..root unknown: {}
            ..root JNI global: {}
            ..root JNI local: {}
            ..root Java frame: {}
            ..root native stack: {}
            ..root sticky class: {}
            ..root thread block: {}
            ..root monitor used: {}
            ..root thread object: {}
            ..class dumps: {}
            ..instance dumps: {}
            ..object array dumps: {}
            ..primitive array dumps: {}
            Container close notifications: {}",
            self.heap_dumps,
            self.heap_dump_segments,
            self.heap_sub_records(),
            self.roots_unknown,
            self.roots_jni_global,
            self.roots_jni_local,
            self.roots_java_frame,
            self.roots_native_stack,
            self.roots_sticky_class,
            self.roots_thread_block,
            self.roots_monitor_used,
            self.roots_thread_object,
            self.class_dumps,
            self.instance_dumps,
            self.object_array_dumps,
            self.primitive_array_dumps,
            self.heap_dump_ends,
        );

        format!("{records}\n\n{heap}\n")
    }
}

impl RecordHandler for RecordCounter {
    fn utf8_string(&mut self, _id: Id, _value: &str) -> HandlerResult {
        self.strings += 1;
        Ok(())
    }

    fn load_class(
        &mut self,
        _class_serial: Serial,
        _class_object_id: Id,
        _stack_trace_serial: Serial,
        _class_name_id: Id,
    ) -> HandlerResult {
        self.classes_loaded += 1;
        Ok(())
    }

    fn unload_class(&mut self, _class_serial: Serial) -> HandlerResult {
        self.classes_unloaded += 1;
        Ok(())
    }

    fn stack_frame(
        &mut self,
        _frame_id: Id,
        _method_name_id: Id,
        _method_signature_id: Id,
        _source_file_name_id: Id,
        _class_serial: Serial,
        _line: i32,
    ) -> HandlerResult {
        self.stack_frames += 1;
        Ok(())
    }

    fn stack_trace(
        &mut self,
        _stack_trace_serial: Serial,
        _thread_serial: Serial,
        _frame_ids: &[Id],
    ) -> HandlerResult {
        self.stack_traces += 1;
        Ok(())
    }

    fn alloc_sites(
        &mut self,
        _flags: u16,
        _cutoff_ratio: f32,
        _total_live_bytes: u32,
        _total_live_instances: u32,
        _total_bytes_allocated: u64,
        _total_instances_allocated: u64,
        _sites: &[AllocSite],
    ) -> HandlerResult {
        self.alloc_sites += 1;
        Ok(())
    }

    fn heap_summary(
        &mut self,
        _total_live_bytes: u32,
        _total_live_instances: u32,
        _total_bytes_allocated: u64,
        _total_instances_allocated: u64,
    ) -> HandlerResult {
        self.heap_summaries += 1;
        Ok(())
    }

    fn start_thread(
        &mut self,
        _thread_serial: Serial,
        _thread_object_id: Id,
        _stack_trace_serial: Serial,
        _thread_name_id: Id,
        _thread_group_name_id: Id,
        _thread_group_parent_name_id: Id,
    ) -> HandlerResult {
        self.threads_started += 1;
        Ok(())
    }

    fn end_thread(&mut self, _thread_serial: Serial) -> HandlerResult {
        self.threads_ended += 1;
        Ok(())
    }

    fn heap_dump(&mut self) -> HandlerResult {
        self.heap_dumps += 1;
        Ok(())
    }

    fn heap_dump_segment(&mut self) -> HandlerResult {
        self.heap_dump_segments += 1;
        Ok(())
    }

    fn heap_dump_end(&mut self) -> HandlerResult {
        self.heap_dump_ends += 1;
        Ok(())
    }

    fn cpu_samples(&mut self, _total_samples: u32, _samples: &[CpuSample]) -> HandlerResult {
        self.cpu_samples += 1;
        Ok(())
    }

    fn control_settings(&mut self, _flags: u32, _stack_trace_depth: u16) -> HandlerResult {
        self.control_settings += 1;
        Ok(())
    }

    fn root_unknown(&mut self, _object_id: Id) -> HandlerResult {
        self.roots_unknown += 1;
        Ok(())
    }

    fn root_jni_global(&mut self, _object_id: Id, _jni_global_ref_id: Id) -> HandlerResult {
        self.roots_jni_global += 1;
        Ok(())
    }

    fn root_jni_local(
        &mut self,
        _object_id: Id,
        _thread_serial: Serial,
        _frame_index: u32,
    ) -> HandlerResult {
        self.roots_jni_local += 1;
        Ok(())
    }

    fn root_java_frame(
        &mut self,
        _object_id: Id,
        _thread_serial: Serial,
        _frame_index: u32,
    ) -> HandlerResult {
        self.roots_java_frame += 1;
        Ok(())
    }

    fn root_native_stack(&mut self, _object_id: Id, _thread_serial: Serial) -> HandlerResult {
        self.roots_native_stack += 1;
        Ok(())
    }

    fn root_sticky_class(&mut self, _object_id: Id) -> HandlerResult {
        self.roots_sticky_class += 1;
        Ok(())
    }

    fn root_thread_block(&mut self, _object_id: Id, _thread_serial: Serial) -> HandlerResult {
        self.roots_thread_block += 1;
        Ok(())
    }

    fn root_monitor_used(&mut self, _object_id: Id) -> HandlerResult {
        self.roots_monitor_used += 1;
        Ok(())
    }

    fn root_thread_object(
        &mut self,
        _thread_object_id: Id,
        _thread_serial: Serial,
        _stack_trace_serial: Serial,
    ) -> HandlerResult {
        self.roots_thread_object += 1;
        Ok(())
    }

    fn class_dump(&mut self, _class: &ClassDump) -> HandlerResult {
        self.class_dumps += 1;
        Ok(())
    }

    fn instance_dump(&mut self, _instance: &InstanceDump) -> HandlerResult {
        self.instance_dumps += 1;
        Ok(())
    }

    fn object_array_dump(&mut self, _array: &ObjectArrayDump) -> HandlerResult {
        self.object_array_dumps += 1;
        Ok(())
    }

    fn primitive_array_dump(&mut self, _array: &PrimitiveArrayDump) -> HandlerResult {
        self.primitive_array_dumps += 1;
        Ok(())
    }
}
