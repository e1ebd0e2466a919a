use std::rc::Rc;

use ahash::AHashMap;
use nom::combinator::map;
use nom::multi::count;
use nom::sequence::tuple;
use nom::{bytes, IResult};

use crate::errors::FormatCause;
use crate::parser::heap::*;
use crate::parser::primitives::*;
use crate::parser::record::Id;

pub(crate) const TAG_ROOT_UNKNOWN: u8 = 0xFF;
pub(crate) const TAG_ROOT_JNI_GLOBAL: u8 = 0x01;
pub(crate) const TAG_ROOT_JNI_LOCAL: u8 = 0x02;
pub(crate) const TAG_ROOT_JAVA_FRAME: u8 = 0x03;
pub(crate) const TAG_ROOT_NATIVE_STACK: u8 = 0x04;
pub(crate) const TAG_ROOT_STICKY_CLASS: u8 = 0x05;
pub(crate) const TAG_ROOT_THREAD_BLOCK: u8 = 0x06;
pub(crate) const TAG_ROOT_MONITOR_USED: u8 = 0x07;
pub(crate) const TAG_ROOT_THREAD_OBJECT: u8 = 0x08;
pub(crate) const TAG_CLASS_DUMP: u8 = 0x20;
pub(crate) const TAG_INSTANCE_DUMP: u8 = 0x21;
pub(crate) const TAG_OBJECT_ARRAY_DUMP: u8 = 0x22;
pub(crate) const TAG_PRIMITIVE_ARRAY_DUMP: u8 = 0x23;

/// Parse one heap-dump sub-record: a u8 sub-tag followed by a body whose
/// size is fixed by the tag (and, for arrays and instances, by counts inside
/// the body). There is no length prefix to skip by, so an unknown tag is
/// fatal for the container.
pub fn parse_heap_record(
    id_size: IdSize,
) -> impl Fn(&[u8]) -> IResult<&[u8], HeapRecord, DecodeFail> {
    move |i| {
        let (r, tag) = parse_u8(i)?;
        match tag {
            TAG_ROOT_UNKNOWN => {
                map(parse_id(id_size), |object_id| HeapRecord::RootUnknown {
                    object_id,
                })(r)
            }
            TAG_ROOT_JNI_GLOBAL => map(
                tuple((parse_id(id_size), parse_id(id_size))),
                |(object_id, jni_global_ref_id)| HeapRecord::RootJniGlobal {
                    object_id,
                    jni_global_ref_id,
                },
            )(r),
            TAG_ROOT_JNI_LOCAL => map(
                tuple((parse_id(id_size), parse_u32, parse_u32)),
                |(object_id, thread_serial, frame_index)| HeapRecord::RootJniLocal {
                    object_id,
                    thread_serial,
                    frame_index,
                },
            )(r),
            TAG_ROOT_JAVA_FRAME => map(
                tuple((parse_id(id_size), parse_u32, parse_u32)),
                |(object_id, thread_serial, frame_index)| HeapRecord::RootJavaFrame {
                    object_id,
                    thread_serial,
                    frame_index,
                },
            )(r),
            TAG_ROOT_NATIVE_STACK => map(
                tuple((parse_id(id_size), parse_u32)),
                |(object_id, thread_serial)| HeapRecord::RootNativeStack {
                    object_id,
                    thread_serial,
                },
            )(r),
            TAG_ROOT_STICKY_CLASS => {
                map(parse_id(id_size), |object_id| HeapRecord::RootStickyClass {
                    object_id,
                })(r)
            }
            TAG_ROOT_THREAD_BLOCK => map(
                tuple((parse_id(id_size), parse_u32)),
                |(object_id, thread_serial)| HeapRecord::RootThreadBlock {
                    object_id,
                    thread_serial,
                },
            )(r),
            TAG_ROOT_MONITOR_USED => {
                map(parse_id(id_size), |object_id| HeapRecord::RootMonitorUsed {
                    object_id,
                })(r)
            }
            TAG_ROOT_THREAD_OBJECT => map(
                tuple((parse_id(id_size), parse_u32, parse_u32)),
                |(thread_object_id, thread_serial, stack_trace_serial)| {
                    HeapRecord::RootThreadObject {
                        thread_object_id,
                        thread_serial,
                        stack_trace_serial,
                    }
                },
            )(r),
            TAG_CLASS_DUMP => map(parse_class_dump(id_size), HeapRecord::Class)(r),
            TAG_INSTANCE_DUMP => map(parse_instance_dump(id_size), HeapRecord::Instance)(r),
            TAG_OBJECT_ARRAY_DUMP => {
                map(parse_object_array_dump(id_size), HeapRecord::ObjectArray)(r)
            }
            TAG_PRIMITIVE_ARRAY_DUMP => map(
                parse_primitive_array_dump(id_size),
                HeapRecord::PrimitiveArray,
            )(r),
            _ => Err(DecodeFail::failure(i, FormatCause::UnknownHeapSubTag(tag))),
        }
    }
}

pub fn parse_basic_type(i: &[u8]) -> IResult<&[u8], BasicType, DecodeFail> {
    let (r, tag) = parse_u8(i)?;
    match BasicType::from_tag(tag) {
        Some(ty) => Ok((r, ty)),
        None => Err(DecodeFail::failure(i, FormatCause::UnknownBasicType(tag))),
    }
}

/// Read one value of the given type at its encoded width.
pub fn parse_value(
    id_size: IdSize,
    ty: BasicType,
) -> impl Fn(&[u8]) -> IResult<&[u8], Value, DecodeFail> {
    move |i| match ty {
        BasicType::Object => map(parse_id(id_size), Value::Object)(i),
        BasicType::Bool => map(parse_bool, Value::Bool)(i),
        BasicType::Char => map(parse_u16, Value::Char)(i),
        BasicType::Float => map(parse_f32, Value::Float)(i),
        BasicType::Double => map(parse_f64, Value::Double)(i),
        BasicType::Byte => map(parse_i8, Value::Byte)(i),
        BasicType::Short => map(parse_i16, Value::Short)(i),
        BasicType::Int => map(parse_i32, Value::Int)(i),
        BasicType::Long => map(parse_i64, Value::Long)(i),
    }
}

fn parse_array_value(
    element_type: BasicType,
    elements: u32,
) -> impl Fn(&[u8]) -> IResult<&[u8], ArrayValue, DecodeFail> {
    let n = elements as usize;
    move |i| match element_type {
        BasicType::Object => Err(DecodeFail::failure(
            i,
            FormatCause::InvalidArrayElementType(BasicType::Object.tag()),
        )),
        BasicType::Bool => map(count(parse_bool, n), ArrayValue::Bool)(i),
        BasicType::Char => map(count(parse_u16, n), ArrayValue::Char)(i),
        BasicType::Float => map(count(parse_f32, n), ArrayValue::Float)(i),
        BasicType::Double => map(count(parse_f64, n), ArrayValue::Double)(i),
        BasicType::Byte => map(count(parse_i8, n), ArrayValue::Byte)(i),
        BasicType::Short => map(count(parse_i16, n), ArrayValue::Short)(i),
        BasicType::Int => map(count(parse_i32, n), ArrayValue::Int)(i),
        BasicType::Long => map(count(parse_i64, n), ArrayValue::Long)(i),
    }
}

fn parse_constant(id_size: IdSize) -> impl Fn(&[u8]) -> IResult<&[u8], Constant, DecodeFail> {
    move |i| {
        let (r, (pool_index, ty)) = tuple((parse_u16, parse_basic_type))(i)?;
        let (r, value) = parse_value(id_size, ty)(r)?;
        Ok((r, Constant { pool_index, value }))
    }
}

fn parse_static_field(
    id_size: IdSize,
) -> impl Fn(&[u8]) -> IResult<&[u8], StaticField, DecodeFail> {
    move |i| {
        let (r, (name_id, ty)) = tuple((parse_id(id_size), parse_basic_type))(i)?;
        let (r, value) = parse_value(id_size, ty)(r)?;
        Ok((r, StaticField { name_id, value }))
    }
}

fn parse_field_descriptor(
    id_size: IdSize,
) -> impl Fn(&[u8]) -> IResult<&[u8], FieldDescriptor, DecodeFail> {
    move |i| {
        map(
            tuple((parse_id(id_size), parse_basic_type)),
            |(name_id, ty)| FieldDescriptor { name_id, ty },
        )(i)
    }
}

fn parse_class_dump(id_size: IdSize) -> impl Fn(&[u8]) -> IResult<&[u8], ClassDump, DecodeFail> {
    move |i| {
        let (
            r,
            (
                class_object_id,
                stack_trace_serial,
                super_class_object_id,
                class_loader_object_id,
                signers_object_id,
                protection_domain_object_id,
                reserved_1,
                reserved_2,
                instance_size,
            ),
        ) = tuple((
            parse_id(id_size),
            parse_u32,
            parse_id(id_size),
            parse_id(id_size),
            parse_id(id_size),
            parse_id(id_size),
            parse_id(id_size),
            parse_id(id_size),
            parse_u32,
        ))(i)?;
        let (r, constant_count) = parse_u16(r)?;
        let (r, constants) = count(parse_constant(id_size), constant_count as usize)(r)?;
        let (r, static_count) = parse_u16(r)?;
        let (r, static_fields) = count(parse_static_field(id_size), static_count as usize)(r)?;
        let (r, field_count) = parse_u16(r)?;
        let (r, instance_fields) =
            count(parse_field_descriptor(id_size), field_count as usize)(r)?;
        Ok((
            r,
            ClassDump {
                class_object_id,
                stack_trace_serial,
                super_class_object_id,
                class_loader_object_id,
                signers_object_id,
                protection_domain_object_id,
                reserved_1,
                reserved_2,
                instance_size,
                constants,
                static_fields,
                instance_fields,
            },
        ))
    }
}

fn parse_instance_dump(
    id_size: IdSize,
) -> impl Fn(&[u8]) -> IResult<&[u8], InstanceDump, DecodeFail> {
    move |i| {
        let (r, (object_id, stack_trace_serial, class_object_id, data_size)) = tuple((
            parse_id(id_size),
            parse_u32,
            parse_id(id_size),
            parse_u32,
        ))(i)?;
        // The field bytes are kept opaque here. Instances routinely precede
        // their class dump in real streams, so interpretation happens later,
        // either by the consumer or by the opt-in decoding pass.
        let (r, data) = bytes::streaming::take(data_size)(r)?;
        Ok((
            r,
            InstanceDump {
                object_id,
                stack_trace_serial,
                class_object_id,
                fields: InstanceFields::Raw(data.to_vec()),
            },
        ))
    }
}

fn parse_object_array_dump(
    id_size: IdSize,
) -> impl Fn(&[u8]) -> IResult<&[u8], ObjectArrayDump, DecodeFail> {
    move |i| {
        let (r, (object_id, stack_trace_serial, elements, element_class_id)) = tuple((
            parse_id(id_size),
            parse_u32,
            parse_u32,
            parse_id(id_size),
        ))(i)?;
        let (r, elements) = count(parse_id(id_size), elements as usize)(r)?;
        Ok((
            r,
            ObjectArrayDump {
                object_id,
                stack_trace_serial,
                element_class_id,
                elements,
            },
        ))
    }
}

fn parse_primitive_array_dump(
    id_size: IdSize,
) -> impl Fn(&[u8]) -> IResult<&[u8], PrimitiveArrayDump, DecodeFail> {
    move |i| {
        let (r, (object_id, stack_trace_serial, elements)) =
            tuple((parse_id(id_size), parse_u32, parse_u32))(i)?;
        let (r, element_type) = parse_basic_type(r)?;
        let (r, elements) = parse_array_value(element_type, elements)(r)?;
        Ok((
            r,
            PrimitiveArrayDump {
                object_id,
                stack_trace_serial,
                elements,
            },
        ))
    }
}

// Super chains in valid dumps are shallow; bound the walk so a garbled
// stream with a cyclic chain cannot loop forever.
const MAX_SUPER_DEPTH: usize = 1024;

struct ClassLayout {
    super_class_object_id: Id,
    fields: Vec<FieldDescriptor>,
}

/// Field-layout registry backing instance-field decoding. Populated from
/// class dumps as they are observed; flattened field lists (own fields, then
/// the super-class chain) are resolved lazily and memoized.
#[derive(Default)]
pub(crate) struct ClassIndex {
    layouts: AHashMap<Id, ClassLayout>,
    resolved: AHashMap<Id, Rc<Vec<FieldDescriptor>>>,
}

impl ClassIndex {
    pub(crate) fn record(&mut self, class: &ClassDump) {
        self.layouts.insert(
            class.class_object_id,
            ClassLayout {
                super_class_object_id: class.super_class_object_id,
                fields: class.instance_fields.clone(),
            },
        );
    }

    fn resolve(&mut self, class_id: Id, depth: usize) -> Result<Rc<Vec<FieldDescriptor>>, FormatCause> {
        if let Some(flat) = self.resolved.get(&class_id) {
            return Ok(flat.clone());
        }
        if depth > MAX_SUPER_DEPTH {
            return Err(FormatCause::Malformed);
        }
        let (mut flat, super_id) = match self.layouts.get(&class_id) {
            Some(layout) => (layout.fields.clone(), layout.super_class_object_id),
            None => return Err(FormatCause::MissingClassDump(class_id)),
        };
        if super_id != 0 {
            flat.extend(self.resolve(super_id, depth + 1)?.iter().cloned());
        }
        let flat = Rc::new(flat);
        self.resolved.insert(class_id, flat.clone());
        Ok(flat)
    }

    /// Decode an instance dump's raw field bytes against the flattened
    /// layout of its class. The bytes must fill the layout exactly.
    pub(crate) fn decode_fields(
        &mut self,
        class_id: Id,
        raw: &[u8],
        id_size: IdSize,
    ) -> Result<Vec<InstanceFieldValue>, FormatCause> {
        let descriptors = self.resolve(class_id, 0)?;
        let mut decoded = Vec::with_capacity(descriptors.len());
        let mut i = raw;
        for descriptor in descriptors.iter() {
            let (rest, value) = parse_value(id_size, descriptor.ty)(i).map_err(|_| {
                FormatCause::FrameLengthMismatch {
                    declared: raw.len() as u32,
                    consumed: (raw.len() - i.len()) as u64 + u64::from(descriptor.ty.byte_size(id_size)),
                }
            })?;
            decoded.push(InstanceFieldValue {
                name_id: descriptor.name_id,
                value,
            });
            i = rest;
        }
        if !i.is_empty() {
            return Err(FormatCause::FrameLengthMismatch {
                declared: raw.len() as u32,
                consumed: (raw.len() - i.len()) as u64,
            });
        }
        Ok(decoded)
    }
}
