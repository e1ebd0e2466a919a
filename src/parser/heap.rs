use crate::parser::primitives::IdSize;
use crate::parser::record::{Id, Serial};

/// Type tag carried by typed values in class, instance, and array payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicType {
    Object = 2,
    Bool = 4,
    Char = 5,
    Float = 6,
    Double = 7,
    Byte = 8,
    Short = 9,
    Int = 10,
    Long = 11,
}

impl BasicType {
    pub fn from_tag(tag: u8) -> Option<BasicType> {
        match tag {
            2 => Some(BasicType::Object),
            4 => Some(BasicType::Bool),
            5 => Some(BasicType::Char),
            6 => Some(BasicType::Float),
            7 => Some(BasicType::Double),
            8 => Some(BasicType::Byte),
            9 => Some(BasicType::Short),
            10 => Some(BasicType::Int),
            11 => Some(BasicType::Long),
            _ => None,
        }
    }

    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Encoded width of one value of this type.
    pub const fn byte_size(self, id_size: IdSize) -> u32 {
        match self {
            BasicType::Object => id_size.in_bytes(),
            BasicType::Bool | BasicType::Byte => 1,
            BasicType::Char | BasicType::Short => 2,
            BasicType::Float | BasicType::Int => 4,
            BasicType::Double | BasicType::Long => 8,
        }
    }
}

/// A decoded typed value. The type tag is implied by the variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Object(Id),
    Bool(bool),
    Char(u16),
    Float(f32),
    Double(f64),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
}

impl Value {
    pub const fn basic_type(self) -> BasicType {
        match self {
            Value::Object(_) => BasicType::Object,
            Value::Bool(_) => BasicType::Bool,
            Value::Char(_) => BasicType::Char,
            Value::Float(_) => BasicType::Float,
            Value::Double(_) => BasicType::Double,
            Value::Byte(_) => BasicType::Byte,
            Value::Short(_) => BasicType::Short,
            Value::Int(_) => BasicType::Int,
            Value::Long(_) => BasicType::Long,
        }
    }
}

/// Elements of a primitive array dump, one vector per element type.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayValue {
    Bool(Vec<bool>),
    Char(Vec<u16>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    Byte(Vec<i8>),
    Short(Vec<i16>),
    Int(Vec<i32>),
    Long(Vec<i64>),
}

impl ArrayValue {
    pub const fn element_type(&self) -> BasicType {
        match self {
            ArrayValue::Bool(_) => BasicType::Bool,
            ArrayValue::Char(_) => BasicType::Char,
            ArrayValue::Float(_) => BasicType::Float,
            ArrayValue::Double(_) => BasicType::Double,
            ArrayValue::Byte(_) => BasicType::Byte,
            ArrayValue::Short(_) => BasicType::Short,
            ArrayValue::Int(_) => BasicType::Int,
            ArrayValue::Long(_) => BasicType::Long,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ArrayValue::Bool(v) => v.len(),
            ArrayValue::Char(v) => v.len(),
            ArrayValue::Float(v) => v.len(),
            ArrayValue::Double(v) => v.len(),
            ArrayValue::Byte(v) => v.len(),
            ArrayValue::Short(v) => v.len(),
            ArrayValue::Int(v) => v.len(),
            ArrayValue::Long(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Constant-pool entry of a class dump.
#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    pub pool_index: u16,
    pub value: Value,
}

/// Static field of a class dump: name string id plus its current value.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticField {
    pub name_id: Id,
    pub value: Value,
}

/// Instance-field descriptor: name string id plus declared type. Values live
/// in instance dumps, not here.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name_id: Id,
    pub ty: BasicType,
}

/// A decoded instance field: descriptor name paired with its value.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceFieldValue {
    pub name_id: Id,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDump {
    pub class_object_id: Id,
    pub stack_trace_serial: Serial,
    pub super_class_object_id: Id,
    pub class_loader_object_id: Id,
    pub signers_object_id: Id,
    pub protection_domain_object_id: Id,
    pub reserved_1: Id,
    pub reserved_2: Id,
    pub instance_size: u32,
    pub constants: Vec<Constant>,
    pub static_fields: Vec<StaticField>,
    pub instance_fields: Vec<FieldDescriptor>,
}

/// Field payload of an instance dump. `Raw` is the default: the bytes as
/// written, to be interpreted against the class dump chain by the consumer.
/// `Decoded` is produced when instance-field decoding is enabled on the
/// parser: own fields first, then each super-class's fields walking upward.
#[derive(Debug, Clone, PartialEq)]
pub enum InstanceFields {
    Raw(Vec<u8>),
    Decoded(Vec<InstanceFieldValue>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstanceDump {
    pub object_id: Id,
    pub stack_trace_serial: Serial,
    pub class_object_id: Id,
    pub fields: InstanceFields,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectArrayDump {
    pub object_id: Id,
    pub stack_trace_serial: Serial,
    pub element_class_id: Id,
    pub elements: Vec<Id>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveArrayDump {
    pub object_id: Id,
    pub stack_trace_serial: Serial,
    pub elements: ArrayValue,
}

/// One sub-record of a heap-dump container.
#[derive(Debug, Clone, PartialEq)]
pub enum HeapRecord {
    RootUnknown {
        object_id: Id,
    },
    RootJniGlobal {
        object_id: Id,
        jni_global_ref_id: Id,
    },
    RootJniLocal {
        object_id: Id,
        thread_serial: Serial,
        frame_index: u32,
    },
    RootJavaFrame {
        object_id: Id,
        thread_serial: Serial,
        frame_index: u32,
    },
    RootNativeStack {
        object_id: Id,
        thread_serial: Serial,
    },
    RootStickyClass {
        object_id: Id,
    },
    RootThreadBlock {
        object_id: Id,
        thread_serial: Serial,
    },
    RootMonitorUsed {
        object_id: Id,
    },
    RootThreadObject {
        thread_object_id: Id,
        thread_serial: Serial,
        stack_trace_serial: Serial,
    },
    Class(ClassDump),
    Instance(InstanceDump),
    ObjectArray(ObjectArrayDump),
    PrimitiveArray(PrimitiveArrayDump),
}
