//! Descriptor-driven field codec.
//!
//! Every packet is described by an ordered list of [`FieldSpec`]s. One generic
//! routine walks that list to turn a [`Fields`] bag into bytes and back, so the
//! wire layout of a packet is defined in exactly one place.

use std::collections::BTreeMap;

use super::{
    error::{ProtoError, Result},
    io::{
        read_bool, read_f32_be, read_f64_be, read_i16_be, read_i32_be, read_i64_be,
        read_position, read_string_bounded, read_u16_be, read_u8, read_uuid, write_bool,
        write_position, write_string_bounded, write_uuid,
    },
    types::{BlockPos, ItemStack, Uuid, MAX_STACK_SIZE},
    varint::{read_len, read_varint, write_len, write_varint},
};

const META_KEY_MAX: usize = 256;
const META_VALUE_MAX: usize = 32_767;

/// Validated integer <-> variant table for an enum-backed field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumTable {
    pub name: &'static str,
    pub values: &'static [i32],
}

impl EnumTable {
    #[must_use]
    pub fn contains(&self, value: i32) -> bool {
        self.values.contains(&value)
    }
}

/// An enum whose variants travel as varints.
pub trait WireEnum: Sized + Copy {
    const TABLE: EnumTable;

    fn to_wire(self) -> i32;
    fn from_wire(value: i32) -> Option<Self>;
}

/// Declares an enum together with its [`WireEnum`] table.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $value:expr),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $crate::proto::codec::WireEnum for $name {
            const TABLE: $crate::proto::codec::EnumTable = $crate::proto::codec::EnumTable {
                name: stringify!($name),
                values: &[$($value),+],
            };

            fn to_wire(self) -> i32 {
                match self {
                    $($name::$variant => $value),+
                }
            }

            fn from_wire(value: i32) -> Option<Self> {
                match value {
                    $(v if v == $value => Some($name::$variant),)+
                    _ => None,
                }
            }
        }
    };
}
pub(crate) use wire_enum;

/// Semantic type and encoding of one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Bool,
    Byte,
    UByte,
    Short,
    UShort,
    Int,
    Long,
    Float,
    Double,
    VarInt,
    Str { max: usize },
    Uuid,
    Position,
    /// Rotation in 1/256 of a full turn.
    Angle,
    /// Optional item stack; a zero count marks the empty slot.
    Slot,
    Enum(&'static EnumTable),
    /// Presence flag followed by the inner value.
    Optional(&'static FieldKind),
    /// Varint count followed by that many values.
    Seq(&'static FieldKind),
    /// Varint count followed by key/value pairs.
    Map {
        key: &'static FieldKind,
        value: &'static FieldKind,
    },
    Struct(&'static [FieldSpec]),
}

/// One entry of a packet descriptor. `index` names the field; the position of
/// the field spec inside its list is the wire position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub index: u8,
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldSpec {
    #[must_use]
    pub const fn new(index: u8, name: &'static str, kind: FieldKind) -> Self {
        Self { index, name, kind }
    }
}

/// A decoded or to-be-encoded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Byte(i8),
    UByte(u8),
    Short(i16),
    UShort(u16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    VarInt(i32),
    Str(String),
    Uuid(Uuid),
    Position(BlockPos),
    Angle(u8),
    Slot(Option<ItemStack>),
    Enum(i32),
    Optional(Option<Box<Value>>),
    Seq(Vec<Value>),
    Map(Vec<(Value, Value)>),
    Struct(Fields),
}

macro_rules! value_conversions {
    ($($into:ident => $variant:ident($ty:ty)),+ $(,)?) => {
        impl Value {
            $(
                #[must_use]
                pub fn $into(self) -> Option<$ty> {
                    match self {
                        Value::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            )+
        }

        impl Fields {
            $(
                pub fn $into(&mut self, index: u8) -> Result<$ty> {
                    let packet = self.packet;
                    self.take(index)?
                        .$into()
                        .ok_or(ProtoError::FieldMismatch { packet, index })
                }
            )+
        }
    };
}

value_conversions! {
    into_bool => Bool(bool),
    into_byte => Byte(i8),
    into_ubyte => UByte(u8),
    into_short => Short(i16),
    into_ushort => UShort(u16),
    into_int => Int(i32),
    into_long => Long(i64),
    into_float => Float(f32),
    into_double => Double(f64),
    into_varint => VarInt(i32),
    into_str => Str(String),
    into_uuid => Uuid(Uuid),
    into_position => Position(BlockPos),
    into_angle => Angle(u8),
    into_slot => Slot(Option<ItemStack>),
    into_optional => Optional(Option<Box<Value>>),
    into_seq => Seq(Vec<Value>),
    into_map => Map(Vec<(Value, Value)>),
    into_struct => Struct(Fields),
}

/// Field values keyed by field index.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fields {
    packet: &'static str,
    values: Vec<(u8, Value)>,
}

impl Fields {
    #[must_use]
    pub fn new(packet: &'static str) -> Self {
        Self {
            packet,
            values: Vec::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, index: u8, value: Value) -> Self {
        self.insert(index, value);
        self
    }

    pub fn insert(&mut self, index: u8, value: Value) {
        match self.values.iter_mut().find(|(i, _)| *i == index) {
            Some(slot) => slot.1 = value,
            None => self.values.push((index, value)),
        }
    }

    #[must_use]
    pub fn get(&self, index: u8) -> Option<&Value> {
        self.values
            .iter()
            .find(|(i, _)| *i == index)
            .map(|(_, value)| value)
    }

    pub fn take(&mut self, index: u8) -> Result<Value> {
        let pos = self
            .values
            .iter()
            .position(|(i, _)| *i == index)
            .ok_or(ProtoError::MissingField {
                packet: self.packet,
                index,
            })?;
        Ok(self.values.swap_remove(pos).1)
    }

    pub fn enumeration<E: WireEnum>(&mut self, index: u8) -> Result<E> {
        let packet = self.packet;
        let Value::Enum(raw) = self.take(index)? else {
            return Err(ProtoError::FieldMismatch { packet, index });
        };
        E::from_wire(raw).ok_or(ProtoError::InvalidEnum {
            table: E::TABLE.name,
            value: raw,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn packet(&self) -> &'static str {
        self.packet
    }
}

/// Encodes `fields` in the order given by `specs`.
pub fn encode_fields(
    packet: &'static str,
    specs: &[FieldSpec],
    fields: &Fields,
    out: &mut Vec<u8>,
) -> Result<()> {
    for spec in specs {
        let value = fields.get(spec.index).ok_or(ProtoError::MissingField {
            packet,
            index: spec.index,
        })?;
        encode_value(packet, spec.index, &spec.kind, value, out)?;
    }

    if let Some((index, _)) = fields
        .values
        .iter()
        .find(|(index, _)| !specs.iter().any(|spec| spec.index == *index))
    {
        return Err(ProtoError::FieldMismatch {
            packet,
            index: *index,
        });
    }
    Ok(())
}

/// Decodes one value per spec, consuming from `input`.
pub fn decode_fields(packet: &'static str, specs: &[FieldSpec], input: &mut &[u8]) -> Result<Fields> {
    let mut fields = Fields {
        packet,
        values: Vec::with_capacity(specs.len()),
    };
    for spec in specs {
        let value = decode_value(packet, &spec.kind, input)?;
        fields.values.push((spec.index, value));
    }
    Ok(fields)
}

fn encode_value(
    packet: &'static str,
    index: u8,
    kind: &FieldKind,
    value: &Value,
    out: &mut Vec<u8>,
) -> Result<()> {
    match (kind, value) {
        (FieldKind::Bool, Value::Bool(v)) => write_bool(out, *v),
        (FieldKind::Byte, Value::Byte(v)) => out.push(*v as u8),
        (FieldKind::UByte, Value::UByte(v)) | (FieldKind::Angle, Value::Angle(v)) => out.push(*v),
        (FieldKind::Short, Value::Short(v)) => out.extend_from_slice(&v.to_be_bytes()),
        (FieldKind::UShort, Value::UShort(v)) => out.extend_from_slice(&v.to_be_bytes()),
        (FieldKind::Int, Value::Int(v)) => out.extend_from_slice(&v.to_be_bytes()),
        (FieldKind::Long, Value::Long(v)) => out.extend_from_slice(&v.to_be_bytes()),
        (FieldKind::Float, Value::Float(v)) => out.extend_from_slice(&v.to_be_bytes()),
        (FieldKind::Double, Value::Double(v)) => out.extend_from_slice(&v.to_be_bytes()),
        (FieldKind::VarInt, Value::VarInt(v)) => write_varint(out, *v),
        (FieldKind::Str { max }, Value::Str(v)) => write_string_bounded(out, v, *max)?,
        (FieldKind::Uuid, Value::Uuid(v)) => write_uuid(out, v),
        (FieldKind::Position, Value::Position(v)) => write_position(out, v),
        (FieldKind::Slot, Value::Slot(v)) => write_slot(out, v.as_ref())?,
        (FieldKind::Enum(table), Value::Enum(v)) => {
            if !table.contains(*v) {
                return Err(ProtoError::InvalidEnum {
                    table: table.name,
                    value: *v,
                });
            }
            write_varint(out, *v);
        }
        (FieldKind::Optional(inner), Value::Optional(v)) => {
            write_bool(out, v.is_some());
            if let Some(v) = v {
                encode_value(packet, index, inner, v, out)?;
            }
        }
        (FieldKind::Seq(inner), Value::Seq(items)) => {
            write_len(out, items.len())?;
            for item in items {
                encode_value(packet, index, inner, item, out)?;
            }
        }
        (FieldKind::Map { key, value }, Value::Map(entries)) => {
            write_len(out, entries.len())?;
            for (k, v) in entries {
                encode_value(packet, index, key, k, out)?;
                encode_value(packet, index, value, v, out)?;
            }
        }
        (FieldKind::Struct(specs), Value::Struct(fields)) => {
            encode_fields(packet, specs, fields, out)?;
        }
        _ => return Err(ProtoError::FieldMismatch { packet, index }),
    }
    Ok(())
}

fn decode_value(packet: &'static str, kind: &FieldKind, input: &mut &[u8]) -> Result<Value> {
    let value = match kind {
        FieldKind::Bool => Value::Bool(read_bool(input)?),
        FieldKind::Byte => Value::Byte(read_u8(input)? as i8),
        FieldKind::UByte => Value::UByte(read_u8(input)?),
        FieldKind::Angle => Value::Angle(read_u8(input)?),
        FieldKind::Short => Value::Short(read_i16_be(input)?),
        FieldKind::UShort => Value::UShort(read_u16_be(input)?),
        FieldKind::Int => Value::Int(read_i32_be(input)?),
        FieldKind::Long => Value::Long(read_i64_be(input)?),
        FieldKind::Float => Value::Float(read_f32_be(input)?),
        FieldKind::Double => Value::Double(read_f64_be(input)?),
        FieldKind::VarInt => Value::VarInt(read_varint(input)?),
        FieldKind::Str { max } => Value::Str(read_string_bounded(input, *max)?),
        FieldKind::Uuid => Value::Uuid(read_uuid(input)?),
        FieldKind::Position => Value::Position(read_position(input)?),
        FieldKind::Slot => Value::Slot(read_slot(input)?),
        FieldKind::Enum(table) => {
            let raw = read_varint(input)?;
            if !table.contains(raw) {
                return Err(ProtoError::InvalidEnum {
                    table: table.name,
                    value: raw,
                });
            }
            Value::Enum(raw)
        }
        FieldKind::Optional(inner) => {
            if read_bool(input)? {
                Value::Optional(Some(Box::new(decode_value(packet, inner, input)?)))
            } else {
                Value::Optional(None)
            }
        }
        FieldKind::Seq(inner) => {
            let len = read_len(input)?;
            let mut items = Vec::with_capacity(len);
            for _ in 0..len {
                items.push(decode_value(packet, inner, input)?);
            }
            Value::Seq(items)
        }
        FieldKind::Map { key, value } => {
            let len = read_len(input)?;
            let mut entries = Vec::with_capacity(len);
            for _ in 0..len {
                let k = decode_value(packet, key, input)?;
                let v = decode_value(packet, value, input)?;
                entries.push((k, v));
            }
            Value::Map(entries)
        }
        FieldKind::Struct(specs) => Value::Struct(decode_fields(packet, specs, input)?),
    };
    Ok(value)
}

fn write_slot(out: &mut Vec<u8>, slot: Option<&ItemStack>) -> Result<()> {
    let Some(stack) = slot else {
        write_varint(out, 0);
        return Ok(());
    };
    if stack.count == 0 || stack.count > MAX_STACK_SIZE {
        return Err(ProtoError::InvalidItemCount(i32::from(stack.count)));
    }
    write_varint(out, i32::from(stack.count));
    write_varint(out, stack.item);
    write_len(out, stack.meta.len())?;
    for (key, value) in &stack.meta {
        write_string_bounded(out, key, META_KEY_MAX)?;
        write_string_bounded(out, value, META_VALUE_MAX)?;
    }
    Ok(())
}

fn read_slot(input: &mut &[u8]) -> Result<Option<ItemStack>> {
    let count = read_varint(input)?;
    if count == 0 {
        return Ok(None);
    }
    if !(1..=i32::from(MAX_STACK_SIZE)).contains(&count) {
        return Err(ProtoError::InvalidItemCount(count));
    }
    let item = read_varint(input)?;
    let len = read_len(input)?;
    let mut meta = BTreeMap::new();
    for _ in 0..len {
        let key = read_string_bounded(input, META_KEY_MAX)?;
        let value = read_string_bounded(input, META_VALUE_MAX)?;
        meta.insert(key, value);
    }
    Ok(Some(ItemStack {
        item,
        count: count as u8,
        meta,
    }))
}
