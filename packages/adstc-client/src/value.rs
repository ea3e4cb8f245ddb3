//! The pure value codec: `(bytes, type descriptor) -> typed value` and
//! back. Useful on its own for decoding notification payloads without a
//! round trip through the PLC.

use crate::error::ClientError;
use crate::types::{TypeDescriptor, TypeKind};
use adstc_core::ads::strings;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};

/// A decoded PLC value.
#[derive(Debug, Clone, PartialEq)]
pub enum PlcValue {
    Bool(bool),
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Real32(f32),
    Real64(f64),
    String(String),
    WString(String),
    /// `TIME`: a millisecond duration.
    Time(TimeDelta),
    /// `TIME_OF_DAY`: milliseconds since midnight.
    TimeOfDay(TimeDelta),
    /// `DATE`: whole days, carried at midnight UTC.
    Date(DateTime<Utc>),
    /// `DATE_AND_TIME`: second resolution.
    DateTime(DateTime<Utc>),
    Array(Vec<PlcValue>),
    /// Field name and value, in declaration order.
    Struct(Vec<(String, PlcValue)>),
    /// Bytes of a kind the codec does not interpret.
    Raw(Vec<u8>),
}

impl PlcValue {
    /// A short label for error messages.
    fn label(&self) -> &'static str {
        match self {
            Self::Bool(_) => "BOOL",
            Self::Int8(_) => "SINT",
            Self::UInt8(_) => "BYTE",
            Self::Int16(_) => "INT",
            Self::UInt16(_) => "WORD",
            Self::Int32(_) => "DINT",
            Self::UInt32(_) => "UDINT",
            Self::Int64(_) => "LINT",
            Self::UInt64(_) => "LWORD",
            Self::Real32(_) => "REAL",
            Self::Real64(_) => "LREAL",
            Self::String(_) => "STRING",
            Self::WString(_) => "WSTRING",
            Self::Time(_) => "TIME",
            Self::TimeOfDay(_) => "TIME_OF_DAY",
            Self::Date(_) => "DATE",
            Self::DateTime(_) => "DATE_AND_TIME",
            Self::Array(_) => "ARRAY",
            Self::Struct(_) => "STRUCT",
            Self::Raw(_) => "RAW",
        }
    }
}

fn wrong_size(ty: &TypeDescriptor, got: usize) -> ClientError {
    ClientError::protocol(
        "value decode",
        format!("type {} is {} bytes but buffer holds {got}", ty.name, ty.size),
    )
}

fn mismatch(ty: &TypeDescriptor, value: &PlcValue) -> ClientError {
    ClientError::validation(
        "value",
        format!("cannot encode {} into type {}", value.label(), ty.name),
    )
}

fn le<const N: usize>(bytes: &[u8]) -> [u8; N] {
    bytes[..N].try_into().unwrap()
}

/// Total element count of an array descriptor.
fn element_count(ty: &TypeDescriptor) -> u64 {
    ty.dims.iter().map(|d| d.length as u64).product()
}

/// Decodes `bytes` as one value of type `ty`. The buffer must match the
/// type's declared size exactly.
pub fn decode_value(ty: &TypeDescriptor, bytes: &[u8]) -> Result<PlcValue, ClientError> {
    if bytes.len() != ty.size as usize {
        return Err(wrong_size(ty, bytes.len()));
    }

    Ok(match ty.kind {
        TypeKind::Bool => PlcValue::Bool(bytes[0] != 0),
        TypeKind::Int8 => PlcValue::Int8(bytes[0] as i8),
        TypeKind::UInt8 => PlcValue::UInt8(bytes[0]),
        TypeKind::Int16 => PlcValue::Int16(i16::from_le_bytes(le(bytes))),
        TypeKind::UInt16 => PlcValue::UInt16(u16::from_le_bytes(le(bytes))),
        TypeKind::Int32 => PlcValue::Int32(i32::from_le_bytes(le(bytes))),
        TypeKind::UInt32 => PlcValue::UInt32(u32::from_le_bytes(le(bytes))),
        TypeKind::Int64 => PlcValue::Int64(i64::from_le_bytes(le(bytes))),
        TypeKind::UInt64 => PlcValue::UInt64(u64::from_le_bytes(le(bytes))),
        TypeKind::Real32 => PlcValue::Real32(f32::from_le_bytes(le(bytes))),
        TypeKind::Real64 => PlcValue::Real64(f64::from_le_bytes(le(bytes))),
        TypeKind::String => PlcValue::String(strings::decode_string(bytes)),
        TypeKind::WString => PlcValue::WString(
            strings::decode_wstring(bytes).map_err(|e| ClientError::protocol("value decode", e))?,
        ),
        TypeKind::Time => {
            PlcValue::Time(TimeDelta::milliseconds(u32::from_le_bytes(le(bytes)) as i64))
        }
        TypeKind::TimeOfDay => {
            PlcValue::TimeOfDay(TimeDelta::milliseconds(u32::from_le_bytes(le(bytes)) as i64))
        }
        TypeKind::Date => PlcValue::Date(unix_seconds(u32::from_le_bytes(le(bytes)))),
        TypeKind::DateTime => PlcValue::DateTime(unix_seconds(u32::from_le_bytes(le(bytes)))),
        TypeKind::Array => {
            let element = ty
                .element
                .as_ref()
                .ok_or_else(|| ClientError::protocol("value decode", "array without element type"))?;
            let stride = element.size as usize;
            let count = element_count(ty) as usize;
            let mut values = Vec::with_capacity(count);
            for i in 0..count {
                values.push(decode_value(element, &bytes[i * stride..(i + 1) * stride])?);
            }
            PlcValue::Array(values)
        }
        TypeKind::Struct => {
            let mut fields = Vec::with_capacity(ty.fields.len());
            for field in &ty.fields {
                let start = field.offset as usize;
                let end = start + field.ty.size as usize;
                fields.push((field.name.clone(), decode_value(&field.ty, &bytes[start..end])?));
            }
            PlcValue::Struct(fields)
        }
        TypeKind::Opaque => PlcValue::Raw(bytes.to_vec()),
    })
}

/// Encodes `value` into the wire form of type `ty`, producing exactly
/// `ty.size` bytes.
pub fn encode_value(ty: &TypeDescriptor, value: &PlcValue) -> Result<Vec<u8>, ClientError> {
    Ok(match (ty.kind, value) {
        (TypeKind::Bool, PlcValue::Bool(v)) => vec![*v as u8],
        (TypeKind::Int8, PlcValue::Int8(v)) => vec![*v as u8],
        (TypeKind::UInt8, PlcValue::UInt8(v)) => vec![*v],
        (TypeKind::Int16, PlcValue::Int16(v)) => v.to_le_bytes().to_vec(),
        (TypeKind::UInt16, PlcValue::UInt16(v)) => v.to_le_bytes().to_vec(),
        (TypeKind::Int32, PlcValue::Int32(v)) => v.to_le_bytes().to_vec(),
        (TypeKind::UInt32, PlcValue::UInt32(v)) => v.to_le_bytes().to_vec(),
        (TypeKind::Int64, PlcValue::Int64(v)) => v.to_le_bytes().to_vec(),
        (TypeKind::UInt64, PlcValue::UInt64(v)) => v.to_le_bytes().to_vec(),
        (TypeKind::Real32, PlcValue::Real32(v)) => v.to_le_bytes().to_vec(),
        (TypeKind::Real64, PlcValue::Real64(v)) => v.to_le_bytes().to_vec(),
        (TypeKind::String, PlcValue::String(s)) => strings::encode_string(s, ty.size as usize)
            .map_err(|e| ClientError::validation("value", e))?,
        (TypeKind::WString, PlcValue::WString(s)) => strings::encode_wstring(s, ty.size as usize)
            .map_err(|e| ClientError::validation("value", e))?,
        (TypeKind::Time, PlcValue::Time(delta))
        | (TypeKind::TimeOfDay, PlcValue::TimeOfDay(delta)) => {
            let ms = delta.num_milliseconds();
            let ms = u32::try_from(ms).map_err(|_| {
                ClientError::validation("value", format!("{ms} ms does not fit a 32-bit TIME"))
            })?;
            ms.to_le_bytes().to_vec()
        }
        (TypeKind::Date, PlcValue::Date(dt)) | (TypeKind::DateTime, PlcValue::DateTime(dt)) => {
            let secs = dt.timestamp();
            let secs = u32::try_from(secs).map_err(|_| {
                ClientError::validation("value", format!("{dt} does not fit a 32-bit DATE"))
            })?;
            secs.to_le_bytes().to_vec()
        }
        (TypeKind::Array, PlcValue::Array(values)) => {
            let element = ty
                .element
                .as_ref()
                .ok_or_else(|| ClientError::protocol("value encode", "array without element type"))?;
            let count = element_count(ty) as usize;
            if values.len() != count {
                return Err(ClientError::validation(
                    "value",
                    format!("array of {} elements given for {}", values.len(), ty.name),
                ));
            }
            let mut buf = vec![0u8; ty.size as usize];
            let stride = element.size as usize;
            for (i, item) in values.iter().enumerate() {
                buf[i * stride..(i + 1) * stride].copy_from_slice(&encode_value(element, item)?);
            }
            buf
        }
        (TypeKind::Struct, PlcValue::Struct(pairs)) => {
            let mut buf = vec![0u8; ty.size as usize];
            for (name, item) in pairs {
                let field = ty.field(name).ok_or_else(|| ClientError::FieldNotFound {
                    type_name: ty.name.clone(),
                    field: name.clone(),
                })?;
                let start = field.offset as usize;
                let end = start + field.ty.size as usize;
                buf[start..end].copy_from_slice(&encode_value(&field.ty, item)?);
            }
            buf
        }
        (TypeKind::Opaque, PlcValue::Raw(bytes)) => {
            if bytes.len() != ty.size as usize {
                return Err(ClientError::validation(
                    "value",
                    format!("{} raw bytes given for {}-byte type", bytes.len(), ty.size),
                ));
            }
            bytes.clone()
        }
        _ => return Err(mismatch(ty, value)),
    })
}

fn unix_seconds(secs: u32) -> DateTime<Utc> {
    Utc.timestamp_opt(secs as i64, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}
