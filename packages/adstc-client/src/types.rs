use crate::error::ClientError;
use adstc_core::ads::strings;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// The closed set of leaf kinds the value codec understands, plus the two
/// composite shapes. Anything the PLC reports outside this set stays
/// [`Opaque`](TypeKind::Opaque) and decodes to raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Bool,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Real32,
    Real64,
    /// Windows-1252 bytes in a fixed buffer, NUL-terminated.
    String,
    /// UTF-16LE in a fixed buffer, NUL-terminated.
    WString,
    /// Milliseconds as u32.
    Time,
    /// Milliseconds since midnight as u32.
    TimeOfDay,
    /// Seconds since the Unix epoch as u32.
    Date,
    /// Seconds since the Unix epoch as u32.
    DateTime,
    Array,
    Struct,
    /// Not in the closed set; handled as raw bytes.
    Opaque,
}

impl TypeKind {
    /// Size every value of this kind occupies, when the kind dictates one.
    /// Strings and composites take their size from the declaration instead.
    pub fn fixed_size(&self) -> Option<u32> {
        match self {
            Self::Bool | Self::Int8 | Self::UInt8 => Some(1),
            Self::Int16 | Self::UInt16 => Some(2),
            Self::Int32 | Self::UInt32 | Self::Real32 => Some(4),
            Self::Time | Self::TimeOfDay | Self::Date | Self::DateTime => Some(4),
            Self::Int64 | Self::UInt64 | Self::Real64 => Some(8),
            _ => None,
        }
    }

    /// Recognizes a primitive from its IEC type name, including the usual
    /// aliases. `STRING(n)` and `WSTRING(n)` match by prefix.
    pub fn from_type_name(name: &str) -> Option<Self> {
        let upper = name.trim().to_uppercase();
        if upper.starts_with("WSTRING") {
            return Some(Self::WString);
        }
        if upper.starts_with("STRING") {
            return Some(Self::String);
        }

        Some(match upper.as_str() {
            "BOOL" | "BIT" => Self::Bool,
            "SINT" | "INT8" => Self::Int8,
            "BYTE" | "USINT" | "UINT8" => Self::UInt8,
            "INT" | "INT16" => Self::Int16,
            "WORD" | "UINT" | "UINT16" => Self::UInt16,
            "DINT" | "INT32" => Self::Int32,
            "DWORD" | "UDINT" | "UINT32" => Self::UInt32,
            "LINT" | "INT64" => Self::Int64,
            "LWORD" | "ULINT" | "UINT64" => Self::UInt64,
            "REAL" | "REAL32" => Self::Real32,
            "LREAL" | "REAL64" => Self::Real64,
            "TIME" => Self::Time,
            "TIME_OF_DAY" | "TOD" => Self::TimeOfDay,
            "DATE" => Self::Date,
            "DATE_AND_TIME" | "DT" => Self::DateTime,
            _ => return None,
        })
    }

    /// Recognizes a primitive from the upload's data-type code. Time kinds
    /// never appear here; the PLC reports them as plain 32-bit integers and
    /// only the type name tells them apart.
    pub fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            2 => Self::Int16,
            3 => Self::Int32,
            4 => Self::Real32,
            5 => Self::Real64,
            16 => Self::Int8,
            17 => Self::UInt8,
            18 => Self::UInt16,
            19 => Self::UInt32,
            20 => Self::Int64,
            21 => Self::UInt64,
            30 => Self::String,
            31 => Self::WString,
            33 => Self::Bool,
            _ => return None,
        })
    }

    pub fn is_primitive(&self) -> bool {
        !matches!(self, Self::Array | Self::Struct | Self::Opaque)
    }
}

/// One dimension of an array type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArrayDim {
    pub lower: i32,
    pub length: u32,
}

/// A named field inside a structured type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    /// Byte offset within the parent.
    pub offset: u32,
    pub ty: Arc<TypeDescriptor>,
}

/// A fully materialized description of a PLC data type.
///
/// Descriptors form a tree: arrays hold their element, structs hold their
/// fields. The registry materializes them on demand and caches by name, so
/// types that reference each other resolve through the cache rather than by
/// pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub name: String,
    pub kind: TypeKind,
    pub size: u32,
    /// Dimensions, outermost first. Non-empty exactly for arrays.
    pub dims: Vec<ArrayDim>,
    /// Element type. Present exactly for arrays.
    pub element: Option<Arc<TypeDescriptor>>,
    /// Fields ordered by declaration. Populated for structs.
    pub fields: Vec<Field>,
}

impl TypeDescriptor {
    /// A leaf descriptor with no structure.
    pub fn primitive(name: impl Into<String>, kind: TypeKind, size: u32) -> Self {
        Self {
            name: name.into(),
            kind,
            size,
            dims: Vec::new(),
            element: None,
            fields: Vec::new(),
        }
    }

    /// Case-insensitive field lookup.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
    }

    /// Checks the layout invariant: every field's byte range lies inside
    /// the parent. Padding between fields is fine; overhang is not.
    pub(crate) fn check_field_bounds(&self) -> Result<(), ClientError> {
        for field in &self.fields {
            let end = field.offset as u64 + field.ty.size as u64;
            if end > self.size as u64 {
                return Err(ClientError::protocol(
                    "type resolution",
                    format!(
                        "field {}.{} spans [{}, {end}) past the parent's {} bytes",
                        self.name, field.name, field.offset, self.size
                    ),
                ));
            }
        }
        Ok(())
    }
}

/// Buffer size implied by a string type name: `STRING(n)` needs `n + 1`
/// bytes, `WSTRING(n)` needs `2n + 2`. Bare names default to 80 characters.
pub(crate) fn string_size_from_name(name: &str) -> Option<u32> {
    let upper = name.trim().to_uppercase();
    let (wide, rest) = if let Some(rest) = upper.strip_prefix("WSTRING") {
        (true, rest)
    } else if let Some(rest) = upper.strip_prefix("STRING") {
        (false, rest)
    } else {
        return None;
    };

    let chars: u32 = if rest.is_empty() {
        80
    } else {
        rest.strip_prefix('(')?
            .strip_suffix(')')?
            .trim()
            .parse()
            .ok()?
    };

    Some(if wide { 2 * chars + 2 } else { chars + 1 })
}

/// Extracts dimensions and element type from an `ARRAY [lo..hi] OF ELEM`
/// type name. Returns `None` when the name is not an array at all.
pub(crate) fn parse_array_type(name: &str) -> Option<(Vec<ArrayDim>, &str)> {
    let trimmed = name.trim();
    if !trimmed.to_uppercase().starts_with("ARRAY") {
        return None;
    }
    let after = trimmed["ARRAY".len()..].trim_start();
    let open = after.strip_prefix('[')?;
    let close = open.find(']')?;
    let (ranges, rest) = (&open[..close], &open[close + 1..]);

    let rest = rest.trim_start();
    let upper_rest = rest.to_uppercase();
    let element = if upper_rest.starts_with("OF ") || upper_rest.starts_with("OF\t") {
        rest["OF".len()..].trim()
    } else {
        return None;
    };
    if element.is_empty() {
        return None;
    }

    let mut dims = Vec::new();
    for range in ranges.split(',') {
        let (lo, hi) = range.split_once("..")?;
        let lo: i32 = lo.trim().parse().ok()?;
        let hi: i32 = hi.trim().parse().ok()?;
        if hi < lo {
            return None;
        }
        dims.push(ArrayDim {
            lower: lo,
            length: (hi - lo + 1) as u32,
        });
    }

    Some((dims, element))
}

/// The raw record the device returns for one data type: fixed header,
/// three strings, dimension records, then the sub-item records with the
/// same shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawTypeEntry {
    pub(crate) name: String,
    pub(crate) type_name: String,
    pub(crate) comment: String,
    pub(crate) size: u32,
    /// Byte offset within the parent, meaningful for sub-items.
    pub(crate) offset: u32,
    pub(crate) data_type: u32,
    pub(crate) flags: u32,
    pub(crate) dims: Vec<ArrayDim>,
    pub(crate) sub_items: Vec<RawTypeEntry>,
}

/// Fixed part of a data-type record before its strings.
const TYPE_ENTRY_FIXED: usize = 8 * 4 + 5 * 2;

/// Parses one data-type record, which must fill `bytes` exactly.
pub(crate) fn parse_type_entry(bytes: &[u8]) -> Result<RawTypeEntry, ClientError> {
    let (entry, consumed) = parse_type_entry_at(bytes)?;
    if consumed != bytes.len() {
        return Err(ClientError::protocol(
            "data type upload",
            format!("{} trailing bytes after type record", bytes.len() - consumed),
        ));
    }
    Ok(entry)
}

fn parse_type_entry_at(bytes: &[u8]) -> Result<(RawTypeEntry, usize), ClientError> {
    let fail = |reason: String| ClientError::protocol("data type upload", reason);

    if bytes.len() < TYPE_ENTRY_FIXED {
        return Err(fail(format!(
            "type record header needs {TYPE_ENTRY_FIXED} bytes, got {}",
            bytes.len()
        )));
    }

    let entry_len = u32::from_le_bytes(bytes[0..4].try_into().unwrap()) as usize;
    if entry_len < TYPE_ENTRY_FIXED || entry_len > bytes.len() {
        return Err(fail(format!(
            "type record length {entry_len} out of bounds ({} bytes remain)",
            bytes.len()
        )));
    }
    let entry = &bytes[..entry_len];

    let size = u32::from_le_bytes(entry[16..20].try_into().unwrap());
    let offset = u32::from_le_bytes(entry[20..24].try_into().unwrap());
    let data_type = u32::from_le_bytes(entry[24..28].try_into().unwrap());
    let flags = u32::from_le_bytes(entry[28..32].try_into().unwrap());
    let name_len = u16::from_le_bytes(entry[32..34].try_into().unwrap()) as usize;
    let type_len = u16::from_le_bytes(entry[34..36].try_into().unwrap()) as usize;
    let comment_len = u16::from_le_bytes(entry[36..38].try_into().unwrap()) as usize;
    let array_dim = u16::from_le_bytes(entry[38..40].try_into().unwrap()) as usize;
    let sub_count = u16::from_le_bytes(entry[40..42].try_into().unwrap()) as usize;

    let strings_len = name_len + 1 + type_len + 1 + comment_len + 1;
    let dims_len = array_dim * 8;
    if TYPE_ENTRY_FIXED + strings_len + dims_len > entry_len {
        return Err(fail(format!(
            "type record strings and dimensions overrun the declared length {entry_len}"
        )));
    }

    let name_start = TYPE_ENTRY_FIXED;
    let type_start = name_start + name_len + 1;
    let comment_start = type_start + type_len + 1;
    let dims_start = comment_start + comment_len + 1;

    let name = strings::decode_string(&entry[name_start..name_start + name_len]);
    let type_name = strings::decode_string(&entry[type_start..type_start + type_len]);
    let comment = strings::decode_string(&entry[comment_start..comment_start + comment_len]);

    let mut dims = Vec::with_capacity(array_dim);
    for i in 0..array_dim {
        let at = dims_start + i * 8;
        dims.push(ArrayDim {
            lower: i32::from_le_bytes(entry[at..at + 4].try_into().unwrap()),
            length: u32::from_le_bytes(entry[at + 4..at + 8].try_into().unwrap()),
        });
    }

    let mut sub_items = Vec::with_capacity(sub_count);
    let mut cursor = dims_start + dims_len;
    for _ in 0..sub_count {
        let (sub, consumed) = parse_type_entry_at(&entry[cursor..])?;
        sub_items.push(sub);
        cursor += consumed;
    }

    Ok((
        RawTypeEntry {
            name,
            type_name,
            comment,
            size,
            offset,
            data_type,
            flags,
            dims,
            sub_items,
        },
        entry_len,
    ))
}

/// The descriptor cache: many readers, a writer per first-time fetch.
pub(crate) struct TypeRegistry {
    cache: RwLock<HashMap<String, Arc<TypeDescriptor>>>,
}

impl TypeRegistry {
    pub(crate) fn new() -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) fn get(&self, name: &str) -> Option<Arc<TypeDescriptor>> {
        self.cache
            .read()
            .unwrap()
            .get(&name.trim().to_uppercase())
            .cloned()
    }

    pub(crate) fn insert(&self, descriptor: Arc<TypeDescriptor>) {
        self.cache
            .write()
            .unwrap()
            .insert(descriptor.name.trim().to_uppercase(), descriptor);
    }

    pub(crate) fn clear(&self) {
        self.cache.write().unwrap().clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.cache.read().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn encode_type_entry(entry: &RawTypeEntry) -> Vec<u8> {
        let subs: Vec<Vec<u8>> = entry.sub_items.iter().map(encode_type_entry).collect();
        let subs_len: usize = subs.iter().map(Vec::len).sum();
        let strings_len = entry.name.len() + 1 + entry.type_name.len() + 1 + entry.comment.len() + 1;
        let entry_len = TYPE_ENTRY_FIXED + strings_len + entry.dims.len() * 8 + subs_len;

        let mut buf = Vec::with_capacity(entry_len);
        buf.extend_from_slice(&(entry_len as u32).to_le_bytes());
        buf.extend_from_slice(&1u32.to_le_bytes()); // version
        buf.extend_from_slice(&0u32.to_le_bytes()); // hash
        buf.extend_from_slice(&0u32.to_le_bytes()); // type hash
        buf.extend_from_slice(&entry.size.to_le_bytes());
        buf.extend_from_slice(&entry.offset.to_le_bytes());
        buf.extend_from_slice(&entry.data_type.to_le_bytes());
        buf.extend_from_slice(&entry.flags.to_le_bytes());
        buf.extend_from_slice(&(entry.name.len() as u16).to_le_bytes());
        buf.extend_from_slice(&(entry.type_name.len() as u16).to_le_bytes());
        buf.extend_from_slice(&(entry.comment.len() as u16).to_le_bytes());
        buf.extend_from_slice(&(entry.dims.len() as u16).to_le_bytes());
        buf.extend_from_slice(&(entry.sub_items.len() as u16).to_le_bytes());
        buf.extend_from_slice(entry.name.as_bytes());
        buf.push(0);
        buf.extend_from_slice(entry.type_name.as_bytes());
        buf.push(0);
        buf.extend_from_slice(entry.comment.as_bytes());
        buf.push(0);
        for dim in &entry.dims {
            buf.extend_from_slice(&dim.lower.to_le_bytes());
            buf.extend_from_slice(&dim.length.to_le_bytes());
        }
        for sub in subs {
            buf.extend_from_slice(&sub);
        }
        buf
    }

    pub(crate) fn leaf_entry(name: &str, type_name: &str, size: u32, offset: u32) -> RawTypeEntry {
        RawTypeEntry {
            name: name.to_string(),
            type_name: type_name.to_string(),
            comment: String::new(),
            size,
            offset,
            data_type: 0,
            flags: 0,
            dims: Vec::new(),
            sub_items: Vec::new(),
        }
    }

    #[test]
    fn primitive_names() {
        assert_eq!(TypeKind::from_type_name("INT"), Some(TypeKind::Int16));
        assert_eq!(TypeKind::from_type_name("udint"), Some(TypeKind::UInt32));
        assert_eq!(TypeKind::from_type_name("LREAL"), Some(TypeKind::Real64));
        assert_eq!(TypeKind::from_type_name("STRING(80)"), Some(TypeKind::String));
        assert_eq!(TypeKind::from_type_name("WSTRING(5)"), Some(TypeKind::WString));
        assert_eq!(TypeKind::from_type_name("TIME"), Some(TypeKind::Time));
        assert_eq!(TypeKind::from_type_name("DT"), Some(TypeKind::DateTime));
        assert_eq!(TypeKind::from_type_name("Sensor"), None);
    }

    #[test]
    fn primitive_codes() {
        assert_eq!(TypeKind::from_code(2), Some(TypeKind::Int16));
        assert_eq!(TypeKind::from_code(4), Some(TypeKind::Real32));
        assert_eq!(TypeKind::from_code(33), Some(TypeKind::Bool));
        assert_eq!(TypeKind::from_code(65), None);
    }

    #[test]
    fn string_sizes() {
        assert_eq!(string_size_from_name("STRING(80)"), Some(81));
        assert_eq!(string_size_from_name("STRING"), Some(81));
        assert_eq!(string_size_from_name("WSTRING(10)"), Some(22));
        assert_eq!(string_size_from_name("INT"), None);
    }

    #[test]
    fn array_name_single_dim() {
        let (dims, elem) = parse_array_type("ARRAY [0..9] OF INT").unwrap();
        assert_eq!(dims, [ArrayDim { lower: 0, length: 10 }]);
        assert_eq!(elem, "INT");
    }

    #[test]
    fn array_name_multi_dim_and_negative_bounds() {
        let (dims, elem) = parse_array_type("ARRAY [-2..2, 1..3] OF Sensor").unwrap();
        assert_eq!(
            dims,
            [
                ArrayDim { lower: -2, length: 5 },
                ArrayDim { lower: 1, length: 3 }
            ]
        );
        assert_eq!(elem, "Sensor");
    }

    #[test]
    fn array_name_rejects_malformed() {
        assert!(parse_array_type("INT").is_none());
        assert!(parse_array_type("ARRAY [5..1] OF INT").is_none());
        assert!(parse_array_type("ARRAY [0..9] INT").is_none());
        assert!(parse_array_type("ARRAY [0..9] OF ").is_none());
    }

    #[test]
    fn parse_struct_entry_with_sub_items() {
        let entry = RawTypeEntry {
            name: "Sensor".to_string(),
            type_name: "Sensor".to_string(),
            comment: "a sensor".to_string(),
            size: 16,
            offset: 0,
            data_type: 65,
            flags: 0,
            dims: Vec::new(),
            sub_items: vec![
                leaf_entry("id", "UDINT", 4, 0),
                leaf_entry("temperature", "REAL", 4, 8),
            ],
        };

        let parsed = parse_type_entry(&encode_type_entry(&entry)).unwrap();
        assert_eq!(parsed, entry);
    }

    #[test]
    fn parse_array_entry_with_dims() {
        let entry = RawTypeEntry {
            name: "ARRAY [0..4] OF INT".to_string(),
            type_name: "INT".to_string(),
            comment: String::new(),
            size: 10,
            offset: 0,
            data_type: 2,
            flags: 0,
            dims: vec![ArrayDim { lower: 0, length: 5 }],
            sub_items: Vec::new(),
        };
        let parsed = parse_type_entry(&encode_type_entry(&entry)).unwrap();
        assert_eq!(parsed.dims, entry.dims);
    }

    #[test]
    fn truncated_entry_is_rejected() {
        let bytes = encode_type_entry(&leaf_entry("x", "INT", 2, 0));
        assert!(parse_type_entry(&bytes[..bytes.len() - 3]).is_err());
    }

    #[test]
    fn field_bounds_invariant() {
        let parent = TypeDescriptor {
            name: "S".to_string(),
            kind: TypeKind::Struct,
            size: 8,
            dims: Vec::new(),
            element: None,
            fields: vec![Field {
                name: "f".to_string(),
                offset: 6,
                ty: Arc::new(TypeDescriptor::primitive("INT", TypeKind::Int16, 2)),
            }],
        };
        assert!(parent.check_field_bounds().is_ok());

        let mut bad = parent.clone();
        bad.fields[0].offset = 7;
        assert!(bad.check_field_bounds().is_err());
    }

    #[test]
    fn registry_is_case_insensitive() {
        let registry = TypeRegistry::new();
        registry.insert(Arc::new(TypeDescriptor::primitive(
            "Sensor",
            TypeKind::Struct,
            16,
        )));
        assert!(registry.get("SENSOR").is_some());
        assert!(registry.get("sensor").is_some());
        assert_eq!(registry.len(), 1);
        registry.clear();
        assert!(registry.get("Sensor").is_none());
    }

    #[test]
    fn descriptor_field_lookup_is_case_insensitive() {
        let desc = TypeDescriptor {
            name: "S".to_string(),
            kind: TypeKind::Struct,
            size: 4,
            dims: Vec::new(),
            element: None,
            fields: vec![Field {
                name: "Speed".to_string(),
                offset: 0,
                ty: Arc::new(TypeDescriptor::primitive("REAL", TypeKind::Real32, 4)),
            }],
        };
        assert!(desc.field("speed").is_some());
        assert!(desc.field("missing").is_none());
    }
}
