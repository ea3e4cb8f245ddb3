use crate::error::ClientError;
use adstc_core::ads::strings;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// One entry of the PLC's flat symbol directory: a named byte region in the
/// device's address space.
///
/// Names are case-sensitive as uploaded, but lookups are case-insensitive,
/// matching how TwinCAT treats identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub index_group: u32,
    pub index_offset: u32,
    pub size: u32,
    /// Raw data-type code from the upload.
    pub data_type: u32,
    pub flags: u32,
    pub type_name: String,
    pub comment: String,
}

/// Parses the upload-info blob: symbol count, then the byte size of the
/// full table blob. Later TwinCAT versions append further counters, which
/// are ignored.
pub(crate) fn parse_upload_info(bytes: &[u8]) -> Result<(u32, u32), ClientError> {
    if bytes.len() < 8 {
        return Err(ClientError::protocol(
            "symbol upload info",
            format!("expected at least 8 bytes, got {}", bytes.len()),
        ));
    }
    let count = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
    let size = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
    Ok((count, size))
}

/// Parses the symbol-table blob: a concatenation of variable-length
/// entries, each led by its own total length. A zero length terminates.
///
/// Entry layout after the 4 length bytes: ig(4) + io(4) + size(4) +
/// data_type(4) + flags(4) + name_len(2) + type_len(2) + comment_len(2),
/// then the three NUL-terminated strings. Entries may carry padding up to
/// their declared length; the length field is what advances the walk.
pub(crate) fn parse_symbol_table(blob: &[u8]) -> Result<Vec<Symbol>, ClientError> {
    const FIXED: usize = 4 + 5 * 4 + 3 * 2;

    let mut symbols = Vec::new();
    let mut rest = blob;

    while rest.len() >= 4 {
        let entry_len = u32::from_le_bytes(rest[0..4].try_into().unwrap()) as usize;
        if entry_len == 0 {
            break;
        }
        if entry_len < FIXED || entry_len > rest.len() {
            return Err(ClientError::protocol(
                "symbol table",
                format!(
                    "entry length {entry_len} out of bounds ({} bytes remain)",
                    rest.len()
                ),
            ));
        }

        let entry = &rest[..entry_len];
        let index_group = u32::from_le_bytes(entry[4..8].try_into().unwrap());
        let index_offset = u32::from_le_bytes(entry[8..12].try_into().unwrap());
        let size = u32::from_le_bytes(entry[12..16].try_into().unwrap());
        let data_type = u32::from_le_bytes(entry[16..20].try_into().unwrap());
        let flags = u32::from_le_bytes(entry[20..24].try_into().unwrap());
        let name_len = u16::from_le_bytes(entry[24..26].try_into().unwrap()) as usize;
        let type_len = u16::from_le_bytes(entry[26..28].try_into().unwrap()) as usize;
        let comment_len = u16::from_le_bytes(entry[28..30].try_into().unwrap()) as usize;

        // Each string occupies its declared length plus a NUL.
        let strings_len = name_len + 1 + type_len + 1 + comment_len + 1;
        if FIXED + strings_len > entry_len {
            return Err(ClientError::protocol(
                "symbol table",
                format!("entry strings overrun the declared length {entry_len}"),
            ));
        }

        let name_start = FIXED;
        let type_start = name_start + name_len + 1;
        let comment_start = type_start + type_len + 1;

        symbols.push(Symbol {
            name: strings::decode_string(&entry[name_start..name_start + name_len]),
            index_group,
            index_offset,
            size,
            data_type,
            flags,
            type_name: strings::decode_string(&entry[type_start..type_start + type_len]),
            comment: strings::decode_string(&entry[comment_start..comment_start + comment_len]),
        });

        rest = &rest[entry_len..];
    }

    Ok(symbols)
}

/// The downloaded symbol directory, keyed for case-insensitive lookup.
///
/// Read-heavy: every name-based operation consults it, while writes happen
/// only on the first lazy load and on explicit refresh. A refresh swaps the
/// whole map atomically, so concurrent lookups see either the old table or
/// the new one, never a torn state.
pub(crate) struct SymbolTable {
    map: RwLock<Option<Arc<HashMap<String, Arc<Symbol>>>>>,
}

impl SymbolTable {
    pub(crate) fn new() -> Self {
        Self {
            map: RwLock::new(None),
        }
    }

    pub(crate) fn is_loaded(&self) -> bool {
        self.map.read().unwrap().is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.map
            .read()
            .unwrap()
            .as_ref()
            .map(|m| m.len())
            .unwrap_or(0)
    }

    /// Replaces the table wholesale.
    pub(crate) fn replace(&self, symbols: Vec<Symbol>) {
        let map: HashMap<String, Arc<Symbol>> = symbols
            .into_iter()
            .map(|s| (s.name.to_uppercase(), Arc::new(s)))
            .collect();
        *self.map.write().unwrap() = Some(Arc::new(map));
    }

    /// Forgets the table so the next name-based operation reloads it.
    pub(crate) fn clear(&self) {
        *self.map.write().unwrap() = None;
    }

    /// Case-insensitive lookup by full name. `None` when the table is not
    /// loaded yet or the name is absent - callers distinguish the two via
    /// [`is_loaded`](Self::is_loaded).
    pub(crate) fn lookup(&self, name: &str) -> Option<Arc<Symbol>> {
        self.map
            .read()
            .unwrap()
            .as_ref()
            .and_then(|map| map.get(&name.to_uppercase()).cloned())
    }

    /// Case-insensitive substring search over symbol names, sorted by name.
    pub(crate) fn find(&self, needle: &str) -> Vec<Arc<Symbol>> {
        let needle = needle.to_uppercase();
        let mut hits: Vec<Arc<Symbol>> = self
            .map
            .read()
            .unwrap()
            .as_ref()
            .map(|map| {
                map.iter()
                    .filter(|(key, _)| key.contains(&needle))
                    .map(|(_, symbol)| symbol.clone())
                    .collect()
            })
            .unwrap_or_default();
        hits.sort_by(|a, b| a.name.cmp(&b.name));
        hits
    }
}
