use crate::error::ClientError;

/// Where a name landed: the exact byte region a Read or Write should
/// address, and how many bytes it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Locator {
    pub index_group: u32,
    pub index_offset: u32,
    pub size: u32,
}

/// The textual decomposition of a variable path like `MAIN.arr[5].field`:
/// the dotted base before any bracket, at most one index, and the field
/// path after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParsedName<'a> {
    pub(crate) base: &'a str,
    pub(crate) index: Option<u32>,
    pub(crate) fields: Vec<&'a str>,
}

/// Splits a variable path into base, optional index, and trailing fields.
///
/// Exactly one index step is supported; `a[1][2]` and `a[1,2]` fail with a
/// not-supported error rather than resolving wrongly.
pub(crate) fn parse_name(name: &str) -> Result<ParsedName<'_>, ClientError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ClientError::validation("variable name", "name is empty"));
    }

    let (base, index, tail) = match name.find('[') {
        None => (name, None, ""),
        Some(open) => {
            let base = &name[..open];
            let rest = &name[open + 1..];
            let close = rest.find(']').ok_or_else(|| {
                ClientError::validation("variable name", format!("unclosed index in {name:?}"))
            })?;
            let index_text = rest[..close].trim();

            if index_text.contains(',') {
                return Err(ClientError::unsupported(format!(
                    "multi-dimensional index in {name:?} is not supported"
                )));
            }
            let index: u32 = index_text.parse().map_err(|_| {
                ClientError::validation(
                    "variable name",
                    format!("index {index_text:?} is not a non-negative integer"),
                )
            })?;

            let tail = &rest[close + 1..];
            if tail.starts_with('[') {
                return Err(ClientError::unsupported(format!(
                    "multi-dimensional index in {name:?} is not supported"
                )));
            }
            (base, Some(index), tail)
        }
    };

    if base.is_empty() {
        return Err(ClientError::validation(
            "variable name",
            format!("{name:?} has no symbol before the index"),
        ));
    }
    check_dotted_path(name, base)?;

    let fields: Vec<&str> = match tail {
        "" => Vec::new(),
        tail => {
            let tail = tail.strip_prefix('.').ok_or_else(|| {
                ClientError::validation(
                    "variable name",
                    format!("expected '.' after the index in {name:?}"),
                )
            })?;
            check_dotted_path(name, tail)?;
            tail.split('.').collect()
        }
    };

    Ok(ParsedName {
        base,
        index,
        fields,
    })
}

fn check_dotted_path(full: &str, path: &str) -> Result<(), ClientError> {
    if path.split('.').any(|segment| segment.trim().is_empty()) {
        return Err(ClientError::validation(
            "variable name",
            format!("{full:?} contains an empty path segment"),
        ));
    }
    Ok(())
}
