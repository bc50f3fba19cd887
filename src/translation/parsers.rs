use super::scanner::scan_ident;

pub(crate) fn is_line_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'-') && bytes.get(idx + 1) == Some(&b'-')
}

pub(crate) fn is_block_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'/') && bytes.get(idx + 1) == Some(&b'*')
}

pub(crate) fn is_block_comment_end(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'*') && bytes.get(idx + 1) == Some(&b'/')
}

pub(crate) fn try_start_dollar_quote(bytes: &[u8], start: usize) -> Option<(String, usize)> {
    let mut idx = start + 1;
    while idx < bytes.len() && bytes[idx] != b'$' {
        let b = bytes[idx];
        if !(b.is_ascii_alphanumeric() || b == b'_') {
            return None;
        }
        idx += 1;
    }

    if idx < bytes.len() && bytes[idx] == b'$' {
        let tag = String::from_utf8(bytes[start + 1..idx].to_vec()).ok()?;
        Some((tag, idx))
    } else {
        None
    }
}

pub(crate) fn matches_tag(bytes: &[u8], idx: usize, tag: &str) -> bool {
    let end = idx + 1 + tag.len();
    end < bytes.len()
        && bytes[idx + 1..end].starts_with(tag.as_bytes())
        && bytes.get(end) == Some(&b'$')
}

/// A symbolic placeholder found in a template, e.g. `:t:ids`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawPlaceholder<'a> {
    /// The kind code between the colons, `None` for a bare `:name`.
    pub kind: Option<&'a str>,
    pub name: &'a str,
    /// Index one past the placeholder's last byte.
    pub end: usize,
}

/// Parse a placeholder whose leading `:` is at `start`.
///
/// The caller is responsible for rejecting colons preceded by `\` or `:`.
pub(crate) fn parse_placeholder(bytes: &[u8], start: usize) -> Option<RawPlaceholder<'_>> {
    let (ident_end, ident) = scan_ident(bytes, start + 1)?;

    // `:kind:name`, where kind may carry a trailing `*`
    let mut kind_end = ident_end;
    if bytes.get(kind_end) == Some(&b'*') {
        kind_end += 1;
    }
    if bytes.get(kind_end) == Some(&b':')
        && let Some((name_end, name)) = scan_ident(bytes, kind_end + 1)
    {
        let kind = std::str::from_utf8(&bytes[start + 1..kind_end]).ok()?;
        return Some(RawPlaceholder {
            kind: Some(kind),
            name,
            end: name_end,
        });
    }

    if kind_end != ident_end {
        // `:name*` with nothing after it is not a placeholder
        return None;
    }
    Some(RawPlaceholder {
        kind: None,
        name: ident,
        end: ident_end,
    })
}
