/// Lexical context of the byte being scanned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    LineComment,
    BlockComment(u32),
    DollarQuoted(String),
}

pub(crate) fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

pub(crate) fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Scan an identifier (`[A-Za-z_][A-Za-z0-9_]*`) starting at `start`.
pub(crate) fn scan_ident(bytes: &[u8], start: usize) -> Option<(usize, &str)> {
    if !bytes.get(start).copied().is_some_and(is_ident_start) {
        return None;
    }
    let mut idx = start + 1;
    while idx < bytes.len() && is_ident_continue(bytes[idx]) {
        idx += 1;
    }
    std::str::from_utf8(&bytes[start..idx])
        .ok()
        .map(|ident| (idx, ident))
}

/// Advance the scanner state over the byte at `idx`.
///
/// Returns the index of the last byte consumed, which is greater than `idx` when a
/// multi-byte token (comment opener, doubled quote, dollar tag) was recognised.
pub(crate) fn step(state: &mut State, bytes: &[u8], idx: usize) -> usize {
    use super::parsers::{
        is_block_comment_end, is_block_comment_start, is_line_comment_start, matches_tag,
        try_start_dollar_quote,
    };

    let b = bytes[idx];
    match state {
        State::Normal => match b {
            b'\'' => *state = State::SingleQuoted,
            b'"' => *state = State::DoubleQuoted,
            _ if is_line_comment_start(bytes, idx) => {
                *state = State::LineComment;
                return idx + 1;
            }
            _ if is_block_comment_start(bytes, idx) => {
                *state = State::BlockComment(1);
                return idx + 1;
            }
            b'$' => {
                if let Some((tag, advance)) = try_start_dollar_quote(bytes, idx) {
                    *state = State::DollarQuoted(tag);
                    return advance;
                }
            }
            _ => {}
        },
        State::SingleQuoted => {
            if b == b'\'' {
                if bytes.get(idx + 1) == Some(&b'\'') {
                    return idx + 1; // escaped quote
                }
                *state = State::Normal;
            }
        }
        State::DoubleQuoted => {
            if b == b'"' {
                if bytes.get(idx + 1) == Some(&b'"') {
                    return idx + 1; // escaped quote
                }
                *state = State::Normal;
            }
        }
        State::LineComment => {
            if b == b'\n' {
                *state = State::Normal;
            }
        }
        State::BlockComment(depth) => {
            let depth = *depth;
            if is_block_comment_start(bytes, idx) {
                *state = State::BlockComment(depth + 1);
                return idx + 1;
            } else if is_block_comment_end(bytes, idx) {
                *state = if depth == 1 {
                    State::Normal
                } else {
                    State::BlockComment(depth - 1)
                };
                return idx + 1;
            }
        }
        State::DollarQuoted(tag) => {
            if b == b'$' && matches_tag(bytes, idx, tag) {
                let end = idx + tag.len() + 1;
                *state = State::Normal;
                return end;
            }
        }
    }
    idx
}
