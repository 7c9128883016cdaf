//! `_xHHHH_` escapes for string content of `<t>` elements.
//!
//! XML 1.0 cannot carry most C0 control characters, not even as character
//! references, so SpreadsheetML spells them `_x0001_`. An underscore that
//! would read as the start of such an escape is itself written `_x005F_`.

use std::borrow::Cow;

/// Length of `_xHHHH_`.
const ESCAPE_LEN: usize = 7;

fn must_escape(c: char) -> bool {
    (c < ' ' && !matches!(c, '\t' | '\n' | '\r')) || c == '\u{FFFE}' || c == '\u{FFFF}'
}

/// Code point of the escape starting at byte `at`, if there is one.
fn escape_at(text: &str, at: usize) -> Option<u32> {
    let b = text.as_bytes().get(at..at + ESCAPE_LEN)?;
    if b[0] != b'_' || b[1] != b'x' || b[6] != b'_' || !b[2..6].iter().all(u8::is_ascii_hexdigit) {
        return None;
    }
    // Four ASCII hex digits, so the slice is on char boundaries.
    u32::from_str_radix(&text[at + 2..at + 6], 16).ok()
}

/// Text as written into `<t>`.
pub fn escape_text(text: &str) -> Cow<'_, str> {
    let needs = text
        .char_indices()
        .any(|(i, c)| must_escape(c) || (c == '_' && escape_at(text, i).is_some()));
    if !needs {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len() + 8);
    for (i, c) in text.char_indices() {
        if must_escape(c) {
            out.push_str(&format!("_x{:04X}_", c as u32));
        } else if c == '_' && escape_at(text, i).is_some() {
            out.push_str("_x005F_");
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

/// Text as read from `<t>`. Escapes naming no valid character stay literal.
pub fn unescape_text(text: &str) -> Cow<'_, str> {
    if !text.contains("_x") {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < text.len() {
        if let Some(c) = escape_at(text, i).and_then(char::from_u32) {
            out.push(c);
            i += ESCAPE_LEN;
            continue;
        }
        let Some(c) = text[i..].chars().next() else {
            break;
        };
        out.push(c);
        i += c.len_utf8();
    }
    Cow::Owned(out)
}
