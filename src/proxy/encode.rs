//! Escaping of path and query text for the outbound request line.
//!
//! Clients are forgiving about what they put in a URI; the outbound URI parser
//! is not. This escapes every character a strict parser would reject while
//! leaving existing `%XX` sequences alone, so the result is stable under
//! repeated application.

use std::borrow::Cow;
use std::fmt::Write;

/// Bitmap of the ASCII characters that pass through unescaped.
const ASCII_QUERY_CHARS: u128 = query_char_bitmap();

const fn query_char_bitmap() -> u128 {
    // unreserved punctuation, sub-delims, reserved, and '%' for existing escapes
    const EXTRA: &[u8] = b"_-!.~'()*,;:$&+=?/[]@%";

    let mut bits = 0u128;
    let mut c = b'a';
    while c <= b'z' {
        bits |= 1u128 << c;
        c += 1;
    }
    c = b'A';
    while c <= b'Z' {
        bits |= 1u128 << c;
        c += 1;
    }
    c = b'0';
    while c <= b'9' {
        bits |= 1u128 << c;
        c += 1;
    }
    let mut i = 0;
    while i < EXTRA.len() {
        bits |= 1u128 << EXTRA[i];
        i += 1;
    }
    bits
}

fn needs_escape(c: char) -> bool {
    let cp = c as u32;
    if cp < 128 {
        ASCII_QUERY_CHARS & (1u128 << cp) == 0
    } else {
        // Above ASCII, `is_whitespace` is exactly the Zs/Zl/Zp separators
        // plus U+0085, which is a control anyway.
        c.is_control() || c.is_whitespace()
    }
}

/// Escape `input` for use as the path or query part of an outbound URI.
///
/// Returns the input untouched (borrowed) when nothing needs escaping.
///
/// # Example
///
/// ```
/// # use origin_proxy::proxy::encode::encode_uri_query;
/// assert_eq!(encode_uri_query("name=a b"), "name=a%20b");
/// assert_eq!(encode_uri_query("name=a%20b"), "name=a%20b");
/// ```
pub fn encode_uri_query(input: &str) -> Cow<'_, str> {
    let Some(first) = input.find(needs_escape) else {
        return Cow::Borrowed(input);
    };

    let mut out = String::with_capacity(input.len() + 15);
    out.push_str(&input[..first]);
    for c in input[first..].chars() {
        if needs_escape(c) {
            // leading %, zero padded, width 2, upper-case hex
            let _ = write!(out, "%{:02X}", c as u32);
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}
