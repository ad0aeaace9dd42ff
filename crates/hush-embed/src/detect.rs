//! Renderable-markup detection.

use std::borrow::Cow;

use quick_xml::escape::{resolve_html5_entity, unescape_with};

/// Structural markers of a complete HTML document. Matched
/// case-insensitively anywhere in the decoded text.
pub const MARKERS: [&str; 4] = ["<!doctype", "<html", "<head", "<body"];

/// Decode HTML entities (named, decimal and hex) back to raw markup.
///
/// Decoding is lenient: every well-formed reference is decoded, and an `&`
/// that does not start one (a bare `&&` in a script, an unknown name, an
/// invalid code point) is kept as written.
#[must_use]
pub fn decode_entities(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }
    if let Ok(decoded) = unescape_with(text, resolve_html5_entity) {
        return decoded;
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        match decode_reference(tail) {
            Some((decoded, consumed)) => {
                out.push_str(&decoded);
                rest = &tail[consumed..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    tracing::trace!(target: "hush.embed", "entities decoded leniently");
    Cow::Owned(out)
}

/// Decode the single reference at the start of `tail` (which begins with
/// `&`). Returns the replacement and the bytes consumed, through the `;`.
fn decode_reference(tail: &str) -> Option<(String, usize)> {
    let end = tail[1..].find(|c: char| c == ';' || c == '&' || c.is_whitespace())? + 1;
    if !tail[end..].starts_with(';') {
        return None;
    }
    let decoded = unescape_with(&tail[..=end], resolve_html5_entity).ok()?;
    Some((decoded.into_owned(), end + 1))
}

/// Whether `decoded` looks like a full HTML page rather than a snippet.
#[must_use]
pub fn is_renderable_markup(decoded: &str) -> bool {
    let lower = decoded.to_ascii_lowercase();
    MARKERS.iter().any(|marker| lower.contains(marker))
}
