/// Text encoding: decodes backslash escapes and character references from
/// source bytes while re-escaping the output for HTML embedding
use std::borrow::Cow;
use std::io::{self, Write};

use crate::entity;

/// Encodes literal text for the renderer.
///
/// Implementations must be stateless; one encoder value is shared by every
/// write of a render pass.
pub trait TextWriter {
    /// Writes `source` with backslash escapes and character references
    /// resolved, re-escaping the result for HTML.
    fn write(&self, w: &mut dyn Write, source: &[u8]) -> io::Result<()>;

    /// Writes `source` with only HTML metacharacters escaped, leaving
    /// escapes and references unresolved.
    fn raw_write(&self, w: &mut dyn Write, source: &[u8]) -> io::Result<()>;
}

/// The HTML escape sequence for a byte, if it has one.
pub(crate) fn escape_html_byte(c: u8) -> Option<&'static [u8]> {
    match c {
        b'&' => Some(b"&amp;"),
        b'<' => Some(b"&lt;"),
        b'>' => Some(b"&gt;"),
        b'"' => Some(b"&quot;"),
        b'\'' => Some(b"&#39;"),
        _ => None,
    }
}

/// A successfully scanned character reference.
pub(crate) enum Reference {
    /// Numeric reference, decoded but not yet validated as a scalar value.
    Scalar(u32),
    /// Named reference, resolved to its replacement text.
    Named(&'static str),
}

/// Scans a character reference starting at the `&` at `pos`.
///
/// Recognizes `&#xHH;`/`&#XHH;`, `&#NNN;` (fewer than eight digits), and
/// `&name;` against the HTML5 entity table. Returns the reference and the
/// index just past the terminating `;`. Empty or overflowing hex digit runs
/// decode to zero, which the caller maps to U+FFFD.
pub(crate) fn scan_reference(source: &[u8], pos: usize) -> Option<(Reference, usize)> {
    let limit = source.len();
    let next = pos + 1;
    if next < limit && source[next] == b'#' {
        let nnext = next + 1;
        if nnext < limit && (source[nnext] == b'x' || source[nnext] == b'X') {
            let start = nnext + 1;
            let mut i = start;
            while i < limit && source[i].is_ascii_hexdigit() {
                i += 1;
            }
            if i < limit && source[i] == b';' {
                let digits = std::str::from_utf8(&source[start..i]).ok()?;
                let v = u32::from_str_radix(digits, 16).unwrap_or(0);
                return Some((Reference::Scalar(v), i + 1));
            }
        } else if nnext < limit && source[nnext].is_ascii_digit() {
            let start = nnext;
            let mut i = start;
            while i < limit && source[i].is_ascii_digit() {
                i += 1;
            }
            if i < limit && i - start < 8 && source[i] == b';' {
                let digits = std::str::from_utf8(&source[start..i]).ok()?;
                let v = digits.parse::<u32>().unwrap_or(0);
                return Some((Reference::Scalar(v), i + 1));
            }
        }
        None
    } else {
        let start = next;
        let mut i = start;
        while i < limit && source[i].is_ascii_alphanumeric() {
            i += 1;
        }
        if i < limit && source[i] == b';' {
            let name = std::str::from_utf8(&source[start..i]).ok()?;
            let chars = entity::lookup(name)?;
            return Some((Reference::Named(chars), i + 1));
        }
        None
    }
}

/// Maps a decoded numeric value to a valid char, substituting U+FFFD for
/// zero, surrogates, and out-of-range values.
pub(crate) fn to_valid_char(v: u32) -> char {
    match char::from_u32(v) {
        Some(c) if v != 0 => c,
        _ => char::REPLACEMENT_CHARACTER,
    }
}

/// Emits a decoded numeric scalar: HTML-escaped when an escape mapping
/// exists, otherwise as validated UTF-8.
fn write_scalar(w: &mut dyn Write, v: u32) -> io::Result<()> {
    if v < 256 {
        if let Some(esc) = escape_html_byte(v as u8) {
            return w.write_all(esc);
        }
    }
    let mut buf = [0u8; 4];
    w.write_all(to_valid_char(v).encode_utf8(&mut buf).as_bytes())
}

/// Decodes backslash-escaped punctuation and character references into a
/// buffer without any HTML re-escaping. Used on link and image destinations
/// before percent-escaping.
pub(crate) fn resolve_references(source: &[u8]) -> Cow<'_, [u8]> {
    if !source.iter().any(|&c| c == b'\\' || c == b'&') {
        return Cow::Borrowed(source);
    }
    let limit = source.len();
    let mut out = Vec::with_capacity(limit);
    let mut i = 0;
    while i < limit {
        let c = source[i];
        if c == b'\\' && i + 1 < limit && source[i + 1].is_ascii_punctuation() {
            out.push(source[i + 1]);
            i += 2;
            continue;
        }
        if c == b'&' {
            if let Some((reference, end)) = scan_reference(source, i) {
                match reference {
                    Reference::Scalar(v) => {
                        let mut buf = [0u8; 4];
                        out.extend_from_slice(to_valid_char(v).encode_utf8(&mut buf).as_bytes());
                    }
                    Reference::Named(chars) => out.extend_from_slice(chars.as_bytes()),
                }
                i = end;
                continue;
            }
        }
        out.push(c);
        i += 1;
    }
    Cow::Owned(out)
}

/// The default encoder used by `Config`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTextWriter;

impl TextWriter for DefaultTextWriter {
    fn raw_write(&self, w: &mut dyn Write, source: &[u8]) -> io::Result<()> {
        let mut start = 0;
        for (i, &c) in source.iter().enumerate() {
            if let Some(esc) = escape_html_byte(c) {
                w.write_all(&source[start..i])?;
                w.write_all(esc)?;
                start = i + 1;
            }
        }
        w.write_all(&source[start..])
    }

    fn write(&self, w: &mut dyn Write, source: &[u8]) -> io::Result<()> {
        let limit = source.len();
        let mut escaped = false;
        // Start of the pending region: bytes scanned but not yet flushed.
        let mut n = 0;
        let mut i = 0;
        while i < limit {
            let c = source[i];
            if escaped && c.is_ascii_punctuation() {
                // Drop the backslash; the punctuation byte becomes pending.
                self.raw_write(w, &source[n..i - 1])?;
                n = i;
                escaped = false;
                i += 1;
                continue;
            }
            if c == b'&' {
                if let Some((reference, end)) = scan_reference(source, i) {
                    self.raw_write(w, &source[n..i])?;
                    match reference {
                        Reference::Scalar(v) => write_scalar(w, v)?,
                        Reference::Named(chars) => self.raw_write(w, chars.as_bytes())?,
                    }
                    n = end;
                    i = end;
                    continue;
                }
                // Not a reference; the `&` stays pending as literal text.
            }
            if c == b'\\' {
                escaped = true;
                i += 1;
                continue;
            }
            escaped = false;
            i += 1;
        }
        self.raw_write(w, &source[n..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(source: &[u8]) -> String {
        let mut out = Vec::new();
        DefaultTextWriter.write(&mut out, source).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn raw_write(source: &[u8]) -> String {
        let mut out = Vec::new();
        DefaultTextWriter.raw_write(&mut out, source).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_raw_write_escapes_metacharacters() {
        assert_eq!(
            raw_write(b"<a href=\"x\">&'</a>"),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_raw_write_copies_plain_text_verbatim() {
        assert_eq!(raw_write(b"plain text 123"), "plain text 123");
    }

    #[test]
    fn test_write_matches_raw_write_without_escapes_or_references() {
        let cases: [&[u8]; 3] = [b"plain text 123", b"a <b> \"c\"", b""];
        for source in cases {
            assert_eq!(write(source), raw_write(source));
        }
    }

    #[test]
    fn test_named_references() {
        // Metacharacter entities decode and re-escape to themselves.
        assert_eq!(write(b"&amp;&lt;&gt;&quot;"), "&amp;&lt;&gt;&quot;");
        assert_eq!(write(b"&copy;"), "\u{a9}");
        assert_eq!(write(b"AT&amp;T"), "AT&amp;T");
        // Unknown names stay literal, with the ampersand re-escaped.
        assert_eq!(write(b"&bogus;"), "&amp;bogus;");
        assert_eq!(write(b"&amp"), "&amp;amp");
    }

    #[test]
    fn test_decimal_references() {
        assert_eq!(write(b"&#65;"), "A");
        assert_eq!(write(b"&#34;"), "&quot;");
        // Seven digits is the most a decimal reference may have.
        assert_eq!(write(b"&#1114111;"), "\u{10ffff}");
        assert_eq!(write(b"&#12345678;"), "&amp;#12345678;");
        assert_eq!(write(b"&#zz;"), "&amp;#zz;");
        assert_eq!(write(b"&#65"), "&amp;#65");
    }

    #[test]
    fn test_hex_references() {
        assert_eq!(write(b"&#x41;"), "A");
        assert_eq!(write(b"&#X41;"), "A");
        assert_eq!(write(b"&#x22;"), "&quot;");
        assert_eq!(write(b"&#xe9;"), "\u{e9}");
    }

    #[test]
    fn test_truncated_numeric_markers_stay_literal() {
        // Input ending right at the `#` or the hex marker: the marker is
        // recognized only when in bounds, so the run is literal text.
        assert_eq!(write(b"&#"), "&amp;#");
        assert_eq!(write(b"&#x"), "&amp;#x");
        assert_eq!(write(b"&#X"), "&amp;#X");
        assert_eq!(write(b"a&#x"), "a&amp;#x");
    }

    #[test]
    fn test_invalid_scalars_become_replacement_character() {
        assert_eq!(write(b"&#0;"), "\u{fffd}");
        assert_eq!(write(b"&#x110000;"), "\u{fffd}");
        assert_eq!(write(b"&#xD800;"), "\u{fffd}");
        // Empty and overflowing hex digit runs decode to zero.
        assert_eq!(write(b"&#x;"), "\u{fffd}");
        assert_eq!(write(b"&#xffffffffff;"), "\u{fffd}");
    }

    #[test]
    fn test_backslash_escapes() {
        assert_eq!(write(br"\*literal\*"), "*literal*");
        assert_eq!(write(br"a\*b"), "a*b");
        // Backslash before a non-punctuation byte stays literal.
        assert_eq!(write(br"\a"), r"\a");
        assert_eq!(write(br"\\"), r"\");
        // A trailing backslash is flushed literally.
        assert_eq!(write(br"ab\"), r"ab\");
    }

    #[test]
    fn test_escaped_ampersand_is_not_a_reference() {
        assert_eq!(write(br"\&amp;"), "&amp;amp;");
    }

    #[test]
    fn test_reference_decoding_flushes_surrounding_text() {
        assert_eq!(write(b"a &lt; b &amp; c"), "a &lt; b &amp; c");
        assert_eq!(write(b"x&#169;y"), "x\u{a9}y");
    }

    #[test]
    fn test_resolve_references_decodes_without_escaping() {
        assert_eq!(resolve_references(br"a\*b").as_ref(), b"a*b");
        assert_eq!(resolve_references(b"&quot;x").as_ref(), b"\"x");
        assert_eq!(resolve_references(b"&#65;").as_ref(), b"A");
        assert_eq!(resolve_references(b"plain").as_ref(), b"plain");
        assert_eq!(resolve_references(b"&bogus;").as_ref(), b"&bogus;");
    }
}
