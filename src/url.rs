/// URL helpers: percent-escaping of link destinations and the
/// dangerous-URL classifier
use percent_encoding::percent_encode_byte;

use crate::escape::resolve_references;

/// Returns true if the URL looks potentially dangerous: a scheme associated
/// with script injection, or a non-image `data:` payload.
///
/// Matching is a case-sensitive prefix check. `data:image/` URIs carrying
/// png, gif, jpeg, or webp data are allowed through.
pub fn is_dangerous_url(url: &[u8]) -> bool {
    if url.starts_with(b"data:image/") && url.len() >= 11 {
        let v = &url[11..];
        return !(v.starts_with(b"png;")
            || v.starts_with(b"gif;")
            || v.starts_with(b"jpeg;")
            || v.starts_with(b"webp;"));
    }
    url.starts_with(b"javascript:")
        || url.starts_with(b"vbscript:")
        || url.starts_with(b"file:")
        || url.starts_with(b"data:")
}

fn is_url_safe(c: u8) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            b'!' | b'#'
                | b'$'
                | b'&'
                | b'\''
                | b'('
                | b')'
                | b'*'
                | b'+'
                | b','
                | b'-'
                | b'.'
                | b'/'
                | b':'
                | b';'
                | b'='
                | b'?'
                | b'@'
                | b'_'
                | b'~'
        )
}

/// Percent-escapes a destination URL for an href/src attribute.
///
/// Bytes outside the safe set are percent-encoded; existing `%XX` triplets
/// with two hex digits are kept verbatim. When `resolve` is set, backslash
/// escapes and character references in the destination are decoded first
/// (link and image destinations carry them; autolinks cannot).
pub fn escape_url(url: &[u8], resolve: bool) -> Vec<u8> {
    let url = if resolve {
        resolve_references(url)
    } else {
        std::borrow::Cow::Borrowed(url)
    };
    let limit = url.len();
    let mut out = Vec::with_capacity(limit);
    let mut i = 0;
    while i < limit {
        let c = url[i];
        if c == b'%'
            && i + 2 < limit
            && url[i + 1].is_ascii_hexdigit()
            && url[i + 2].is_ascii_hexdigit()
        {
            out.extend_from_slice(&url[i..i + 3]);
            i += 3;
            continue;
        }
        if is_url_safe(c) {
            out.push(c);
        } else {
            out.extend_from_slice(percent_encode_byte(c).as_bytes());
        }
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dangerous_schemes() {
        assert!(is_dangerous_url(b"javascript:alert(1)"));
        assert!(is_dangerous_url(b"vbscript:msgbox"));
        assert!(is_dangerous_url(b"file:///etc/passwd"));
        assert!(is_dangerous_url(b"data:text/html;base64,PHNjcmlwdD4="));
    }

    #[test]
    fn test_image_data_uris_are_allowed() {
        assert!(!is_dangerous_url(b"data:image/png;base64,AAAA"));
        assert!(!is_dangerous_url(b"data:image/gif;base64,AAAA"));
        assert!(!is_dangerous_url(b"data:image/jpeg;base64,AAAA"));
        assert!(!is_dangerous_url(b"data:image/webp;base64,AAAA"));
        assert!(is_dangerous_url(b"data:image/svg+xml;base64,AAAA"));
    }

    #[test]
    fn test_ordinary_urls_are_safe() {
        assert!(!is_dangerous_url(b"https://example.com"));
        assert!(!is_dangerous_url(b"/relative/path"));
        assert!(!is_dangerous_url(b"mailto:user@example.com"));
        assert!(!is_dangerous_url(b""));
    }

    #[test]
    fn test_prefix_match_is_case_sensitive() {
        // Deliberate: matching follows the classifier's denylist exactly.
        assert!(!is_dangerous_url(b"JAVASCRIPT:alert(1)"));
        assert!(!is_dangerous_url(b"Data:text/html"));
    }

    #[test]
    fn test_escape_url_keeps_safe_bytes() {
        assert_eq!(
            escape_url(b"https://example.com/a?b=c&d=e", false),
            b"https://example.com/a?b=c&d=e"
        );
    }

    #[test]
    fn test_escape_url_encodes_unsafe_bytes() {
        assert_eq!(escape_url(b"/a b", false), b"/a%20b");
        assert_eq!(escape_url("/caf\u{e9}".as_bytes(), false), b"/caf%C3%A9");
        assert_eq!(escape_url(b"<>", false), b"%3C%3E");
    }

    #[test]
    fn test_escape_url_preserves_percent_triplets() {
        assert_eq!(escape_url(b"/a%20b", false), b"/a%20b");
        // A percent without two hex digits is itself encoded.
        assert_eq!(escape_url(b"/a%zzb", false), b"/a%25zzb");
        assert_eq!(escape_url(b"100%", false), b"100%25");
    }

    #[test]
    fn test_escape_url_resolves_references_first() {
        assert_eq!(escape_url(br"a\&b", true), b"a&b");
        assert_eq!(escape_url(b"f&ouml;o", true), b"f%C3%B6o");
        assert_eq!(escape_url(br"a\&b", false), b"a%5C&b");
    }
}
