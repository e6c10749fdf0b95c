//! Shared text and XML helpers.

use std::borrow::Cow;

use quick_xml::events::BytesStart;

/// Decode bytes to a string, handling various encodings.
///
/// 1. UTF-8 (a BOM is handled by encoding_rs)
/// 2. The hint encoding, usually from `<?xml encoding="..."?>`
/// 3. Windows-1252, a superset of ISO-8859-1 and common in older rulesets
///
/// Uses `Cow<str>` to avoid allocation when the input is valid UTF-8.
pub fn decode_text<'a>(bytes: &'a [u8], hint_encoding: Option<&str>) -> Cow<'a, str> {
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);

    if !malformed {
        return result;
    }

    if let Some(name) = hint_encoding
        && let Some(encoding) = encoding_rs::Encoding::for_label(name.as_bytes())
    {
        let (result, _, _) = encoding.decode(bytes);
        return result;
    }

    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result
}

/// Pull the `encoding="..."` value out of an XML declaration, if present.
pub fn declared_encoding(bytes: &[u8]) -> Option<&str> {
    let head = &bytes[..bytes.len().min(200)];
    let head = std::str::from_utf8(head).ok().or_else(|| {
        // The declaration itself is ASCII; cut at the first non-ASCII byte.
        let end = head.iter().position(|b| !b.is_ascii()).unwrap_or(head.len());
        std::str::from_utf8(&head[..end]).ok()
    })?;
    let decl_end = head.find("?>")?;
    let decl = &head[..decl_end];
    let start = decl.find("encoding=")? + "encoding=".len();
    let quote = decl[start..].chars().next()?;
    let rest = &decl[start + 1..];
    let end = rest.find(quote)?;
    Some(&rest[..end])
}

/// Resolve an XML entity reference (without the surrounding `&` and `;`).
pub fn resolve_entity(entity: &str) -> Option<String> {
    match entity {
        "apos" => return Some("'".to_string()),
        "quot" => return Some("\"".to_string()),
        "lt" => return Some("<".to_string()),
        "gt" => return Some(">".to_string()),
        "amp" => return Some("&".to_string()),
        _ => {}
    }

    if let Some(hex) = entity.strip_prefix("#x") {
        if let Ok(code) = u32::from_str_radix(hex, 16)
            && let Some(c) = char::from_u32(code)
        {
            return Some(c.to_string());
        }
    } else if let Some(dec) = entity.strip_prefix('#')
        && let Ok(code) = dec.parse::<u32>()
        && let Some(c) = char::from_u32(code)
    {
        return Some(c.to_string());
    }

    None
}

/// Read and unescape an attribute value.
pub fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .map(|a| {
            let raw = String::from_utf8_lossy(&a.value).into_owned();
            match quick_xml::escape::unescape(&raw) {
                Ok(value) => value.into_owned(),
                Err(_) => raw,
            }
        })
}

/// Read a boolean attribute; anything but `true` is false.
pub fn attr_flag(e: &BytesStart<'_>, key: &[u8]) -> bool {
    attr(e, key).is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}

/// Escape text for element content or attribute values.
pub fn escape_xml(s: &str) -> Cow<'_, str> {
    quick_xml::escape::escape(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_utf8() {
        assert_eq!(decode_text("Grüße".as_bytes(), None), "Grüße");
    }

    #[test]
    fn test_decode_with_hint() {
        // "Grüße" in ISO-8859-1
        let bytes = [0x47, 0x72, 0xFC, 0xDF, 0x65];
        assert_eq!(decode_text(&bytes, Some("iso-8859-1")), "Grüße");
        assert_eq!(decode_text(&bytes, None), "Grüße");
    }

    #[test]
    fn test_resolve_entity() {
        assert_eq!(resolve_entity("amp").as_deref(), Some("&"));
        assert_eq!(resolve_entity("#x41").as_deref(), Some("A"));
        assert_eq!(resolve_entity("#228").as_deref(), Some("ä"));
        assert_eq!(resolve_entity("nbsp"), None);
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape_xml("a < b & \"c\""), "a &lt; b &amp; &quot;c&quot;");
        assert!(matches!(escape_xml("plain"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_declared_encoding() {
        let xml = br#"<?xml version="1.0" encoding="ISO-8859-1"?><Preferences/>"#;
        assert_eq!(declared_encoding(xml), Some("ISO-8859-1"));
        assert_eq!(declared_encoding(b"<Preferences/>"), None);
    }
}
