//! Content-based MIME detection. The client-declared type is never trusted.

pub const SVG_MIME: &str = "image/svg+xml";

/// Detect the MIME type of `data` from its bytes.
///
/// Binary formats come from magic numbers via `infer`. SVG has none, so text
/// whose first element is `<svg` is recognised separately.
pub fn sniff_mime(data: &[u8]) -> Option<&'static str> {
    let detected = infer::get(data).map(|kind| kind.mime_type());
    match detected {
        Some(mime) if !mime.starts_with("text/") => Some(mime),
        _ if looks_like_svg(data) => Some(SVG_MIME),
        other => other,
    }
}

/// File extensions accepted for a MIME type, canonical one first.
pub fn extensions_for(mime: &str) -> Option<&'static [&'static str]> {
    match mime {
        "image/jpeg" => Some(&["jpg", "jpeg"]),
        "image/png" => Some(&["png"]),
        "image/gif" => Some(&["gif"]),
        SVG_MIME => Some(&["svg"]),
        "application/pdf" => Some(&["pdf"]),
        _ => None,
    }
}

fn looks_like_svg(data: &[u8]) -> bool {
    let Ok(text) = std::str::from_utf8(data) else {
        return false;
    };
    let mut rest = text.trim_start_matches('\u{feff}').trim_start();

    // Skip the prolog: XML declaration, comments, doctype.
    loop {
        let (open, close) = if rest.starts_with("<?") {
            ("<?", "?>")
        } else if rest.starts_with("<!--") {
            ("<!--", "-->")
        } else if rest.get(..9).is_some_and(|p| p.eq_ignore_ascii_case("<!doctype")) {
            ("<!doctype", ">")
        } else {
            break;
        };
        let Some(end) = rest[open.len()..].find(close) else {
            return false;
        };
        rest = rest[open.len() + end + close.len()..].trim_start();
    }

    rest.get(..4).is_some_and(|p| p.eq_ignore_ascii_case("<svg"))
        && rest[4..].starts_with(|c: char| c.is_whitespace() || c == '>' || c == '/')
}
