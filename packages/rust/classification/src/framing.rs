//! Response framing: locating the JSON document inside the response body.
//!
//! The framing strategy is configuration ([`ResponseFraming`]), never sniffed
//! from the body. A body that does not carry the configured framing is
//! rejected as a malformed body.

use std::sync::LazyLock;

use contextual_shared::{ContextualError, DecodeFailure, ResponseFraming, Result};
use regex::bytes::Regex;

/// Matches `callback( ... )` with optional trailing `;` and surrounding
/// whitespace. Group 1 is the callback name, group 2 the payload.
static JSONP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s-u)\A\s*([A-Za-z_$][A-Za-z0-9_$.]*)\s*\((.*)\)\s*;?\s*\z").expect("JSONP regex")
});

/// Strip the configured framing and return the JSON payload.
pub fn unframe<'a>(body: &'a [u8], framing: &ResponseFraming) -> Result<&'a [u8]> {
    match framing {
        ResponseFraming::Plain => Ok(body),
        ResponseFraming::Jsonp { callback } => unframe_jsonp(body, callback.as_deref()),
        ResponseFraming::Fixed { prefix, suffix } => unframe_fixed(body, *prefix, *suffix),
    }
}

fn unframe_jsonp<'a>(body: &'a [u8], expected: Option<&str>) -> Result<&'a [u8]> {
    let caps = JSONP_RE.captures(body).ok_or_else(|| {
        ContextualError::decode(DecodeFailure::MalformedBody, "body is not a JSONP callback")
    })?;

    // Both groups are mandatory in the pattern.
    let (Some(name), Some(payload)) = (caps.get(1), caps.get(2)) else {
        return Err(ContextualError::decode(
            DecodeFailure::MalformedBody,
            "body is not a JSONP callback",
        ));
    };

    if let Some(expected) = expected {
        if name.as_bytes() != expected.as_bytes() {
            return Err(ContextualError::decode(
                DecodeFailure::MalformedBody,
                format!(
                    "unexpected JSONP callback `{}` (expected `{expected}`)",
                    String::from_utf8_lossy(name.as_bytes())
                ),
            ));
        }
    }

    Ok(payload.as_bytes())
}

fn unframe_fixed(body: &[u8], prefix: usize, suffix: usize) -> Result<&[u8]> {
    let framing_len = prefix.saturating_add(suffix);
    if body.len() < framing_len {
        return Err(ContextualError::decode(
            DecodeFailure::MalformedBody,
            format!(
                "body of {} bytes is shorter than its {framing_len}-byte framing",
                body.len()
            ),
        ));
    }
    Ok(&body[prefix..body.len() - suffix])
}

#[cfg(test)]
mod tests {
    use super::*;

    const WRAPPED: &[u8] = br#"aspan.setIAB({"raw": {"text": ["Sports>Soccer"]}})"#;

    fn jsonp(callback: Option<&str>) -> ResponseFraming {
        ResponseFraming::Jsonp {
            callback: callback.map(String::from),
        }
    }

    #[test]
    fn plain_passes_body_through() {
        let body = br#"{"codes":{"text":["IAB17"]}}"#;
        assert_eq!(unframe(body, &ResponseFraming::Plain).unwrap(), body);
    }

    #[test]
    fn jsonp_strips_callback() {
        let payload = unframe(WRAPPED, &jsonp(None)).unwrap();
        assert_eq!(payload, br#"{"raw": {"text": ["Sports>Soccer"]}}"#);
    }

    #[test]
    fn jsonp_tolerates_semicolon_and_whitespace() {
        let body = b"  cb (\n{\"raw\":null}\n);\n";
        let payload = unframe(body, &jsonp(Some("cb"))).unwrap();
        assert_eq!(payload, b"\n{\"raw\":null}\n");
    }

    #[test]
    fn jsonp_checks_callback_name() {
        assert!(unframe(WRAPPED, &jsonp(Some("aspan.setIAB"))).is_ok());

        let err = unframe(WRAPPED, &jsonp(Some("other"))).unwrap_err();
        assert_eq!(err.decode_failure(), Some(DecodeFailure::MalformedBody));
        assert!(err.to_string().contains("aspan.setIAB"));
    }

    #[test]
    fn jsonp_rejects_bare_json() {
        let err = unframe(br#"{"raw":null}"#, &jsonp(None)).unwrap_err();
        assert_eq!(err.decode_failure(), Some(DecodeFailure::MalformedBody));
    }

    #[test]
    fn fixed_strips_exact_bytes() {
        let framing = ResponseFraming::Fixed { prefix: 13, suffix: 1 };
        let payload = unframe(WRAPPED, &framing).unwrap();
        assert_eq!(payload, br#"{"raw": {"text": ["Sports>Soccer"]}}"#);
    }

    #[test]
    fn fixed_rejects_short_body() {
        let framing = ResponseFraming::Fixed { prefix: 13, suffix: 1 };
        let err = unframe(b"short", &framing).unwrap_err();
        assert_eq!(err.decode_failure(), Some(DecodeFailure::MalformedBody));
    }
}
