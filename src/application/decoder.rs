//! Bounded percent-decoding for wrapped links.
//!
//! Agent sites frequently double-encode the marketplace link they wrap. The
//! decoder peels at most two layers and never fails: a layer that cannot be
//! decoded leaves the previous layer in place.


/// Maximum number of percent-encoding layers removed by [`decode_layers`].
pub const MAX_DECODE_LAYERS: usize = 2;

/// A single strict decode failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// A `%` not followed by two hex digits.
    InvalidEscape,
    /// The decoded bytes are not UTF-8.
    InvalidUtf8,
}

/// Decode one layer of percent-encoding.
///
/// Strict: stray `%` characters and escapes that produce invalid UTF-8 are
/// errors. `+` is left alone.
pub fn decode_once(input: &str) -> Result<String, DecodeError> {
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes.len() > i + 2
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if !valid {
                return Err(DecodeError::InvalidEscape);
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    String::from_utf8(urlencoding::decode_binary(bytes).into_owned())
        .map_err(|_| DecodeError::InvalidUtf8)
}

/// Decode up to [`MAX_DECODE_LAYERS`] layers, falling back to the last good
/// layer when a decode fails.
///
/// ```
/// use agentlink_gateway::application::decoder::decode_layers;
///
/// let twice = "https%253A%252F%252Fweidian.com%252Fitem.html%253FitemID%253D42";
/// assert_eq!(decode_layers(twice), "https://weidian.com/item.html?itemID=42");
/// assert_eq!(decode_layers("plain"), "plain");
/// ```
pub fn decode_layers(input: &str) -> String {
    let mut current = input.to_string();
    for _ in 0..MAX_DECODE_LAYERS {
        if !current.contains('%') {
            break;
        }
        match decode_once(&current) {
            Ok(decoded) => current = decoded,
            Err(_) => break,
        }
    }
    current
}

/// Whether a decoded value should be treated as a link.
pub fn looks_like_url(value: &str) -> bool {
    let lowered = value.to_ascii_lowercase();
    lowered.contains("http") || lowered.contains("www.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_layer() {
        assert_eq!(
            decode_layers("https%3A%2F%2Fitem.taobao.com%2Fitem.htm%3Fid%3D1"),
            "https://item.taobao.com/item.htm?id=1"
        );
    }

    #[test]
    fn test_stops_after_two_layers() {
        // Three layers in, one layer of encoding must remain.
        let thrice = "https%25253A%25252F%25252Fjd.com";
        assert_eq!(decode_layers(thrice), "https%3A%2F%2Fjd.com");
    }

    #[test]
    fn test_idempotent_within_two_layers() {
        let inputs = [
            "https%3A%2F%2Fitem.jd.com%2F100.html",
            "https%253A%252F%252Fitem.jd.com%252F100.html",
            "no-escapes-here",
            "https://already.decoded/?q=a+b",
        ];
        for input in inputs {
            let once = decode_layers(input);
            assert_eq!(decode_layers(&once), once, "input {}", input);
        }
    }

    #[test]
    fn test_second_layer_failure_keeps_first() {
        // First layer yields "100%" which is not decodable again.
        assert_eq!(decode_layers("100%25"), "100%");
        assert_eq!(decode_layers("100%25zz"), "100%zz");
    }

    #[test]
    fn test_first_layer_failure_returns_input() {
        assert_eq!(decode_layers("50%off"), "50%off");
        assert_eq!(decode_layers("%E0%A4%A"), "%E0%A4%A");
        assert_eq!(decode_layers("%FF%FE"), "%FF%FE");
    }

    #[test]
    fn test_decode_once_errors() {
        assert_eq!(decode_once("%"), Err(DecodeError::InvalidEscape));
        assert_eq!(decode_once("%4"), Err(DecodeError::InvalidEscape));
        assert_eq!(decode_once("%C3%28"), Err(DecodeError::InvalidUtf8));
        assert_eq!(decode_once("a+b%20c").as_deref(), Ok("a+b c"));
    }

    #[test]
    fn test_looks_like_url() {
        assert!(looks_like_url("https://x.y"));
        assert!(looks_like_url("WWW.example.com"));
        assert!(!looks_like_url("item-123"));
    }
}
