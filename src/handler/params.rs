//! Query parameter parsing
//!
//! Parsing is permissive: unknown keys are ignored and unexpected values are
//! coerced to their default instead of being rejected.

use crate::greeting::GreetingRequest;

impl GreetingRequest {
    /// Build a request from a raw query string (without the leading `?`).
    ///
    /// - `loaded`: anything but the literal `false` means loaded
    /// - `signedIn`: only the literal `true` means signed in
    /// - `fullName`: empty or absent means no name
    ///
    /// When a key repeats, the first occurrence wins.
    pub fn from_query_string(qs: &str) -> Self {
        let loaded = first_value(qs, "loaded");
        let signed_in = first_value(qs, "signedIn");
        let full_name = first_value(qs, "fullName");

        Self {
            loaded: loaded.as_deref() != Some("false"),
            signed_in: signed_in.as_deref() == Some("true"),
            full_name: full_name.filter(|name| !name.is_empty()),
        }
    }
}

/// Find the first decoded value for `name` in a query string
pub fn first_value(qs: &str, name: &str) -> Option<String> {
    qs.split('&')
        .filter(|pair| !pair.is_empty())
        .find_map(|pair| {
            let mut parts = pair.splitn(2, '=');
            let key = urlencoding_decode(parts.next().unwrap_or(""));
            if key == name {
                Some(urlencoding_decode(parts.next().unwrap_or("")))
            } else {
                None
            }
        })
}

/// Decode `application/x-www-form-urlencoded` text.
///
/// Invalid escapes are passed through literally and invalid UTF-8 is
/// replaced, never rejected.
fn urlencoding_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                match (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                    (Some(hi), Some(lo)) => {
                        out.push((hi << 4) | lo);
                        i += 3;
                    }
                    _ => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}

const fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
