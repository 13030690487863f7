//! `Set-Cookie` header parsing.

/// Parse a `Set-Cookie` header value into `(name, value)` pairs, in order.
///
/// The header is split on `;`, each part trimmed and empty parts dropped.
/// A part of the form `k=v` yields `(k, v)`; anything else (a bare
/// attribute like `HttpOnly`, or a part with several `=`) yields its first
/// `=`-separated piece with an empty value.
pub fn parse_cookie(header: &str) -> Vec<(String, String)> {
    header
        .split(';')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            let pieces: Vec<&str> = part.split('=').collect();
            match pieces.as_slice() {
                [key, value] => (key.to_string(), value.to_string()),
                _ => (pieces[0].to_string(), String::new()),
            }
        })
        .collect()
}

/// Value of the cookie called `name`, if present.
pub fn cookie_value<'a>(cookies: &'a [(String, String)], name: &str) -> Option<&'a str> {
    cookies
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}
