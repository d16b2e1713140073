//! Lenient `Cookie` / `Set-Cookie` header parsing.
//!
//! Parsing never fails: malformed pairs are skipped, so a header without any
//! `name=value` pair yields no cookies.

/// Attribute key of the request cookie header.
pub const REQUEST_COOKIE_KEY: &str = "http.request.header.cookie";
/// Attribute key of the response set-cookie header.
pub const RESPONSE_SET_COOKIE_KEY: &str = "http.response.header.set-cookie";

/// A single cookie name/value pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value with surrounding double quotes removed.
    pub value: String,
}

impl Cookie {
    fn parse_pair(pair: &str) -> Option<Cookie> {
        let (name, value) = pair.trim().split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let value = value.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);
        Some(Cookie {
            name: name.to_string(),
            value: value.to_string(),
        })
    }
}

/// Parses a request `Cookie` header (`a=b; c=d`).
pub fn parse_request_cookies(header: &str) -> Vec<Cookie> {
    header.split(';').filter_map(Cookie::parse_pair).collect()
}

/// Parses a response `Set-Cookie` header. Only the leading `name=value` pair is
/// a cookie; the remaining segments are cookie attributes and are ignored.
pub fn parse_set_cookie(header: &str) -> Vec<Cookie> {
    header
        .split(';')
        .next()
        .and_then(Cookie::parse_pair)
        .into_iter()
        .collect()
}

/// Formats cookies back into `name=value; name2=value2` form.
pub fn join_cookies(cookies: &[Cookie]) -> String {
    cookies
        .iter()
        .map(|c| format!("{}={}", c.name, c.value))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_request_cookies() {
        let cookies = parse_request_cookies("session=abc; theme=\"dark\";  lang=en");
        assert_eq!(
            join_cookies(&cookies),
            "session=abc; theme=dark; lang=en"
        );
    }

    #[test]
    fn header_without_pairs_has_no_cookies() {
        assert!(parse_request_cookies("just-a-token").is_empty());
        assert!(parse_request_cookies("").is_empty());
        assert!(parse_set_cookie("=value").is_empty());
    }

    #[test]
    fn set_cookie_ignores_attributes() {
        let cookies = parse_set_cookie("token=xyz; Path=/; HttpOnly; Max-Age=3600");
        assert_eq!(
            cookies,
            vec![Cookie {
                name: "token".into(),
                value: "xyz".into()
            }]
        );
    }
}
