//! The persisted assignment cookie and a small cookie-jar abstraction.
//!
//! The router never touches framework request objects directly. It reads and
//! writes cookies through [`CookieJar`], which the HTTP server implements over
//! request/response headers and tests implement with [`MemoryCookieJar`].

use std::collections::HashMap;
use std::fmt;

use crate::catalog::Variant;

/// Name of the cookie holding the visitor's variant.
pub const VARIANT_COOKIE_NAME: &str = "ab_variant";

/// Lifetime of the variant cookie: 30 days.
pub const VARIANT_COOKIE_MAX_AGE_SECS: u64 = 60 * 60 * 24 * 30;

/// `SameSite` attribute values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Strict => "Strict",
            Self::Lax => "Lax",
            Self::None => "None",
        })
    }
}

/// A cookie to be written to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub max_age_secs: u64,
    pub path: String,
    pub same_site: SameSite,
}

impl Cookie {
    /// The `ab_variant` cookie persisting an assignment.
    #[must_use]
    pub fn assignment(variant: &Variant) -> Self {
        Self {
            name: VARIANT_COOKIE_NAME.to_owned(),
            value: variant.as_str().to_owned(),
            max_age_secs: VARIANT_COOKIE_MAX_AGE_SECS,
            path: "/".to_owned(),
            same_site: SameSite::Lax,
        }
    }

    /// Render as a `Set-Cookie` header value.
    #[must_use]
    pub fn to_header_value(&self) -> String {
        format!(
            "{}={}; Max-Age={}; Path={}; SameSite={}",
            self.name, self.value, self.max_age_secs, self.path, self.same_site
        )
    }
}

impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_header_value())
    }
}

/// Read/write access to a request's cookies.
pub trait CookieJar {
    /// Value of the named cookie, if present and readable.
    fn get_cookie(&self, name: &str) -> Option<String>;

    /// Queue a cookie to be sent with the response.
    fn set_cookie(&mut self, cookie: Cookie);
}

/// In-memory jar: incoming cookies in a map, outgoing cookies in a list.
#[derive(Debug, Clone, Default)]
pub struct MemoryCookieJar {
    incoming: HashMap<String, String>,
    outgoing: Vec<Cookie>,
}

impl MemoryCookieJar {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Jar pre-populated with a single incoming cookie.
    #[must_use]
    pub fn with_cookie(name: &str, value: &str) -> Self {
        let mut jar = Self::new();
        jar.incoming.insert(name.to_owned(), value.to_owned());
        jar
    }

    /// Jar pre-populated from a raw `Cookie` header value.
    #[must_use]
    pub fn from_header(header: &str) -> Self {
        Self {
            incoming: parse_cookie_header(header).collect(),
            outgoing: Vec::new(),
        }
    }

    /// Cookies queued by `set_cookie`, in call order.
    #[must_use]
    pub fn set_cookies(&self) -> &[Cookie] {
        &self.outgoing
    }
}

impl CookieJar for MemoryCookieJar {
    fn get_cookie(&self, name: &str) -> Option<String> {
        self.incoming.get(name).cloned()
    }

    fn set_cookie(&mut self, cookie: Cookie) {
        self.outgoing.push(cookie);
    }
}

/// Split a `Cookie` header value into `(name, value)` pairs.
///
/// Pairs without `=` or with an empty name are skipped; surrounding double
/// quotes on a value are removed. When a name repeats, later pairs win once
/// collected into a map.
pub fn parse_cookie_header(header: &str) -> impl Iterator<Item = (String, String)> + '_ {
    header.split(';').filter_map(|pair| {
        let (name, value) = pair.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let value = value.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);
        Some((name.to_owned(), value.to_owned()))
    })
}

/// Find a cookie by name in a `Cookie` header value. The first match wins.
#[must_use]
pub fn find_cookie(header: &str, name: &str) -> Option<String> {
    parse_cookie_header(header)
        .find(|(n, _)| n == name)
        .map(|(_, v)| v)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::VariantCatalog;

    #[test]
    fn assignment_cookie_header_has_expected_attributes() {
        let catalog = VariantCatalog::default();
        let cookie = Cookie::assignment(catalog.get("C").unwrap());
        assert_eq!(
            cookie.to_header_value(),
            "ab_variant=C; Max-Age=2592000; Path=/; SameSite=Lax"
        );
    }

    #[test]
    fn max_age_is_thirty_days() {
        assert_eq!(VARIANT_COOKIE_MAX_AGE_SECS, 2_592_000);
    }

    #[test]
    fn parses_multiple_pairs_with_whitespace() {
        let pairs: Vec<_> = parse_cookie_header("session=abc;  ab_variant=B ; theme=dark").collect();
        assert_eq!(
            pairs,
            [
                ("session".to_owned(), "abc".to_owned()),
                ("ab_variant".to_owned(), "B".to_owned()),
                ("theme".to_owned(), "dark".to_owned()),
            ]
        );
    }

    #[test]
    fn strips_quotes_and_skips_garbage() {
        assert_eq!(find_cookie("ab_variant=\"D\"", "ab_variant").as_deref(), Some("D"));
        assert_eq!(find_cookie("garbage; =x; ;;", "ab_variant"), None);
        assert_eq!(find_cookie("", "ab_variant"), None);
    }

    #[test]
    fn value_may_contain_equals() {
        assert_eq!(find_cookie("tok=a=b", "tok").as_deref(), Some("a=b"));
    }

    #[test]
    fn first_duplicate_wins_in_find() {
        assert_eq!(find_cookie("ab_variant=A; ab_variant=B", "ab_variant").as_deref(), Some("A"));
    }

    #[test]
    fn memory_jar_records_set_cookies() {
        let mut jar = MemoryCookieJar::from_header("ab_variant=A");
        assert_eq!(jar.get_cookie("ab_variant").as_deref(), Some("A"));
        assert!(jar.set_cookies().is_empty());

        let catalog = VariantCatalog::default();
        jar.set_cookie(Cookie::assignment(catalog.get("B").unwrap()));
        assert_eq!(jar.set_cookies().len(), 1);
        assert_eq!(jar.set_cookies()[0].value, "B");
    }
}
