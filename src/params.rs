//! Connection parameter extraction from the raw user string.
//!
//! The JDBC-style connection surface has nowhere to put plugin-specific
//! options, so `mongosql_auth` smuggles them in a query-string-like suffix
//! on the username: `alice?serviceName=mongosql&other=1`. This is not URL
//! parsing - no unescaping is performed and the source is the raw username,
//! not a URL.

/// Extract the value of a named parameter from a user string.
///
/// The parameter matches only when `name` first occurs at an index greater
/// than zero, the character immediately before it is `?` or `&`, and the
/// character immediately after it is `=`. The value runs from just past the
/// `=` to the next `&` or to the end of the string.
///
/// # Example
///
/// ```
/// use mongosql_auth_client::params::find_parameter;
///
/// assert_eq!(
///     find_parameter("serviceName", "alice?serviceName=mongod&x=1"),
///     Some("mongod")
/// );
/// assert_eq!(find_parameter("serviceName", "bob?x=1"), None);
/// // A match at index 0 is the bare username, not a parameter.
/// assert_eq!(find_parameter("serviceName", "serviceName=top"), None);
/// ```
pub fn find_parameter<'a>(name: &str, source: &'a str) -> Option<&'a str> {
    let idx = source.find(name)?;
    if idx == 0 {
        return None;
    }
    let preceding = source[..idx].chars().next_back()?;
    if preceding != '?' && preceding != '&' {
        return None;
    }

    let rest = &source[idx + name.len()..];
    let value = rest.strip_prefix('=')?;

    match value.find('&') {
        Some(end) => Some(&value[..end]),
        None => Some(value),
    }
}
