//! Splitting of the free-form `flags` input into gcloud arguments.

use regex::Regex;
use std::sync::LazyLock;

/// A run of unquoted characters (no whitespace, `=`, or `"`) or a
/// double-quoted span, repeated so `a"b c"d` stays one token.
static FLAG_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:"[^"]*"|[^"\s=]+)+"#).expect("flag token pattern is valid")
});

/// Split a flag string on whitespace or `=`, keeping double-quoted spans
/// intact.
///
/// Quotes are removed from the returned tokens since the arguments are passed
/// to the process directly, not through a shell.
///
/// ```
/// let flags = appship_core::flags::tokenize(r#"--log-http   --foo=bar --labels="a b""#);
/// assert_eq!(flags, ["--log-http", "--foo", "bar", "--labels", "a b"]);
/// ```
pub fn tokenize(raw: &str) -> Vec<String> {
    FLAG_TOKEN
        .find_iter(raw)
        .map(|m| m.as_str().replace('"', ""))
        .collect()
}
