//! Wildcard matching and `${namespace:key}` policy variable expansion.

use crate::condition::ConditionValues;

/// Namespaces whose `${ns:key}` variables are expanded from condition values.
const VARIABLE_NAMESPACES: &[&str] = &["aws", "jwt", "ldap", "s3", "sts", "svc"];

/// Matches `text` against `pattern`, where `*` matches any run of characters
/// (including none) and `?` matches exactly one character.
pub fn matches(pattern: &str, text: &str) -> bool {
    if pattern == "*" {
        return true;
    }

    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some(&c) if c == '?' || c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match backtrack {
                Some((star, consumed)) => {
                    // let the last star swallow one more character
                    p = star + 1;
                    t = consumed + 1;
                    backtrack = Some((star, consumed + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|c| *c == '*')
}

/// Expands `${ns:key}` variables in `input` using the first value stored under
/// `key` in `values`.
///
/// Unknown namespaces, missing keys and empty values leave the variable untouched.
pub fn substitute(input: &str, values: &ConditionValues) -> String {
    if values.is_empty() || !input.contains("${") {
        return input.to_string();
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let Some(end) = tail.find('}') else {
            out.push_str(tail);
            return out;
        };

        let variable = &tail[2..end];
        match expand_variable(variable, values) {
            Some(value) => out.push_str(value),
            None => out.push_str(&tail[..=end]),
        }
        rest = &tail[end + 1..];
    }

    out.push_str(rest);
    out
}

fn expand_variable<'a>(variable: &str, values: &'a ConditionValues) -> Option<&'a str> {
    let (namespace, key) = variable.split_once(':')?;
    if !VARIABLE_NAMESPACES.contains(&namespace) {
        return None;
    }
    values
        .first(key)
        .filter(|value| !value.is_empty())
}

/// Lexically cleans a slash-separated path the way S3 resource names are
/// compared: collapses repeated slashes, drops `.` segments and resolves `..`.
pub fn clean_path(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }

    let rooted = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|last| *last != "..") {
                    segments.pop();
                } else if !rooted {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("*", "", true)]
    #[case("*", "anything/at/all", true)]
    #[case("bucket/*", "bucket/", true)]
    #[case("bucket/*", "bucket/docs/a.txt", true)]
    #[case("bucket/*", "other/a.txt", false)]
    #[case("s3:Get*", "s3:GetObject", true)]
    #[case("s3:Get*", "s3:PutObject", false)]
    #[case("s3:?etObject", "s3:GetObject", true)]
    #[case("a*b*c", "aXXbYYc", true)]
    #[case("a*b*c", "aXXbYY", false)]
    #[case("exact", "exact", true)]
    #[case("exact", "exactly", false)]
    #[case("", "", true)]
    #[case("", "x", false)]
    fn test_wildcard_matches(#[case] pattern: &str, #[case] text: &str, #[case] expected: bool) {
        assert_eq!(matches(pattern, text), expected, "{pattern} vs {text}");
    }

    #[test]
    fn test_substitute_known_variables() {
        let values = ConditionValues::new()
            .with("username", ["alice"])
            .with("sub", ["user-123"]);

        assert_eq!(
            substitute("home/${aws:username}/*", &values),
            "home/alice/*"
        );
        assert_eq!(substitute("${jwt:sub}-${aws:username}", &values), "user-123-alice");
    }

    #[test]
    fn test_substitute_leaves_unknown_variables() {
        let values = ConditionValues::new().with("username", [""]);

        assert_eq!(substitute("${aws:username}", &values), "${aws:username}");
        assert_eq!(substitute("${custom:thing}", &values), "${custom:thing}");
        assert_eq!(substitute("broken ${aws:username", &values), "broken ${aws:username");
    }

    #[rstest]
    #[case("", ".")]
    #[case("/", "/")]
    #[case("bucket/", "bucket")]
    #[case("bucket//a/./b", "bucket/a/b")]
    #[case("bucket/a/../b", "bucket/b")]
    #[case("/../a", "/a")]
    fn test_clean_path(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(clean_path(input), expected);
    }
}
