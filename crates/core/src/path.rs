//! Filesystem path simplification shared by every filesystem-shaped peripheral.

use crate::constants::NN_MAX_PATH;
use crate::error::{Exit, NnResult};

const ILLEGAL_CHARS: &[char] = &['"', ':', '*', '?', '<', '>', '|'];

/// Normalizes separators to `/`, collapses runs of `/`, and strips leading
/// and trailing separators. `..` segments are left as-is (reserved for a
/// future implementation, per the upstream contract).
///
/// Rejects paths containing any of `":*?<>|` (backslash is a separator, not
/// an illegal character, since it is normalized to `/` before this check
/// would apply) or exceeding `NN_MAX_PATH` bytes.
pub fn simplify(path: &str) -> NnResult<String> {
    if path.len() > NN_MAX_PATH {
        return Err(Exit::Limit);
    }
    for c in path.chars() {
        if c == '"' || c == ':' || c == '*' || c == '?' || c == '<' || c == '>' || c == '|' {
            return Err(Exit::BadCall);
        }
    }
    let normalized: String = path.chars().map(|c| if c == '\\' { '/' } else { c }).collect();

    let mut segments = Vec::new();
    for segment in normalized.split('/') {
        if segment.is_empty() {
            continue;
        }
        segments.push(segment);
    }
    let result = segments.join("/");
    if result.len() > NN_MAX_PATH {
        return Err(Exit::Limit);
    }
    Ok(result)
}

/// True if `path` contains any character this workspace's filesystem
/// contract forbids, without otherwise touching it.
pub fn has_illegal_chars(path: &str) -> bool {
    path.chars().any(|c| ILLEGAL_CHARS.contains(&c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_and_strips() {
        assert_eq!(simplify("//a//b/c/").unwrap(), "a/b/c");
    }

    #[test]
    fn backslash_becomes_forward_slash() {
        assert_eq!(simplify(r"a\b\c").unwrap(), "a/b/c");
    }

    #[test]
    fn dotdot_left_as_is() {
        assert_eq!(simplify("a/../b").unwrap(), "a/../b");
    }

    #[test]
    fn rejects_illegal_chars() {
        assert!(simplify("a:b").is_err());
        assert!(simplify("a*b").is_err());
    }

    #[test]
    fn rejects_oversized_path() {
        let long = "a".repeat(NN_MAX_PATH + 1);
        assert!(simplify(&long).is_err());
    }

    #[test]
    fn idempotent() {
        let cases = ["//a//b/c/", "a/../b", "plain", ""];
        for c in cases {
            if let Ok(once) = simplify(c) {
                let twice = simplify(&once).unwrap();
                assert_eq!(once, twice);
            }
        }
    }
}
