//! Filter matching for dependency resolution.

use regex::Regex;

use crate::error::{ModelError, ModelResult};
use crate::types::{Deployment, Filter};

/// Returns true if and only if `filter` matches `deployment`.
///
/// The candidate values come from `filter.values` or `filter.value`,
/// whichever is set; setting both or neither is malformed, as is combining
/// `glob` with `regexp`. Candidates are compared against the deployment's
/// name or labels depending on `filter.key`. An empty comparison set is a
/// vacuous non-match, which `negate` turns into a match.
pub fn matches(filter: &Filter, deployment: &Deployment) -> ModelResult<bool> {
    if filter.glob && filter.regexp {
        return Err(ModelError::FilterMalformed(
            "at most one of glob and regexp may be set",
        ));
    }
    let single = filter.value.as_deref().filter(|v| !v.is_empty());
    let multiple = filter.values.as_deref().filter(|vs| !vs.is_empty());
    let values: Vec<&str> = match (single, multiple) {
        (Some(value), None) => vec![value],
        (None, Some(values)) => values.iter().map(String::as_str).collect(),
        (Some(_), Some(_)) | (None, None) => {
            return Err(ModelError::FilterMalformed(
                "exactly one of value and values must be set",
            ))
        }
    };

    let compare_to: Vec<&str> = match filter.key.as_str() {
        "name" => vec![deployment.name.as_str()],
        "labels" => deployment.labels.iter().map(String::as_str).collect(),
        other => return Err(ModelError::UnknownFilterKey(other.to_owned())),
    };
    if compare_to.is_empty() {
        return Ok(filter.negate);
    }

    for value in values {
        if filter.glob || filter.regexp {
            let pattern = if filter.glob {
                glob_to_regex(value)?
            } else {
                value.to_owned()
            };
            let compiled = Regex::new(&pattern).map_err(|source| ModelError::InvalidRegexp {
                pattern,
                source,
            })?;
            if compare_to.iter().any(|candidate| compiled.is_match(candidate)) {
                return Ok(!filter.negate);
            }
        } else if compare_to.iter().any(|candidate| *candidate == value) {
            return Ok(!filter.negate);
        }
    }
    Ok(filter.negate)
}

/// Converts a glob expression into an anchored regular expression.
///
/// `*` matches any run of characters and `?` any single character; `\*`,
/// `\?`, and `\\` escape those literally. Character classes are not
/// supported: unescaped `[` and `]` are rejected rather than leaking regex
/// metacharacters into the compiled pattern.
pub fn glob_to_regex(glob: &str) -> ModelResult<String> {
    let unsupported = |detail: String| ModelError::UnsupportedGlob {
        pattern: glob.to_owned(),
        detail,
    };
    let mut pattern = String::with_capacity(glob.len() + 8);
    pattern.push('^');
    let mut escaped = false;
    for ch in glob.chars() {
        if escaped {
            match ch {
                '*' | '?' | '\\' | '[' | ']' => {
                    pattern.push('\\');
                    pattern.push(ch);
                }
                other => {
                    return Err(unsupported(format!("unknown escape sequence \"\\{other}\"")))
                }
            }
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '*' => pattern.push_str(".*"),
            '?' => pattern.push('.'),
            '[' | ']' => {
                return Err(unsupported("character classes are not supported".to_owned()))
            }
            other => pattern.push_str(&regex::escape(&other.to_string())),
        }
    }
    if escaped {
        return Err(unsupported("dangling escape at end of pattern".to_owned()));
    }
    pattern.push('$');
    Ok(pattern)
}
