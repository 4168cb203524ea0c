//! Build environment variable expansion
//!
//! Configuration values may reference build environment variables as
//! `$NAME` or `${NAME}`. Expansion is pure: the caller supplies the
//! variable map, nothing is read from the process environment. Unknown
//! variables are left verbatim so a later expansion stage can still
//! resolve them, and `$$` escapes a literal dollar sign.

use std::collections::BTreeMap;

/// Build environment variables used for expansion.
///
/// Ordered so that expanded payloads and log output are deterministic.
pub type EnvVars = BTreeMap<String, String>;

/// Expand `$NAME` and `${NAME}` references in `input` from `env`.
pub fn expand(input: &str, env: &EnvVars) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('$') => {
                chars.next();
                out.push('$');
            }
            Some('{') => {
                chars.next();
                let mut name = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    name.push(c);
                }
                if !closed {
                    // Unterminated reference, keep the raw text
                    out.push_str("${");
                    out.push_str(&name);
                } else if let Some(value) = env.get(&name) {
                    out.push_str(value);
                } else {
                    out.push_str("${");
                    out.push_str(&name);
                    out.push('}');
                }
            }
            Some(&next) if next == '_' || next.is_ascii_alphanumeric() => {
                let mut name = String::new();
                while let Some(&next) = chars.peek() {
                    if next == '_' || next.is_ascii_alphanumeric() {
                        name.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if let Some(value) = env.get(&name) {
                    out.push_str(value);
                } else {
                    out.push('$');
                    out.push_str(&name);
                }
            }
            _ => out.push('$'),
        }
    }

    out
}

/// Expand both names and values of a string map.
pub fn expand_map(map: &BTreeMap<String, String>, env: &EnvVars) -> BTreeMap<String, String> {
    map.iter()
        .map(|(name, value)| (expand(name, env), expand(value, env)))
        .collect()
}
