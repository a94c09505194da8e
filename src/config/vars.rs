//! Environment variable interpolation for config files.
//!
//! Supports `${VAR}` (error if missing) and `${VAR:-default}` (default when
//! unset or empty). `$$` escapes a literal `$`.

use regex::Regex;
use std::env;
use std::sync::LazyLock;

static VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\$|\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}").expect("Invalid regex pattern")
});

/// Result of environment variable interpolation.
#[derive(Debug)]
pub struct Interpolated {
    /// The interpolated text.
    pub text: String,
    /// Names of referenced variables that were not set and had no default.
    pub missing: Vec<String>,
}

impl Interpolated {
    pub fn is_ok(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Interpolate environment variables in the given text.
///
/// Missing variables are accumulated rather than failing fast so the user
/// sees every unset variable at once.
pub fn interpolate(input: &str) -> Interpolated {
    let mut missing = Vec::new();

    let text = VAR_PATTERN
        .replace_all(input, |caps: &regex::Captures| {
            if &caps[0] == "$$" {
                return "$".to_string();
            }

            let name = caps[1].to_string();
            let default = caps.get(2).map(|m| m.as_str());

            match (env::var(&name).ok(), default) {
                (Some(value), Some(fallback)) if value.is_empty() => fallback.to_string(),
                (Some(value), _) => value,
                (None, Some(fallback)) => fallback.to_string(),
                (None, None) => {
                    missing.push(name);
                    caps[0].to_string()
                }
            }
        })
        .to_string();

    Interpolated { text, missing }
}
