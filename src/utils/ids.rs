// src/utils/ids.rs

//! Record identifiers.
//!
//! Generated IDs look like `module_1700000000000_k3j9x2a`: a kind prefix,
//! the creation time in epoch milliseconds and a random base-36 suffix.
//! Un-migrated modules are keyed by their position instead (`"0"`, `"1"`).

use std::sync::OnceLock;

use chrono::Utc;
use rand::Rng;
use regex::Regex;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SUFFIX_LEN: usize = 7;

/// Generate a new `<kind>_<epoch-ms>_<random-base36>` identifier.
pub fn generate_id(kind: &str) -> String {
    format!(
        "{}_{}_{}",
        kind,
        Utc::now().timestamp_millis(),
        random_suffix(SUFFIX_LEN)
    )
}

fn random_suffix(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect()
}

fn positional_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9]+$").expect("static pattern"))
}

/// Whether an identifier is a legacy positional index rather than a stable ID.
pub fn is_positional_id(id: &str) -> bool {
    positional_pattern().is_match(id)
}

/// Positional identifier as an index.
pub fn positional_index(id: &str) -> Option<usize> {
    if is_positional_id(id) {
        id.parse().ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id_shape() {
        let id = generate_id("module");
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "module");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), SUFFIX_LEN);
        assert!(parts[2].bytes().all(|b| BASE36.contains(&b)));
        assert!(!is_positional_id(&id));
    }

    #[test]
    fn test_generated_ids_differ() {
        assert_ne!(generate_id("resource"), generate_id("resource"));
    }

    #[test]
    fn test_is_positional_id() {
        assert!(is_positional_id("0"));
        assert!(is_positional_id("12"));
        assert!(!is_positional_id(""));
        assert!(!is_positional_id("-1"));
        assert!(!is_positional_id("1a"));
        assert!(!is_positional_id("module_1_abc"));
    }

    #[test]
    fn test_positional_index() {
        assert_eq!(positional_index("3"), Some(3));
        assert_eq!(positional_index("m3"), None);
    }
}
