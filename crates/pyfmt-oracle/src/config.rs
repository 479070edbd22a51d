//! Run configuration.
//!
//! Every knob has a default and an environment override, read once per
//! process and cached:
//! - `PYFMT_ORACLE_CASES`: generated cases per property (default 1000).
//! - `PYFMT_ORACLE_VERBOSE`: trace every case before asserting.
//! - `PYFMT_ORACLE_SEED`: root seed (decimal or `0x...`).
//! - `PYFMT_ORACLE_MAX_AFFIX` / `_MAX_STRING` / `_MAX_TEMPLATE`: size bounds.
//! - `PYFMT_ORACLE_PYTHON`: reference interpreter (default `python3`).
//! - `PYFMT_BRIDGE_LIB`: subject shared object.
//!
//! CLI flags override the environment.

use std::path::PathBuf;
use std::sync::OnceLock;

use pyfmt_bridge::BRIDGE_LIB_ENV;

pub const CASES_ENV: &str = "PYFMT_ORACLE_CASES";
pub const VERBOSE_ENV: &str = "PYFMT_ORACLE_VERBOSE";
pub const SEED_ENV: &str = "PYFMT_ORACLE_SEED";
pub const MAX_AFFIX_ENV: &str = "PYFMT_ORACLE_MAX_AFFIX";
pub const MAX_STRING_ENV: &str = "PYFMT_ORACLE_MAX_STRING";
pub const MAX_TEMPLATE_ENV: &str = "PYFMT_ORACLE_MAX_TEMPLATE";
pub const PYTHON_ENV: &str = "PYFMT_ORACLE_PYTHON";

const DEFAULT_CASES: u32 = 1000;
const DEFAULT_MAX_AFFIX: usize = 10;
const DEFAULT_MAX_STRING: usize = 10;
const DEFAULT_MAX_TEMPLATE: usize = 20;
const DEFAULT_PYTHON: &str = "python3";

/// Knobs for one oracle run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleConfig {
    /// Generated cases per property.
    pub cases: u32,
    /// Emit every case and both outcomes before adjudicating it.
    pub verbose: bool,
    /// Longest generated prefix or suffix.
    pub max_affix_len: usize,
    /// Longest generated string value.
    pub max_string_len: usize,
    /// Longest generated zero-argument template.
    pub max_template_len: usize,
    /// Root seed; a run without one picks one and reports it.
    pub seed: Option<u64>,
    /// Subject shared object.
    pub bridge_lib: Option<PathBuf>,
    /// Reference interpreter.
    pub python: String,
    /// JSONL log destination.
    pub log_path: Option<PathBuf>,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            cases: DEFAULT_CASES,
            verbose: false,
            max_affix_len: DEFAULT_MAX_AFFIX,
            max_string_len: DEFAULT_MAX_STRING,
            max_template_len: DEFAULT_MAX_TEMPLATE,
            seed: None,
            bridge_lib: None,
            python: DEFAULT_PYTHON.to_string(),
            log_path: None,
        }
    }
}

impl OracleConfig {
    /// Build from a variable lookup; unparsable values fall back to defaults.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            cases: lookup(CASES_ENV)
                .and_then(|v| v.trim().parse().ok())
                .filter(|&n: &u32| n > 0)
                .unwrap_or(defaults.cases),
            verbose: lookup(VERBOSE_ENV).is_some_and(|v| parse_flag(&v)),
            max_affix_len: lookup(MAX_AFFIX_ENV)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.max_affix_len),
            max_string_len: lookup(MAX_STRING_ENV)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.max_string_len),
            max_template_len: lookup(MAX_TEMPLATE_ENV)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.max_template_len),
            seed: lookup(SEED_ENV).and_then(|v| parse_seed(&v)),
            bridge_lib: lookup(BRIDGE_LIB_ENV)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            python: lookup(PYTHON_ENV)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.python),
            log_path: None,
        }
    }

    /// Build from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }
}

static GLOBAL_CONFIG: OnceLock<OracleConfig> = OnceLock::new();

/// The environment-derived configuration (read on first call, cached thereafter).
#[must_use]
pub fn oracle_config() -> &'static OracleConfig {
    GLOBAL_CONFIG.get_or_init(OracleConfig::from_env)
}

/// Parse a boolean switch loosely.
#[must_use]
pub fn parse_flag(s: &str) -> bool {
    matches!(
        s.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Parse a seed in decimal or `0x` hex; `_` separators are allowed.
#[must_use]
pub fn parse_seed(s: &str) -> Option<u64> {
    let cleaned: String = s.trim().chars().filter(|&c| c != '_').collect();
    match cleaned
        .strip_prefix("0x")
        .or_else(|| cleaned.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => cleaned.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = OracleConfig::from_lookup(|_| None);
        assert_eq!(config, OracleConfig::default());
        assert_eq!(config.cases, 1000);
        assert_eq!(config.max_affix_len, 10);
        assert_eq!(config.python, "python3");
    }

    #[test]
    fn environment_overrides_are_applied() {
        let config = OracleConfig::from_lookup(lookup_from(&[
            (CASES_ENV, "250"),
            (VERBOSE_ENV, "YES"),
            (SEED_ENV, "0xDEAD_BEEF"),
            (MAX_STRING_ENV, "4"),
            (PYTHON_ENV, "/usr/bin/python3.12"),
            (BRIDGE_LIB_ENV, "/tmp/libbridge.so"),
        ]));
        assert_eq!(config.cases, 250);
        assert!(config.verbose);
        assert_eq!(config.seed, Some(0xDEAD_BEEF));
        assert_eq!(config.max_string_len, 4);
        assert_eq!(config.python, "/usr/bin/python3.12");
        assert_eq!(config.bridge_lib, Some(PathBuf::from("/tmp/libbridge.so")));
    }

    #[test]
    fn bad_values_fall_back() {
        let config = OracleConfig::from_lookup(lookup_from(&[
            (CASES_ENV, "lots"),
            (VERBOSE_ENV, "maybe"),
            (SEED_ENV, "0xZZ"),
            (BRIDGE_LIB_ENV, ""),
        ]));
        assert_eq!(config.cases, 1000);
        assert!(!config.verbose);
        assert_eq!(config.seed, None);
        assert_eq!(config.bridge_lib, None);
    }

    #[test]
    fn zero_cases_is_rejected() {
        let config = OracleConfig::from_lookup(lookup_from(&[(CASES_ENV, "0")]));
        assert_eq!(config.cases, 1000);
    }

    #[test]
    fn seeds_parse_in_both_radixes() {
        assert_eq!(parse_seed("42"), Some(42));
        assert_eq!(parse_seed("0x2A"), Some(42));
        assert_eq!(parse_seed("1_000"), Some(1000));
        assert_eq!(parse_seed(""), None);
    }
}
