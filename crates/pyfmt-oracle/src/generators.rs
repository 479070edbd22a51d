//! Grammar-constrained case generators, one per entry point.
//!
//! Every generator is a `proptest` strategy, so the engine gets shrinking for
//! free and a seeded [`CaseStream`] replays the exact same sequence.
//!
//! Specifier grammars (fill excludes `{` and `}` so a specifier always fits
//! inside one placeholder):
//! - int:    `[[fill]align][sign][#][0][width]type`, type in `bdoxX`
//! - float:  `[[fill]align][sign][0]width.precision type`, type in `eEfFgG`
//! - string: `[[fill]align width]`, alignment always explicit

use proptest::prelude::*;
use proptest::strategy::ValueTree;
use proptest::string::string_regex;
use proptest::test_runner::{Config, RngAlgorithm, TestRng, TestRunner};
use sha2::{Digest, Sha256};

use pyfmt_bridge::{EntryPoint, FormatArg};

use crate::case::FormatCase;
use crate::config::OracleConfig;
use crate::error::OracleError;

/// Python's `string.printable`.
pub const PRINTABLE: &str = "0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ\
!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~ \t\n\r\x0b\x0c";

/// Characters that sit on grammar or alphabet boundaries.
const EDGE_CHARS: &str = "{}:!~ \x0b\x0c0";

pub const INT_SPECIFIER: &str = r"([ -z|~][<>=^]|[<>=^]?)[+\- ]?#?0?[0-9]{0,4}[bdoxX]";
pub const FLOAT_SPECIFIER: &str =
    r"([ -z|~][<>=^]|[<>=^]?)[+\- ]?#?0?[1-9][0-9]{0,3}\.[1-9][0-9]{0,2}[eEfFgG]";
pub const STRING_SPECIFIER: &str = r"([ -z|~]?[<>^][0-9]{0,4})?";

/// Printable text of at most `max_len` characters, biased toward edge characters.
pub fn printable_text(max_len: usize) -> BoxedStrategy<String> {
    let all: Vec<char> = PRINTABLE.chars().collect();
    let edge: Vec<char> = EDGE_CHARS.chars().collect();
    let ch = prop_oneof![
        4 => prop::sample::select(all),
        1 => prop::sample::select(edge),
    ];
    prop::collection::vec(ch, 0..=max_len)
        .prop_map(|chars| chars.into_iter().collect::<String>())
        .boxed()
}

/// Strings matching `pattern`.
pub fn specifier(pattern: &str) -> Result<BoxedStrategy<String>, OracleError> {
    string_regex(pattern)
        .map(Strategy::boxed)
        .map_err(|err| OracleError::Grammar {
            pattern: pattern.to_string(),
            reason: err.to_string(),
        })
}

/// The full signed 32-bit range, with both extremes and small magnitudes boosted.
pub fn int_values() -> BoxedStrategy<i32> {
    prop_oneof![
        6 => any::<i32>(),
        2 => -1000i32..1000,
        1 => Just(i32::MIN),
        1 => Just(i32::MAX),
        1 => Just(0),
    ]
    .boxed()
}

/// Finite doubles and NaN; never infinity.
pub fn double_values() -> BoxedStrategy<f64> {
    use prop::num::f64 as f;
    prop_oneof![
        8 => f::POSITIVE | f::NEGATIVE | f::NORMAL | f::SUBNORMAL | f::ZERO,
        1 => prop::sample::select(vec![f64::NAN, -f64::NAN]),
        2 => prop::sample::select(vec![
            0.0,
            -0.0,
            0.5,
            9.5,
            1e-5,
            1e16,
            1e22,
            f64::EPSILON,
            f64::MIN_POSITIVE,
            f64::MAX,
            f64::MIN,
        ]),
    ]
    .boxed()
}

/// Finite singles and NaN; never infinity.
pub fn float_values() -> BoxedStrategy<f32> {
    use prop::num::f32 as f;
    prop_oneof![
        8 => f::POSITIVE | f::NEGATIVE | f::NORMAL | f::SUBNORMAL | f::ZERO,
        1 => prop::sample::select(vec![f32::NAN, -f32::NAN]),
        2 => prop::sample::select(vec![
            0.0,
            -0.0,
            0.5,
            9.5,
            1e-5,
            16_777_216.0,
            f32::EPSILON,
            f32::MIN_POSITIVE,
            f32::MAX,
            f32::MIN,
        ]),
    ]
    .boxed()
}

/// Generator of cases for `entry`, sized by `config`.
pub fn case_strategy(
    entry: EntryPoint,
    config: &OracleConfig,
) -> Result<BoxedStrategy<FormatCase>, OracleError> {
    let affix = || printable_text(config.max_affix_len);
    let strategy = match entry {
        EntryPoint::NoArgs => printable_text(config.max_template_len)
            .prop_map(FormatCase::template_only)
            .boxed(),
        EntryPoint::OneInt => (affix(), specifier(INT_SPECIFIER)?, affix(), int_values())
            .prop_map(|(p, s, x, v)| FormatCase::new(p, s, x, FormatArg::Int(v)))
            .boxed(),
        EntryPoint::OneFloat32 => (
            affix(),
            specifier(FLOAT_SPECIFIER)?,
            affix(),
            float_values(),
        )
            .prop_map(|(p, s, x, v)| FormatCase::new(p, s, x, FormatArg::Float32(v)))
            .boxed(),
        EntryPoint::OneFloat64 => (
            affix(),
            specifier(FLOAT_SPECIFIER)?,
            affix(),
            double_values(),
        )
            .prop_map(|(p, s, x, v)| FormatCase::new(p, s, x, FormatArg::Float64(v)))
            .boxed(),
        EntryPoint::OneString => (
            affix(),
            specifier(STRING_SPECIFIER)?,
            affix(),
            printable_text(config.max_string_len),
        )
            .prop_map(|(p, s, x, v)| FormatCase::new(p, s, x, FormatArg::Str(v)))
            .boxed(),
    };
    Ok(strategy)
}

/// Expand a `u64` seed into the 32-byte ChaCha seed.
#[must_use]
pub fn seed_bytes(seed: u64) -> [u8; 32] {
    let digest = Sha256::digest(seed.to_le_bytes());
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&digest);
    bytes
}

/// Deterministic RNG for `seed`.
#[must_use]
pub fn seeded_rng(seed: u64) -> TestRng {
    TestRng::from_seed(RngAlgorithm::ChaCha, &seed_bytes(seed))
}

/// An unbounded, replayable sequence of generated cases.
///
/// Two streams built with the same entry point, configuration, and seed
/// yield the same cases in the same order.
pub struct CaseStream {
    strategy: BoxedStrategy<FormatCase>,
    runner: TestRunner,
}

impl CaseStream {
    pub fn new(entry: EntryPoint, config: &OracleConfig, seed: u64) -> Result<Self, OracleError> {
        Ok(Self {
            strategy: case_strategy(entry, config)?,
            runner: TestRunner::new_with_rng(Config::default(), seeded_rng(seed)),
        })
    }
}

impl Iterator for CaseStream {
    type Item = FormatCase;

    fn next(&mut self) -> Option<FormatCase> {
        // Generation only fails when a filter rejects too often; these
        // strategies have no filters.
        self.strategy
            .new_tree(&mut self.runner)
            .ok()
            .map(|tree| tree.current())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    const SAMPLES: usize = 400;

    fn anchored(pattern: &str) -> Regex {
        Regex::new(&format!("^(?:{pattern})$")).expect("grammar compiles")
    }

    fn sample(entry: EntryPoint, config: &OracleConfig) -> Vec<FormatCase> {
        CaseStream::new(entry, config, 0x5EED)
            .expect("strategy builds")
            .take(SAMPLES)
            .collect()
    }

    fn is_printable(s: &str) -> bool {
        s.chars().all(|c| PRINTABLE.contains(c))
    }

    #[test]
    fn every_grammar_compiles() {
        for pattern in [INT_SPECIFIER, FLOAT_SPECIFIER, STRING_SPECIFIER] {
            assert!(specifier(pattern).is_ok(), "{pattern}");
        }
        assert!(matches!(
            specifier("(unclosed"),
            Err(OracleError::Grammar { .. })
        ));
    }

    #[test]
    fn int_cases_follow_grammar_and_bounds() {
        let config = OracleConfig::default();
        let grammar = anchored(INT_SPECIFIER);
        let cases = sample(EntryPoint::OneInt, &config);
        for case in &cases {
            assert!(grammar.is_match(&case.specifier), "{}", case.specifier);
            assert!(!case.specifier.contains(['{', '}']), "{}", case.specifier);
            assert!(case.prefix.chars().count() <= config.max_affix_len);
            assert!(case.suffix.chars().count() <= config.max_affix_len);
            assert!(is_printable(&case.prefix) && is_printable(&case.suffix));
        }
        let values: Vec<i32> = cases
            .iter()
            .filter_map(|c| match c.value {
                FormatArg::Int(v) => Some(v),
                _ => None,
            })
            .collect();
        assert_eq!(values.len(), SAMPLES);
        assert!(values.contains(&i32::MIN));
        assert!(values.contains(&i32::MAX));
    }

    #[test]
    fn float_cases_always_carry_width_and_precision() {
        let config = OracleConfig::default();
        let grammar = anchored(FLOAT_SPECIFIER);
        for entry in [EntryPoint::OneFloat32, EntryPoint::OneFloat64] {
            let cases = sample(entry, &config);
            let mut saw_nan = false;
            let mut saw_alternate = false;
            for case in &cases {
                saw_alternate |= case.specifier.contains('#');
                assert!(grammar.is_match(&case.specifier), "{}", case.specifier);
                assert!(case.specifier.contains('.'));
                match case.value {
                    FormatArg::Float32(v) => {
                        assert!(!v.is_infinite());
                        saw_nan |= v.is_nan();
                    }
                    FormatArg::Float64(v) => {
                        assert!(!v.is_infinite());
                        saw_nan |= v.is_nan();
                    }
                    ref other => panic!("unexpected value {other:?}"),
                }
            }
            assert!(saw_nan, "{entry} never generated NaN");
            assert!(saw_alternate, "{entry} never generated the `#` flag");
        }
    }

    #[test]
    fn string_alignment_is_always_explicit() {
        let config = OracleConfig {
            max_string_len: 4,
            ..OracleConfig::default()
        };
        let grammar = anchored(STRING_SPECIFIER);
        for case in sample(EntryPoint::OneString, &config) {
            assert!(grammar.is_match(&case.specifier), "{}", case.specifier);
            if !case.specifier.is_empty() {
                assert!(case.specifier.contains(['<', '>', '^']), "{}", case.specifier);
            }
            let FormatArg::Str(value) = &case.value else {
                panic!("expected string value");
            };
            assert!(value.chars().count() <= 4);
            assert!(is_printable(value));
            assert!(!value.contains('\0'));
        }
    }

    #[test]
    fn no_args_cases_are_bare_templates() {
        let config = OracleConfig {
            max_template_len: 6,
            ..OracleConfig::default()
        };
        for case in sample(EntryPoint::NoArgs, &config) {
            assert_eq!(case.value, FormatArg::None);
            assert!(case.specifier.is_empty() && case.suffix.is_empty());
            assert_eq!(case.template(), case.prefix);
            assert!(case.prefix.chars().count() <= 6);
            assert!(is_printable(&case.prefix));
        }
    }

    #[test]
    fn streams_replay_from_seed() {
        let config = OracleConfig::default();
        let a: Vec<String> = CaseStream::new(EntryPoint::OneFloat64, &config, 7)
            .unwrap()
            .take(50)
            .map(|c| c.to_string())
            .collect();
        let b: Vec<String> = CaseStream::new(EntryPoint::OneFloat64, &config, 7)
            .unwrap()
            .take(50)
            .map(|c| c.to_string())
            .collect();
        let c: Vec<String> = CaseStream::new(EntryPoint::OneFloat64, &config, 8)
            .unwrap()
            .take(50)
            .map(|c| c.to_string())
            .collect();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn seed_expansion_is_stable() {
        assert_eq!(seed_bytes(1), seed_bytes(1));
        assert_ne!(seed_bytes(1), seed_bytes(2));
    }
}
