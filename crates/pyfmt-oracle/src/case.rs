//! One generated input sample.

use std::fmt;

use pyfmt_bridge::{EntryPoint, FormatArg};
use serde::{Deserialize, Serialize};

/// Template fragments plus a typed value.
///
/// For valued entry points the template is `prefix + "{:" + specifier + "}" + suffix`.
/// A `NoArgs` case carries its whole template in `prefix` and inserts no
/// placeholder.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatCase {
    pub prefix: String,
    pub specifier: String,
    pub suffix: String,
    pub value: FormatArg,
}

impl FormatCase {
    #[must_use]
    pub fn new(
        prefix: impl Into<String>,
        specifier: impl Into<String>,
        suffix: impl Into<String>,
        value: FormatArg,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            specifier: specifier.into(),
            suffix: suffix.into(),
            value,
        }
    }

    /// A zero-argument case whose template is taken verbatim.
    #[must_use]
    pub fn template_only(template: impl Into<String>) -> Self {
        Self::new(template, "", "", FormatArg::None)
    }

    #[must_use]
    pub const fn entry_point(&self) -> EntryPoint {
        self.value.entry_point()
    }

    /// The full template handed to both formatters.
    #[must_use]
    pub fn template(&self) -> String {
        if matches!(self.value, FormatArg::None) {
            return format!("{}{}", self.prefix, self.suffix);
        }
        format!("{}{{:{}}}{}", self.prefix, self.specifier, self.suffix)
    }

    /// Record for logs and reports.
    #[must_use]
    pub fn record(&self) -> CaseRecord {
        CaseRecord {
            entry_point: self.entry_point().name().to_string(),
            template: self.template(),
            value: value_repr(&self.value),
        }
    }
}

impl fmt::Display for FormatCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}.format({})", self.template(), value_repr(&self.value))
    }
}

/// Serializable view of a [`FormatCase`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub entry_point: String,
    pub template: String,
    pub value: String,
}

/// Render a value so that it can be typed back in exactly.
///
/// Floats carry their bit pattern because decimal text loses NaN payloads
/// and the sign of zero is easy to misread.
#[must_use]
pub fn value_repr(value: &FormatArg) -> String {
    match value {
        FormatArg::None => String::new(),
        FormatArg::Int(v) => v.to_string(),
        FormatArg::Float32(v) => format!("{v:?}f32 /* {:#010x} */", v.to_bits()),
        FormatArg::Float64(v) => format!("{v:?} /* {:#018x} */", v.to_bits()),
        FormatArg::Str(s) => format!("{s:?}"),
    }
}

/// Parse a command-line value for `entry`.
///
/// Floats accept decimal text (`nan`, `-0.0`, `1e300`) or a raw bit
/// pattern in `0x` hex, as printed by [`value_repr`].
pub fn parse_value(entry: EntryPoint, text: &str) -> Result<FormatArg, String> {
    let text = text.trim();
    let bad = |e: &dyn fmt::Display| format!("invalid {} value {text:?}: {e}", entry.name());
    match entry {
        EntryPoint::NoArgs if text.is_empty() => Ok(FormatArg::None),
        EntryPoint::NoArgs => Err(format!("no_args takes no value, got {text:?}")),
        EntryPoint::OneInt => text.parse().map(FormatArg::Int).map_err(|e| bad(&e)),
        EntryPoint::OneFloat32 => match hex_bits(text) {
            Some(bits) => u32::try_from(bits)
                .map(|b| FormatArg::Float32(f32::from_bits(b)))
                .map_err(|e| bad(&e)),
            None => text.parse().map(FormatArg::Float32).map_err(|e| bad(&e)),
        },
        EntryPoint::OneFloat64 => match hex_bits(text) {
            Some(bits) => Ok(FormatArg::Float64(f64::from_bits(bits))),
            None => text.parse().map(FormatArg::Float64).map_err(|e| bad(&e)),
        },
        EntryPoint::OneString => Ok(FormatArg::Str(text.to_string())),
    }
}

fn hex_bits(text: &str) -> Option<u64> {
    let hex = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X"))?;
    u64::from_str_radix(hex, 16).ok()
}
