//! The fixed set of formatter entry points.

use std::fmt;

/// One formatter variant exported by the subject artifact.
///
/// Each variant names a value-returning symbol and a sibling `*Error` probe
/// with the same argument shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntryPoint {
    /// Template only, no substitution value.
    NoArgs,
    /// One `int` (signed 32-bit).
    OneInt,
    /// One `float` (IEEE-754 single).
    OneFloat32,
    /// One `double` (IEEE-754 double).
    OneFloat64,
    /// One NUL-terminated string.
    OneString,
}

impl EntryPoint {
    /// Every entry point, in adjudication order.
    pub const ALL: [Self; 5] = [
        Self::NoArgs,
        Self::OneInt,
        Self::OneFloat32,
        Self::OneFloat64,
        Self::OneString,
    ];

    /// Symbol of the value-returning formatter.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::NoArgs => "FormatNothing",
            Self::OneInt => "FormatOneInt",
            Self::OneFloat32 => "FormatOneFloat",
            Self::OneFloat64 => "FormatOneDouble",
            Self::OneString => "FormatOneString",
        }
    }

    /// Symbol of the sibling error probe.
    #[must_use]
    pub const fn error_symbol(self) -> &'static str {
        match self {
            Self::NoArgs => "FormatNothingError",
            Self::OneInt => "FormatOneIntError",
            Self::OneFloat32 => "FormatOneFloatError",
            Self::OneFloat64 => "FormatOneDoubleError",
            Self::OneString => "FormatOneStringError",
        }
    }

    /// Stable lowercase name used by the CLI, logs, and reports.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::NoArgs => "no_args",
            Self::OneInt => "int",
            Self::OneFloat32 => "float",
            Self::OneFloat64 => "double",
            Self::OneString => "string",
        }
    }

    /// Parse from a name (case-insensitive, accepts symbol names too).
    #[must_use]
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "no_args" | "noargs" | "nothing" | "formatnothing" => Some(Self::NoArgs),
            "int" | "oneint" | "i32" | "formatoneint" => Some(Self::OneInt),
            "float" | "float32" | "f32" | "onefloat32" | "formatonefloat" => {
                Some(Self::OneFloat32)
            }
            "double" | "float64" | "f64" | "onefloat64" | "formatonedouble" => {
                Some(Self::OneFloat64)
            }
            "string" | "str" | "onestring" | "formatonestring" => Some(Self::OneString),
            _ => None,
        }
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
