//! The process-wide handle onto the subject artifact.

use std::ffi::{CStr, c_char, c_double, c_float, c_int, c_void};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use parking_lot::Mutex;

use crate::buffer::{OwnedCBuffer, to_c_string};
use crate::entry::EntryPoint;
use crate::error::{BridgeLoadError, MarshalError};
use crate::loader::Library;
use crate::outcome::Outcome;

/// Environment variable naming the subject shared object.
pub const BRIDGE_LIB_ENV: &str = "PYFMT_BRIDGE_LIB";

/// A host-native argument for one entry point.
#[derive(Debug, Clone, PartialEq)]
pub enum FormatArg {
    None,
    Int(i32),
    Float32(f32),
    Float64(f64),
    Str(String),
}

impl FormatArg {
    /// The entry point whose signature carries this argument.
    #[must_use]
    pub const fn entry_point(&self) -> EntryPoint {
        match self {
            Self::None => EntryPoint::NoArgs,
            Self::Int(_) => EntryPoint::OneInt,
            Self::Float32(_) => EntryPoint::OneFloat32,
            Self::Float64(_) => EntryPoint::OneFloat64,
            Self::Str(_) => EntryPoint::OneString,
        }
    }

    /// True when the value is a float NaN of either width.
    #[must_use]
    pub fn is_nan(&self) -> bool {
        match self {
            Self::Float32(v) => v.is_nan(),
            Self::Float64(v) => v.is_nan(),
            _ => false,
        }
    }

    const fn kind(&self) -> &'static str {
        match self {
            Self::None => "unit",
            Self::Int(_) => "int",
            Self::Float32(_) => "float",
            Self::Float64(_) => "double",
            Self::Str(_) => "string",
        }
    }
}

type RenderNothing = unsafe extern "C" fn(*const c_char) -> *mut c_char;
type ProbeNothing = unsafe extern "C" fn(*const c_char) -> bool;
type RenderInt = unsafe extern "C" fn(*const c_char, c_int) -> *mut c_char;
type ProbeInt = unsafe extern "C" fn(*const c_char, c_int) -> bool;
type RenderFloat = unsafe extern "C" fn(*const c_char, c_float) -> *mut c_char;
type ProbeFloat = unsafe extern "C" fn(*const c_char, c_float) -> bool;
type RenderDouble = unsafe extern "C" fn(*const c_char, c_double) -> *mut c_char;
type ProbeDouble = unsafe extern "C" fn(*const c_char, c_double) -> bool;
type RenderString = unsafe extern "C" fn(*const c_char, *const c_char) -> *mut c_char;
type ProbeString = unsafe extern "C" fn(*const c_char, *const c_char) -> bool;

/// Every entry point, resolved at load time.
struct SymbolTable {
    nothing: (RenderNothing, ProbeNothing),
    int: (RenderInt, ProbeInt),
    float: (RenderFloat, ProbeFloat),
    double: (RenderDouble, ProbeDouble),
    string: (RenderString, ProbeString),
}

macro_rules! resolve {
    ($lib:expr, $entry:expr, $render:ty, $probe:ty) => {{
        let render = $lib.symbol($entry.symbol())?;
        let probe = $lib.symbol($entry.error_symbol())?;
        // SAFETY: the artifact's ABI contract fixes these signatures; dlsym
        // returned non-null addresses for both.
        unsafe {
            (
                std::mem::transmute::<*mut c_void, $render>(render),
                std::mem::transmute::<*mut c_void, $probe>(probe),
            )
        }
    }};
}

impl SymbolTable {
    fn resolve(lib: &Library) -> Result<Self, BridgeLoadError> {
        Ok(Self {
            nothing: resolve!(lib, EntryPoint::NoArgs, RenderNothing, ProbeNothing),
            int: resolve!(lib, EntryPoint::OneInt, RenderInt, ProbeInt),
            float: resolve!(lib, EntryPoint::OneFloat32, RenderFloat, ProbeFloat),
            double: resolve!(lib, EntryPoint::OneFloat64, RenderDouble, ProbeDouble),
            string: resolve!(lib, EntryPoint::OneString, RenderString, ProbeString),
        })
    }
}

/// Arguments already converted to their C representation.
enum CArg {
    None,
    Int(c_int),
    Float(c_float),
    Double(c_double),
    Str(std::ffi::CString),
}

/// Loaded subject artifact.
///
/// Calls are serialised through an internal lock because the artifact is not
/// known to be reentrant; the handle itself is never mutated after load.
pub struct Bridge {
    table: SymbolTable,
    call_lock: Mutex<()>,
    library: Library,
}

// SAFETY: the raw handle and function pointers are immutable after load, and
// every foreign call holds `call_lock`.
unsafe impl Send for Bridge {}
// SAFETY: see above.
unsafe impl Sync for Bridge {}

static GLOBAL: OnceLock<Result<Bridge, BridgeLoadError>> = OnceLock::new();

impl Bridge {
    /// Load the artifact at `path` and resolve every entry point.
    pub fn load(path: &Path) -> Result<Self, BridgeLoadError> {
        let library = Library::open(path)?;
        let table = SymbolTable::resolve(&library)?;
        Ok(Self {
            table,
            call_lock: Mutex::new(()),
            library,
        })
    }

    /// The process-wide bridge, loaded lazily on first use.
    ///
    /// `path` is consulted only by the first call; when it is `None` the
    /// path comes from [`BRIDGE_LIB_ENV`]. Later calls return the same handle
    /// (or the same load error).
    pub fn global(path: Option<&Path>) -> Result<&'static Self, BridgeLoadError> {
        GLOBAL
            .get_or_init(|| {
                let path = match path {
                    Some(path) => path.to_path_buf(),
                    None => configured_path().ok_or(BridgeLoadError::NotConfigured {
                        env: BRIDGE_LIB_ENV,
                    })?,
                };
                Self::load(&path)
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Path of the loaded artifact.
    #[must_use]
    pub fn artifact_path(&self) -> &Path {
        self.library.path()
    }

    /// Format `template` with `arg` through `entry`.
    ///
    /// The sibling error probe is consulted first; when it reports rejection
    /// the value entry point is not called and the outcome is `Failure`.
    pub fn invoke(
        &self,
        entry: EntryPoint,
        template: &str,
        arg: &FormatArg,
    ) -> Result<Outcome, MarshalError> {
        let c_template = to_c_string("template", template)?;
        let c_arg = marshal(entry, arg)?;

        let _guard = self.call_lock.lock();
        if self.call_probe(&c_template, &c_arg) {
            return Ok(Outcome::failure(format!(
                "{} reported an error",
                entry.error_symbol()
            )));
        }
        Ok(self.call_render(&c_template, &c_arg).map_or_else(
            || Outcome::failure(format!("{} returned null", entry.symbol())),
            |buffer| Outcome::Success(buffer.to_bytes()),
        ))
    }

    /// Ask the sibling `*Error` entry point whether the subject rejects the input.
    pub fn probe_error(
        &self,
        entry: EntryPoint,
        template: &str,
        arg: &FormatArg,
    ) -> Result<bool, MarshalError> {
        let c_template = to_c_string("template", template)?;
        let c_arg = marshal(entry, arg)?;

        let _guard = self.call_lock.lock();
        Ok(self.call_probe(&c_template, &c_arg))
    }

    fn call_probe(&self, template: &CStr, arg: &CArg) -> bool {
        let t = template.as_ptr();
        // SAFETY: pointers are valid NUL-terminated strings for the call and
        // the signatures were fixed at load time.
        unsafe {
            match arg {
                CArg::None => (self.table.nothing.1)(t),
                CArg::Int(v) => (self.table.int.1)(t, *v),
                CArg::Float(v) => (self.table.float.1)(t, *v),
                CArg::Double(v) => (self.table.double.1)(t, *v),
                CArg::Str(s) => (self.table.string.1)(t, s.as_ptr()),
            }
        }
    }

    fn call_render(&self, template: &CStr, arg: &CArg) -> Option<OwnedCBuffer> {
        let t = template.as_ptr();
        // SAFETY: as in `call_probe`; the returned buffer is malloc-owned and
        // handed to the guard straight away.
        unsafe {
            let raw = match arg {
                CArg::None => (self.table.nothing.0)(t),
                CArg::Int(v) => (self.table.int.0)(t, *v),
                CArg::Float(v) => (self.table.float.0)(t, *v),
                CArg::Double(v) => (self.table.double.0)(t, *v),
                CArg::Str(s) => (self.table.string.0)(t, s.as_ptr()),
            };
            OwnedCBuffer::adopt(raw)
        }
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("artifact", &self.library.path())
            .finish_non_exhaustive()
    }
}

fn configured_path() -> Option<PathBuf> {
    std::env::var_os(BRIDGE_LIB_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn marshal(entry: EntryPoint, arg: &FormatArg) -> Result<CArg, MarshalError> {
    if arg.entry_point() != entry {
        return Err(MarshalError::ArgumentShape {
            entry: entry.symbol(),
            given: arg.kind(),
        });
    }
    Ok(match arg {
        FormatArg::None => CArg::None,
        FormatArg::Int(v) => CArg::Int(*v),
        FormatArg::Float32(v) => CArg::Float(*v),
        FormatArg::Float64(v) => CArg::Double(*v),
        FormatArg::Str(s) => CArg::Str(to_c_string("string argument", s)?),
    })
}
