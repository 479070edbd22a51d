//! Thin `dlopen`/`dlsym`/`dlclose` wrapper over `libc`.

use std::ffi::{CStr, CString, c_void};
use std::path::{Path, PathBuf};

use crate::error::BridgeLoadError;

/// An open shared object. Closed on drop.
#[derive(Debug)]
pub struct Library {
    handle: *mut c_void,
    path: PathBuf,
}

impl Library {
    /// `dlopen` the artifact with `RTLD_NOW | RTLD_LOCAL`.
    ///
    /// Binding everything up front means a broken artifact fails here rather
    /// than in the middle of a run.
    pub fn open(path: &Path) -> Result<Self, BridgeLoadError> {
        let c_path = CString::new(path.as_os_str().as_encoded_bytes()).map_err(|_| {
            BridgeLoadError::Open {
                path: path.to_path_buf(),
                reason: "path contains a NUL byte".to_string(),
            }
        })?;

        // SAFETY: `c_path` is a valid NUL-terminated string for the call.
        let handle = unsafe { libc::dlopen(c_path.as_ptr(), libc::RTLD_NOW | libc::RTLD_LOCAL) };
        if handle.is_null() {
            return Err(BridgeLoadError::Open {
                path: path.to_path_buf(),
                reason: last_dl_error(),
            });
        }
        Ok(Self {
            handle,
            path: path.to_path_buf(),
        })
    }

    /// Resolve `symbol` to a raw address.
    pub fn symbol(&self, symbol: &'static str) -> Result<*mut c_void, BridgeLoadError> {
        let missing = |reason: String| BridgeLoadError::MissingSymbol {
            path: self.path.clone(),
            symbol,
            reason,
        };
        let c_symbol = CString::new(symbol).map_err(|_| missing("symbol contains NUL".into()))?;

        // Clear any stale error so a null result can be attributed correctly.
        // SAFETY: dlerror has no preconditions.
        unsafe { libc::dlerror() };
        // SAFETY: `handle` is live for `&self`, `c_symbol` is NUL-terminated.
        let addr = unsafe { libc::dlsym(self.handle, c_symbol.as_ptr()) };
        if addr.is_null() {
            return Err(missing(last_dl_error()));
        }
        Ok(addr)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for Library {
    fn drop(&mut self) {
        // SAFETY: `handle` came from a successful dlopen and is closed once.
        unsafe { libc::dlclose(self.handle) };
    }
}

fn last_dl_error() -> String {
    // SAFETY: dlerror returns null or a thread-local NUL-terminated message.
    let msg = unsafe { libc::dlerror() };
    if msg.is_null() {
        return "unknown dynamic loader error".to_string();
    }
    // SAFETY: non-null dlerror results are valid C strings until the next call.
    unsafe { CStr::from_ptr(msg) }.to_string_lossy().into_owned()
}
