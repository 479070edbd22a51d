//! Scoped ownership of subject-allocated C strings.

use std::ffi::{CStr, CString, c_char};

use crate::error::MarshalError;

/// A `malloc`-allocated, NUL-terminated buffer handed over by the subject.
///
/// The guard frees the buffer exactly once when dropped, so every exit path
/// out of a bridge call releases it, including early returns and panics.
#[derive(Debug)]
pub struct OwnedCBuffer {
    ptr: *mut c_char,
}

impl OwnedCBuffer {
    /// Take ownership of a pointer returned by the subject.
    ///
    /// Returns `None` for null.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or point to a NUL-terminated buffer allocated with
    /// the C allocator that nobody else will free.
    pub unsafe fn adopt(ptr: *mut c_char) -> Option<Self> {
        if ptr.is_null() { None } else { Some(Self { ptr }) }
    }

    /// Copy the bytes up to (not including) the terminating NUL.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        // SAFETY: `adopt` requires a live NUL-terminated buffer, and the guard
        // has not been dropped yet.
        unsafe { CStr::from_ptr(self.ptr) }.to_bytes().to_vec()
    }
}

impl Drop for OwnedCBuffer {
    fn drop(&mut self) {
        // SAFETY: the pointer came from the C allocator and is freed only here.
        unsafe { libc::free(self.ptr.cast()) };
    }
}

/// Convert a host string into a C string, rejecting interior NULs.
pub fn to_c_string(what: &'static str, text: &str) -> Result<CString, MarshalError> {
    CString::new(text).map_err(|err| MarshalError::InteriorNul {
        what,
        position: err.nul_position(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn malloc_c_string(bytes: &[u8]) -> *mut c_char {
        // SAFETY: allocation of len+1 bytes, then fully initialised below.
        let ptr = unsafe { libc::malloc(bytes.len() + 1) }.cast::<u8>();
        assert!(!ptr.is_null());
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr, bytes.len());
            *ptr.add(bytes.len()) = 0;
        }
        ptr.cast()
    }

    #[test]
    fn null_is_not_adopted() {
        assert!(unsafe { OwnedCBuffer::adopt(std::ptr::null_mut()) }.is_none());
    }

    #[test]
    fn copy_survives_release() {
        let raw = malloc_c_string(b"0x2a");
        let guard = unsafe { OwnedCBuffer::adopt(raw) }.expect("non-null");
        let copy = guard.to_bytes();
        drop(guard);
        assert_eq!(copy, b"0x2a");
    }

    #[test]
    fn empty_string_copies_empty() {
        let raw = malloc_c_string(b"");
        let guard = unsafe { OwnedCBuffer::adopt(raw) }.expect("non-null");
        assert!(guard.to_bytes().is_empty());
    }

    #[test]
    fn copy_stops_at_first_nul() {
        let raw = malloc_c_string(b"abc\0def");
        let guard = unsafe { OwnedCBuffer::adopt(raw) }.expect("non-null");
        assert_eq!(guard.to_bytes(), b"abc");
    }

    #[test]
    fn interior_nul_is_rejected() {
        let err = to_c_string("template", "a\0b").unwrap_err();
        assert_eq!(
            err,
            MarshalError::InteriorNul {
                what: "template",
                position: 1
            }
        );
        assert_eq!(to_c_string("template", "{:x}").unwrap().as_bytes(), b"{:x}");
    }
}
