// Exports keep the C symbol names the bridge resolves, and every one takes
// raw pointers from the caller, so per-function safety docs add nothing.
#![allow(non_snake_case)]
#![allow(clippy::missing_safety_doc)]
//! # pyfmt-fixture-subject
//!
//! A `cdylib` exporting the ten pyfmt formatter symbols without formatting
//! anything. Each renderer echoes its input as `template|value` so tests can
//! see exactly what crossed the boundary:
//!
//! - ints in decimal
//! - `float` as its bit pattern, `0x` plus 8 hex digits
//! - `double` as its bit pattern, `0x` plus 16 hex digits
//! - strings verbatim
//! - `FormatNothing` returns the template alone
//!
//! Control markers inside the template:
//!
//! - `!` makes every `*Error` export report an error
//! - `~null~` makes every renderer return null

use std::ffi::{CStr, c_char, c_double, c_float, c_int};

const REJECT_MARKER: &[u8] = b"!";
const NULL_MARKER: &[u8] = b"~null~";

unsafe fn c_bytes<'a>(ptr: *const c_char) -> &'a [u8] {
    if ptr.is_null() {
        return b"";
    }
    unsafe { CStr::from_ptr(ptr) }.to_bytes()
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Copy `template|value` into a fresh `malloc` buffer the caller frees.
fn echo(template: &[u8], value: Option<&[u8]>) -> *mut c_char {
    if contains(template, NULL_MARKER) {
        return std::ptr::null_mut();
    }
    let mut out = template.to_vec();
    if let Some(value) = value {
        out.push(b'|');
        out.extend_from_slice(value);
    }
    let ptr = unsafe { libc::malloc(out.len() + 1) }.cast::<u8>();
    if ptr.is_null() {
        return std::ptr::null_mut();
    }
    unsafe {
        std::ptr::copy_nonoverlapping(out.as_ptr(), ptr, out.len());
        *ptr.add(out.len()) = 0;
    }
    ptr.cast()
}

unsafe fn rejects(template: *const c_char) -> bool {
    contains(unsafe { c_bytes(template) }, REJECT_MARKER)
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn FormatNothing(template: *const c_char) -> *mut c_char {
    echo(unsafe { c_bytes(template) }, None)
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn FormatNothingError(template: *const c_char) -> bool {
    unsafe { rejects(template) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn FormatOneInt(template: *const c_char, value: c_int) -> *mut c_char {
    let value = value.to_string();
    echo(unsafe { c_bytes(template) }, Some(value.as_bytes()))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn FormatOneIntError(template: *const c_char, _value: c_int) -> bool {
    unsafe { rejects(template) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn FormatOneFloat(template: *const c_char, value: c_float) -> *mut c_char {
    let bits = format!("{:#010x}", value.to_bits());
    echo(unsafe { c_bytes(template) }, Some(bits.as_bytes()))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn FormatOneFloatError(template: *const c_char, _value: c_float) -> bool {
    unsafe { rejects(template) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn FormatOneDouble(template: *const c_char, value: c_double) -> *mut c_char {
    let bits = format!("{:#018x}", value.to_bits());
    echo(unsafe { c_bytes(template) }, Some(bits.as_bytes()))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn FormatOneDoubleError(template: *const c_char, _value: c_double) -> bool {
    unsafe { rejects(template) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn FormatOneString(
    template: *const c_char,
    value: *const c_char,
) -> *mut c_char {
    echo(
        unsafe { c_bytes(template) },
        Some(unsafe { c_bytes(value) }),
    )
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn FormatOneStringError(
    template: *const c_char,
    _value: *const c_char,
) -> bool {
    unsafe { rejects(template) }
}
