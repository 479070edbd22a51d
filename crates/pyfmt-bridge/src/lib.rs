//! C-ABI marshaling bridge for a compiled pyfmt subject library.
//!
//! The subject is a shared object exporting one formatter per [`EntryPoint`]
//! plus a sibling `*Error` probe. This crate:
//! - loads the artifact once (`dlopen`/`dlsym` via `libc`)
//! - converts host values into the C calling convention
//! - copies every returned buffer and frees the original before returning
//! - reports each call as an [`Outcome`]
//!
//! Nothing here knows how formatting works; the bridge only moves bytes.

pub mod bridge;
pub mod buffer;
pub mod entry;
pub mod error;
pub mod loader;
pub mod outcome;

pub use bridge::{Bridge, FormatArg, BRIDGE_LIB_ENV};
pub use entry::EntryPoint;
pub use error::{BridgeLoadError, MarshalError};
pub use outcome::Outcome;
