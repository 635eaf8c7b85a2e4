//! # Symbol Resolution
//!
//! Everything needed to turn a raw return address into a readable frame.
//!
//! ## Layers
//!
//! - [`demangle`]: Rust and C++ name demangling, available everywhere
//! - `dladdr`: loader queries (which object, nearest exported symbol), Unix only
//! - `image`: object file parsing with DWARF file/line lookups and symbol-table
//!   lookups, behind the `debuginfo` feature
//! - `cache`: the process-wide cache of parsed images
//!
//! Backends pick the layers they can use; see [`crate::backend`].

pub mod demangle;

#[cfg(unix)]
pub(crate) mod dladdr;

#[cfg(all(feature = "debuginfo", unix))]
pub(crate) mod cache;
#[cfg(all(feature = "debuginfo", unix))]
pub(crate) mod image;

pub use demangle::demangle;
