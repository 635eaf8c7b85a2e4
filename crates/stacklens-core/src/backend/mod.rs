//! # Capture and Resolve Backends
//!
//! This module contains the platform-specific strategies for walking the
//! stack and for turning addresses into symbols.
//!
//! Each backend implements the [`Backend`] trait using one native facility:
//!
//! - **`DebugInfo`** (`debuginfo` feature, Unix): walks the stack with the
//!   `backtrace` crate and resolves through DWARF (`gimli` + `addr2line`),
//!   falling back to symbol tables
//!   - See: [DWARF Debugging Standard](https://dwarfstd.org/)
//! - **`ExecInfo`** (glibc Linux, macOS): `backtrace(3)` plus `dladdr(3)`
//!   - See: [backtrace(3) man page](https://man7.org/linux/man-pages/man3/backtrace.3.html)
//! - **`RtlCapture`** (Windows): `RtlCaptureStackBackTrace`, addresses only
//!   - See: [RtlCaptureStackBackTrace](https://learn.microsoft.com/en-us/windows/win32/api/winnt/nf-winnt-rtlcapturestackbacktrace)
//! - **`Unsupported`**: everything else; captures are always empty
//!
//! [`DefaultBackend`] names the backend selected for the current build.
//! Selection happens at compile time, so there is no runtime dispatch.
//!
//! ## Skip counts
//!
//! Every backend hides its own frames first. After that, `skip_base` removes
//! further most-recent frames (the caller's own helpers) and `skip_entry`
//! removes least-recent frames (the runtime's entry point).

use smallvec::SmallVec;

use crate::types::{Address, SymbolRecord};

#[cfg(all(feature = "debuginfo", unix))]
mod debuginfo;
#[cfg(any(all(target_os = "linux", target_env = "gnu"), target_os = "macos"))]
mod execinfo;
mod unsupported;
#[cfg(windows)]
mod windows;

#[cfg(all(feature = "debuginfo", unix))]
pub use debuginfo::DebugInfo;
#[cfg(any(all(target_os = "linux", target_env = "gnu"), target_os = "macos"))]
pub use execinfo::ExecInfo;
pub use unsupported::Unsupported;
#[cfg(windows)]
pub use windows::RtlCapture;

/// Stack capture and symbol resolution strategy.
///
/// Backends are stateless from the caller's point of view: both operations
/// are associated functions. Any process-wide state a backend needs (such as
/// parsed debug info) is initialized lazily and shared.
///
/// Neither operation fails. A backend that cannot do its job returns an empty
/// trace or an unknown record instead.
pub trait Backend
{
    /// Short name used in diagnostics.
    const NAME: &'static str;

    /// Capture the current call chain, most recent call first.
    ///
    /// ## Parameters
    ///
    /// - `skip_entry`: number of least-recent frames to drop
    /// - `skip_base`: number of most-recent frames to drop, not counting the
    ///   backend's own frames
    fn capture(skip_entry: usize, skip_base: usize) -> Vec<Address>;

    /// Resolve one trace address into zero or more symbol records.
    ///
    /// Inlined frames come first, innermost first. Every record carries the
    /// `address` that was passed in.
    fn resolve(address: Address) -> SmallVec<[SymbolRecord; 1]>;
}

/// Backend selected for this build.
#[cfg(all(feature = "debuginfo", unix))]
pub type DefaultBackend = DebugInfo;

/// Backend selected for this build.
#[cfg(all(
    not(all(feature = "debuginfo", unix)),
    any(all(target_os = "linux", target_env = "gnu"), target_os = "macos")
))]
pub type DefaultBackend = ExecInfo;

/// Backend selected for this build.
#[cfg(windows)]
pub type DefaultBackend = RtlCapture;

/// Backend selected for this build.
#[cfg(not(any(
    all(feature = "debuginfo", unix),
    all(target_os = "linux", target_env = "gnu"),
    target_os = "macos",
    windows
)))]
pub type DefaultBackend = Unsupported;

/// Drop `recent` frames from the front and `entry` frames from the back.
///
/// Saturates: asking for more than the trace holds leaves it empty.
pub(crate) fn skip_frames(frames: &mut Vec<Address>, recent: usize, entry: usize)
{
    let recent = recent.min(frames.len());
    frames.drain(..recent);

    let keep = frames.len().saturating_sub(entry);
    frames.truncate(keep);
}
