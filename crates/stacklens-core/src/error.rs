//! # Error Types
//!
//! Internal error handling for capture and symbol resolution.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.
//!
//! None of these errors escape the public [`StackAnalyzer`](crate::StackAnalyzer)
//! API. Resolvers use them to decide between falling back to a cheaper lookup
//! (see [`StackError::is_missing_debug_info`]) and logging a warning.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::Address;

/// Error type for capture and resolution failures
///
/// ## Error Categories
///
/// 1. **Expected**: MissingDebugInfo (silently triggers the symbol-table fallback)
/// 2. **Per-image**: ImageParse, Io (logged once per image)
/// 3. **Per-address**: Dwarf (logged as a warning, the address is skipped)
/// 4. **Process-wide**: BackendInit (logged once, captures become empty)
#[derive(Error, Debug)]
pub enum StackError
{
    /// No debug information covers the given address
    ///
    /// This happens when:
    /// - No loaded image contains the address
    /// - The image was built without DWARF (`.debug_info` is empty)
    /// - No compilation unit in the image covers the address
    #[error("No debug information available for {0}")]
    MissingDebugInfo(Address),

    /// A binary image could not be parsed as an object file
    #[error("Failed to parse image {}: {details}", path.display())]
    ImageParse
    {
        /// Path of the image that failed to parse
        path: PathBuf,
        /// Parser error message
        details: String,
    },

    /// DWARF data in an image is malformed
    #[cfg(feature = "debuginfo")]
    #[error("DWARF error: {0}")]
    Dwarf(#[from] gimli::Error),

    /// Process-wide backend state could not be set up
    #[error("Backend initialization failed: {0}")]
    BackendInit(String),

    /// I/O error while reading an image from disk
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StackError
{
    /// Whether this error only means "no debug info here".
    ///
    /// Resolvers treat this as the cue for the symbol-table fallback instead of
    /// reporting a failure.
    pub fn is_missing_debug_info(&self) -> bool
    {
        matches!(self, StackError::MissingDebugInfo(_))
    }
}

/// Convenience type alias for `Result<T, StackError>`
///
/// ```rust
/// use stacklens_core::error::StackResult;
/// fn foo() -> StackResult<()>
/// {
///     Ok(())
/// }
/// ```
pub type StackResult<T> = std::result::Result<T, StackError>;
