//! Symbol demangling.
//!
//! Compilers "mangle" symbol names to encode namespaces and types. This module
//! turns them back into something readable:
//!
//! - **Rust**: legacy (`_ZN...E`) and v0 (`_R...`) schemes via `rustc_demangle`,
//!   printed without the trailing hash
//! - **C++**: Itanium ABI (`_Z...`, `__Z...` on Apple targets) via `cpp_demangle`
//! - **Anything else**: returned unchanged
//!
//! Demangling never fails from the caller's point of view. A name that is not
//! mangled, or that a demangler rejects, comes back as-is.

use cpp_demangle::{DemangleOptions, Symbol};
use rustc_demangle::try_demangle;

/// Demangle a symbol name for display.
///
/// Returns `name` unchanged if it is not a recognizable mangled form or if
/// demangling fails. The result is never empty for a non-empty input, and
/// demangling an already demangled name is a no-op.
///
/// ## Example
///
/// ```rust
/// use stacklens_core::demangle;
///
/// assert_eq!(demangle("_ZN4core3fmt5write17h0123456789abcdefE"), "core::fmt::write");
/// assert_eq!(demangle("_ZN3foo3barEi"), "foo::bar(int)");
/// assert_eq!(demangle("main"), "main");
/// ```
pub fn demangle(name: &str) -> String
{
    let demangled = demangle_rust(name).or_else(|| demangle_cpp(name));

    match demangled {
        Some(demangled) if !demangled.is_empty() => demangled,
        _ => name.to_string(),
    }
}

fn demangle_rust(name: &str) -> Option<String>
{
    // `{:#}` drops the `::h<hash>` suffix of legacy symbols
    try_demangle(name).ok().map(|demangled| format!("{demangled:#}"))
}

fn demangle_cpp(name: &str) -> Option<String>
{
    // Apple platforms prefix every C symbol with an extra underscore
    let mangled = name.strip_prefix('_').filter(|rest| rest.starts_with("_Z")).unwrap_or(name);
    if !mangled.starts_with("_Z") {
        return None;
    }

    let symbol = Symbol::new(mangled.as_bytes()).ok()?;
    symbol.demangle(&DemangleOptions::default()).ok()
}
