//! Loader queries via `dladdr(3)`.
//!
//! `dladdr` is available on every Unix we care about but knows very little: the
//! object containing an address, where that object is mapped, and the nearest
//! *dynamic* symbol at or below the address. No file/line, no inlining, and no
//! names for symbols the linker did not export.

use std::ffi::{CStr, OsStr};
use std::mem::MaybeUninit;
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;

use super::demangle;

/// What the dynamic loader knows about one address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LoaderInfo
{
    /// Path of the object containing the address, as the loader recorded it.
    pub object_path: Option<PathBuf>,
    /// Address the object's headers are mapped at.
    pub object_base: usize,
    /// Nearest preceding dynamic symbol, still mangled.
    pub symbol_name: Option<String>,
    /// Start address of `symbol_name`.
    pub symbol_address: usize,
}

/// Ask the dynamic loader which object and symbol own `pc`.
///
/// Returns `None` if no loaded object contains the address.
pub(crate) fn query(pc: usize) -> Option<LoaderInfo>
{
    let mut info = MaybeUninit::<libc::Dl_info>::zeroed();

    // SAFETY: `dladdr` only reads `pc` as an opaque value and fills `info`.
    // The strings it points `info` at are owned by the loader and stay valid
    // while the object is loaded; we copy them out immediately.
    let found = unsafe { libc::dladdr(pc as *const libc::c_void, info.as_mut_ptr()) };
    if found == 0 {
        return None;
    }

    // SAFETY: `dladdr` succeeded, so `info` is initialized.
    let info = unsafe { info.assume_init() };

    let object_path = non_null_cstr(info.dli_fname)
        .filter(|bytes| !bytes.is_empty())
        .map(|bytes| PathBuf::from(OsStr::from_bytes(bytes)));
    let symbol_name = non_null_cstr(info.dli_sname)
        .filter(|bytes| !bytes.is_empty())
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned());

    Some(LoaderInfo {
        object_path,
        object_base: info.dli_fbase as usize,
        symbol_name,
        symbol_address: info.dli_saddr as usize,
    })
}

/// Demangled name of the nearest exported symbol at or below `pc`.
pub(crate) fn nearest_symbol(pc: usize) -> Option<String>
{
    query(pc)?.symbol_name.map(|name| demangle(&name))
}

fn non_null_cstr<'a>(ptr: *const libc::c_char) -> Option<&'a [u8]>
{
    if ptr.is_null() {
        return None;
    }

    // SAFETY: non-null pointers from `dladdr` are NUL-terminated loader strings.
    Some(unsafe { CStr::from_ptr(ptr) }.to_bytes())
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_query_null_address()
    {
        let info = query(0);
        assert!(info.map_or(true, |info| info.symbol_name.is_none()));
    }

    #[test]
    fn test_query_libc_function()
    {
        let info = query(libc::getpid as usize).expect("libc is loaded");
        assert!(info.object_path.is_some());
        assert!(info.object_base != 0);
        assert!(info.symbol_address <= libc::getpid as usize);
    }

    #[test]
    fn test_nearest_symbol_names_exported_function()
    {
        let name = nearest_symbol(libc::getpid as usize + 1).expect("getpid is exported");
        assert!(name.contains("getpid"));
    }
}
