//! # Debug-Info Backend
//!
//! The richest backend: captures with the `backtrace` crate's unwinder and
//! resolves through the DWARF sections of each loaded image.
//!
//! ## Resolution order
//!
//! 1. DWARF (`addr2line`): every frame of the inline chain, with file and line
//! 2. The image's symbol table (`.symtab`, then `.dynsym`): function name only
//! 3. `dladdr(3)`: nearest exported symbol
//!
//! Steps 2 and 3 only run when DWARF has nothing for the address. If DWARF is
//! present but broken, the address is logged and skipped.

use smallvec::{smallvec, SmallVec};
use tracing::{trace, warn};

use super::{skip_frames, Backend};
use crate::error::StackResult;
use crate::symbols::cache::ImageCache;
use crate::symbols::{demangle, dladdr};
use crate::types::{Address, SymbolRecord};

/// `backtrace` + DWARF backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct DebugInfo;

/// What the image lookup produced for one address.
#[derive(Debug)]
enum Lookup
{
    Frames(Vec<SymbolRecord>),
    TableSymbol(Option<String>),
    Failed,
}

impl Backend for DebugInfo
{
    const NAME: &'static str = "debuginfo";

    #[inline(never)]
    fn capture(skip_entry: usize, skip_base: usize) -> Vec<Address>
    {
        if ImageCache::global().is_none() {
            return Vec::new();
        }

        // Frames up to and including this one belong to the unwinder. This
        // frame is the one starting at `capture`, or where that is unknown
        // (Apple targets report the ip instead), the first frame whose CFA
        // lies above a local of this function.
        let marker = <Self as Backend>::capture as usize;
        let anchor = 0u8;
        let anchor = std::hint::black_box(&anchor) as *const u8 as usize;
        let mut frames = Vec::new();
        let mut own_frames = None;

        backtrace::trace(|frame| {
            frames.push(Address::from_ptr(frame.ip()));
            if own_frames.is_none() {
                let cfa = frame.sp() as usize;
                if frame.symbol_address() as usize == marker || (cfa != 0 && cfa > anchor) {
                    own_frames = Some(frames.len());
                }
            }
            true
        });

        if own_frames.is_none() {
            trace!("capture frame not found in {} frames", frames.len());
        }
        skip_frames(&mut frames, own_frames.unwrap_or(0) + skip_base, skip_entry);
        frames
    }

    fn resolve(address: Address) -> SmallVec<[SymbolRecord; 1]>
    {
        let Some(cache) = ImageCache::global() else {
            return smallvec![SymbolRecord::unknown(address)];
        };

        let lookup = cache.with_image(address.lookup_pc(), |image| {
            match classify(image.debug_frames(address), || image.table_symbol(address).map(demangle)) {
                Ok(lookup) => lookup,
                Err(err) => {
                    warn!("failed to resolve {address} in {}: {err}", image.path().display());
                    Lookup::Failed
                }
            }
        });

        records(address, lookup)
    }
}

/// Sort a DWARF lookup into frames, the symbol-table fallback, or an error.
fn classify(
    frames: StackResult<Vec<SymbolRecord>>,
    table_symbol: impl FnOnce() -> Option<String>,
) -> StackResult<Lookup>
{
    match frames {
        Ok(frames) => Ok(Lookup::Frames(frames)),
        Err(err) if err.is_missing_debug_info() => Ok(Lookup::TableSymbol(table_symbol())),
        Err(err) => Err(err),
    }
}

/// Records for one address. `None` means no image covers it.
fn records(address: Address, lookup: Option<Lookup>) -> SmallVec<[SymbolRecord; 1]>
{
    match lookup {
        Some(Lookup::Frames(frames)) => frames.into_iter().collect(),
        Some(Lookup::Failed) => SmallVec::new(),
        Some(Lookup::TableSymbol(Some(name))) => smallvec![SymbolRecord::named(address, name)],
        Some(Lookup::TableSymbol(None)) | None => {
            let name = dladdr::nearest_symbol(address.lookup_pc()).unwrap_or_default();
            smallvec![SymbolRecord::named(address, name)]
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::error::StackError;

    #[inline(never)]
    fn named_frame() -> Vec<Address>
    {
        let frames = DebugInfo::capture(0, 0);
        std::hint::black_box(&frames);
        frames
    }

    #[test]
    fn test_capture_hides_own_frames()
    {
        let frames = named_frame();
        let first = DebugInfo::resolve(frames[0]);
        assert!(
            first.iter().any(|record| record.function_name.ends_with("named_frame")),
            "unexpected first frame: {first:?}"
        );
    }

    #[test]
    fn test_resolve_unmapped_address_yields_one_record()
    {
        let records = DebugInfo::resolve(Address::new(8));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].address, Address::new(8));
    }

    #[test]
    fn test_records_keep_trace_address()
    {
        let frames = named_frame();
        for &address in frames.iter().take(3) {
            for record in DebugInfo::resolve(address) {
                assert_eq!(record.address, address);
            }
        }
    }

    #[test]
    fn test_classify_frames()
    {
        let frames = vec![SymbolRecord::named(Address::new(0x10), "inner")];
        let lookup = classify(Ok(frames.clone()), || unreachable!("no fallback needed"));
        assert!(matches!(lookup, Ok(Lookup::Frames(found)) if found == frames));
    }

    #[test]
    fn test_classify_missing_debug_info_uses_table_symbol()
    {
        let missing = Err(StackError::MissingDebugInfo(Address::new(0x10)));
        let lookup = classify(missing, || Some("from_symtab".to_string()));
        assert!(matches!(lookup, Ok(Lookup::TableSymbol(Some(name))) if name == "from_symtab"));
    }

    #[test]
    fn test_classify_other_error_is_failure()
    {
        let broken = Err(StackError::BackendInit("corrupt unit".to_string()));
        let lookup = classify(broken, || unreachable!("no fallback for broken DWARF"));
        assert!(matches!(lookup, Err(StackError::BackendInit(_))));
    }

    #[test]
    fn test_records_for_table_symbol_have_no_location()
    {
        let address = Address::new(0x10);
        let found = records(address, Some(Lookup::TableSymbol(Some("from_symtab".to_string()))));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0], SymbolRecord::named(address, "from_symtab"));
        assert_eq!(found[0].source_file, None);
        assert_eq!(found[0].line, None);
    }

    #[test]
    fn test_records_for_failure_are_empty()
    {
        let lookups = vec![
            (Address::new(0x10), Some(Lookup::TableSymbol(Some("first".to_string())))),
            (Address::new(0x20), Some(Lookup::Failed)),
            (Address::new(0x30), Some(Lookup::TableSymbol(Some("third".to_string())))),
        ];

        let names: Vec<String> = lookups
            .into_iter()
            .flat_map(|(address, lookup)| records(address, lookup))
            .map(|record| record.function_name)
            .collect();
        assert_eq!(names, ["first", "third"]);
    }

    #[test]
    fn test_records_without_image_use_loader()
    {
        let address = Address::new(libc::getpid as usize + 1);
        let found = records(address, None);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].address, address);

        let found = records(Address::new(8), Some(Lookup::TableSymbol(None)));
        assert_eq!(found.len(), 1);
        assert!(found[0].is_unknown());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_vdso_lookup_keeps_executable_resolvable()
    {
        // SAFETY: `getauxval` only reads the process's auxiliary vector.
        let vdso = unsafe { libc::getauxval(libc::AT_SYSINFO_EHDR) } as usize;
        if vdso != 0 {
            let in_vdso = DebugInfo::resolve(Address::new(vdso + 0x800));
            assert_eq!(in_vdso.len(), 1);
        }

        let frames = named_frame();
        let first = DebugInfo::resolve(frames[0]);
        assert!(
            first.iter().any(|record| record.function_name.ends_with("named_frame")),
            "unexpected first frame after a vDSO lookup: {first:?}"
        );
    }
}
