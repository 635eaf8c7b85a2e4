//! Binary image parsing, DWARF section loading, and per-image lookups.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use addr2line::Context;
use gimli::{Dwarf, EndianArcSlice, RunTimeEndian, SectionId};
use object::{Object, ObjectSection, ObjectSegment, ObjectSymbol, SymbolKind};
use once_cell::sync::OnceCell;

use super::demangle;
use crate::error::{StackError, StackResult};
use crate::types::{Address, SymbolRecord};

type OwnedReader = EndianArcSlice<RunTimeEndian>;

const DWARF_SECTIONS: &[(&str, &[&str])] = &[
    (".debug_abbrev", &[".debug_abbrev", "__debug_abbrev"]),
    (".debug_addr", &[".debug_addr", "__debug_addr"]),
    (".debug_aranges", &[".debug_aranges", "__debug_aranges"]),
    (".debug_info", &[".debug_info", "__debug_info"]),
    (".debug_line", &[".debug_line", "__debug_line"]),
    (".debug_line_str", &[".debug_line_str", "__debug_line_str"]),
    (".debug_ranges", &[".debug_ranges", "__debug_ranges"]),
    (".debug_rnglists", &[".debug_rnglists", "__debug_rnglists"]),
    (".debug_str", &[".debug_str", "__debug_str"]),
    (".debug_str_offsets", &[".debug_str_offsets", "__debug_str_offsets"]),
];

fn load_section_bytes(path: &Path, file: &object::File<'_>, names: &[&str]) -> StackResult<Arc<[u8]>>
{
    for name in names {
        if let Some(section) = file.section_by_name(name) {
            let data = section.uncompressed_data().map_err(|err| StackError::ImageParse {
                path: path.to_path_buf(),
                details: format!("failed to read {name}: {err}"),
            })?;
            return Ok(match data {
                Cow::Borrowed(bytes) => Arc::<[u8]>::from(bytes),
                Cow::Owned(vec) => vec.into(),
            });
        }
    }

    Ok(Arc::<[u8]>::from(Vec::new()))
}

/// A function symbol from an image's symbol table.
#[derive(Debug, Clone)]
struct TableSymbol
{
    address: u64,
    size: u64,
    name: String,
}

/// Parsed image with DWARF sections and symbol table, ready for lookups.
///
/// Lookups take *runtime* addresses; the image converts them to file
/// addresses with the slide computed from where the loader mapped it.
pub(crate) struct BinaryImage
{
    path: PathBuf,
    endian: RunTimeEndian,
    slide: i64,
    debug_sections: HashMap<&'static str, Arc<[u8]>>,
    symbols: Vec<TableSymbol>,
    context_cache: OnceCell<Context<OwnedReader>>,
}

impl BinaryImage
{
    /// Parse the image at `path`, mapped by the loader at `load_address`.
    pub(crate) fn parse(path: &Path, load_address: usize) -> StackResult<Self>
    {
        let bytes = fs::read(path)?;
        let file = object::File::parse(&*bytes).map_err(|err| StackError::ImageParse {
            path: path.to_path_buf(),
            details: err.to_string(),
        })?;

        let endian = if file.is_little_endian() {
            RunTimeEndian::Little
        } else {
            RunTimeEndian::Big
        };

        // The loader reports where the object's headers landed. For Mach-O that
        // is the start of `__TEXT`; for ELF it is the lowest loadable segment.
        let base_vmaddr = file
            .segments()
            .find(|segment| matches!(segment.name(), Ok(Some("__TEXT"))))
            .map(|segment| segment.address())
            .or_else(|| {
                file.segments()
                    .filter(|segment| segment.size() > 0)
                    .map(|segment| segment.address())
                    .min()
            })
            .unwrap_or(0)
            & !0xfff;
        let slide = load_address as i64 - base_vmaddr as i64;

        let mut sections = HashMap::new();
        for (canonical, aliases) in DWARF_SECTIONS {
            let data = load_section_bytes(path, &file, aliases)?;
            sections.insert(*canonical, data);
        }

        Ok(Self {
            path: path.to_path_buf(),
            endian,
            slide,
            debug_sections: sections,
            symbols: function_symbols(&file),
            context_cache: OnceCell::new(),
        })
    }

    pub(crate) fn path(&self) -> &Path
    {
        &self.path
    }

    /// Whether the image carries any DWARF compilation units at all.
    pub(crate) fn has_debug_info(&self) -> bool
    {
        self.debug_sections.get(".debug_info").is_some_and(|data| !data.is_empty())
    }

    /// Translate a runtime address into the address space of the file.
    pub(crate) fn file_address(&self, runtime: usize) -> u64
    {
        (runtime as i64).wrapping_sub(self.slide) as u64
    }

    fn section_reader(&self, id: SectionId) -> OwnedReader
    {
        let data = self
            .debug_sections
            .get(id.name())
            .cloned()
            .unwrap_or_else(|| Arc::<[u8]>::from(Vec::new()));
        EndianArcSlice::new(data, self.endian)
    }

    fn symbol_context(&self) -> StackResult<&Context<OwnedReader>>
    {
        self.context_cache.get_or_try_init(|| {
            let dwarf = Dwarf::load(|section| Ok::<_, gimli::Error>(self.section_reader(section)))?;
            Ok(Context::from_dwarf(dwarf)?)
        })
    }

    /// Resolve `address` through DWARF, innermost inlined frame first.
    ///
    /// ## Errors
    ///
    /// - `MissingDebugInfo` if the image has no DWARF or no unit covers the address
    /// - `Dwarf` if the debug information is malformed
    pub(crate) fn debug_frames(&self, address: Address) -> StackResult<Vec<SymbolRecord>>
    {
        if !self.has_debug_info() {
            return Err(StackError::MissingDebugInfo(address));
        }

        let file_pc = self.file_address(address.lookup_pc());
        let context = self.symbol_context()?;
        let mut frames = context.find_frames(file_pc).skip_all_loads()?;

        let mut records = Vec::new();
        while let Some(frame) = frames.next()? {
            let function_name = match frame.function.as_ref() {
                Some(function) => demangle(&function.raw_name()?),
                None => self.table_symbol(address).map(demangle).unwrap_or_default(),
            };
            let (source_file, line) = match frame.location {
                Some(location) => (location.file.map(str::to_string), location.line),
                None => (None, None),
            };

            records.push(SymbolRecord {
                source_file,
                line,
                function_name,
                address,
            });
        }

        if records.is_empty() {
            return Err(StackError::MissingDebugInfo(address));
        }
        Ok(records)
    }

    /// Nearest preceding function symbol from the image's symbol table.
    pub(crate) fn table_symbol(&self, address: Address) -> Option<&str>
    {
        let file_pc = self.file_address(address.lookup_pc());
        let index = match self.symbols.binary_search_by_key(&file_pc, |symbol| symbol.address) {
            Ok(index) => index,
            Err(0) => return None,
            Err(index) => index - 1,
        };

        let symbol = &self.symbols[index];
        // Without size information the nearest symbol is the best guess
        if symbol.size > 0 && file_pc >= symbol.address.saturating_add(symbol.size) {
            return None;
        }
        Some(&symbol.name)
    }
}

/// Collect text symbols sorted by address, preferring the full symbol table.
fn function_symbols(file: &object::File<'_>) -> Vec<TableSymbol>
{
    let mut symbols = text_symbols(file.symbols());
    if symbols.is_empty() {
        symbols = text_symbols(file.dynamic_symbols());
    }

    symbols.sort_by_key(|symbol| symbol.address);
    symbols
}

fn text_symbols<'data, S, I>(symbols: I) -> Vec<TableSymbol>
where
    I: Iterator<Item = S>,
    S: ObjectSymbol<'data>,
{
    symbols
        .filter(|symbol| symbol.kind() == SymbolKind::Text && symbol.address() != 0)
        .filter_map(|symbol| {
            let name = symbol.name().ok().filter(|name| !name.is_empty())?;
            Some(TableSymbol {
                address: symbol.address(),
                size: symbol.size(),
                name: name.to_string(),
            })
        })
        .collect()
}
